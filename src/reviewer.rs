use std::collections::VecDeque;

use rand::Rng;
use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use crate::categories::ensure_color;
use crate::db::write_txn;
use crate::error::{Result, SpendError};
use crate::models::Transaction;

/// Every transaction without a category, newest first.
pub fn get_uncategorized_transactions(conn: &Connection) -> Result<Vec<Transaction>> {
    let sql = format!("{} WHERE t.category_id IS NULL ORDER BY t.date DESC, t.id DESC", Transaction::SELECT);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], Transaction::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Apply a categorization decision and teach it to the vendor.
///
/// In one write transaction: the transaction gets the category and recurring
/// flag, its vendor's default category becomes `category_id`, and the
/// category receives a pastel color if none was chosen for it yet. Any
/// failure leaves all three untouched.
pub fn submit_categorization<R: Rng + ?Sized>(
    conn: &Connection,
    transaction_id: i64,
    category_id: i64,
    recurring: bool,
    rng: &mut R,
) -> Result<()> {
    let tx = write_txn(conn)?;

    let vendor_id: i64 = tx
        .query_row("SELECT vendor_id FROM transactions WHERE id = ?1", [transaction_id], |row| row.get(0))
        .optional()?
        .ok_or_else(|| SpendError::NotFound(format!("Transaction {transaction_id}")))?;

    tx.execute(
        "UPDATE transactions SET category_id = ?1, recurring = ?2 WHERE id = ?3",
        rusqlite::params![category_id, recurring, transaction_id],
    )?;
    tx.execute(
        "UPDATE vendors SET category_id = ?1 WHERE id = ?2",
        rusqlite::params![category_id, vendor_id],
    )?;
    ensure_color(&tx, category_id, rng)?;

    tx.commit()?;
    info!(transaction_id, vendor_id, category_id, recurring, "Categorized transaction");
    Ok(())
}

// ---------------------------------------------------------------------------
// Pending queue
// ---------------------------------------------------------------------------

/// Process-local, single-consumer queue of transactions awaiting a category.
#[derive(Debug, Default)]
pub struct PendingQueue {
    items: VecDeque<Transaction>,
}

impl PendingQueue {
    pub fn load(conn: &Connection) -> Result<Self> {
        Ok(Self { items: get_uncategorized_transactions(conn)?.into() })
    }

    pub fn peek(&self) -> Option<&Transaction> {
        self.items.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Categorize the head of the queue. The head is only removed once the
    /// write has committed.
    pub fn submit<R: Rng + ?Sized>(
        &mut self,
        conn: &Connection,
        category_id: i64,
        recurring: bool,
        rng: &mut R,
    ) -> Result<Transaction> {
        let head = self
            .items
            .front()
            .ok_or_else(|| SpendError::NotFound("Pending transaction".into()))?;
        submit_categorization(conn, head.id, category_id, recurring, rng)?;
        let mut done = self.items.pop_front().ok_or_else(|| SpendError::NotFound("Pending transaction".into()))?;
        done.category_id = Some(category_id);
        done.recurring = recurring;
        Ok(done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categories::{add_category, get_category, is_valid_color};
    use crate::db::{test_db, DEFAULT_COLOR};
    use crate::importer::import_file;
    use crate::vendors::default_category;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::path::Path;

    fn write_csv(dir: &Path, name: &str, rows: &[&str]) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut content = String::from("Status,Date,Description,Debit,Credit\n");
        for row in rows {
            content.push_str(row);
            content.push('\n');
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_uncategorized_newest_first() {
        let (dir, conn) = test_db();
        let path = write_csv(
            dir.path(),
            "jan.csv",
            &["POSTED,01/05/2024,COFFEE,4.50,", "POSTED,01/20/2024,GROCER,60.00,", "POSTED,01/10/2024,GAS,30.00,"],
        );
        import_file(&conn, &path).unwrap();
        let pending = get_uncategorized_transactions(&conn).unwrap();
        let dates: Vec<&str> = pending.iter().map(|t| t.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-01-20", "2024-01-10", "2024-01-05"]);
    }

    #[test]
    fn test_submit_propagates_to_vendor_and_later_imports() {
        let (dir, conn) = test_db();
        let mut rng = StdRng::seed_from_u64(3);
        let cat = add_category(&conn, "Shopping", None, None).unwrap();
        let first = write_csv(dir.path(), "jan.csv", &["POSTED,01/15/2024,POS AMAZON PURCHASE,42.50,"]);
        import_file(&conn, &first).unwrap();

        let mut queue = PendingQueue::load(&conn).unwrap();
        assert_eq!(queue.len(), 1);
        let done = queue.submit(&conn, cat, true, &mut rng).unwrap();
        assert!(queue.is_empty());
        assert_eq!(default_category(&conn, done.vendor_id).unwrap(), Some(cat));
        let recurring: bool = conn
            .query_row("SELECT recurring FROM transactions WHERE id = ?1", [done.id], |r| r.get(0))
            .unwrap();
        assert!(recurring);

        let second = write_csv(dir.path(), "feb.csv", &["POSTED,02/15/2024,AMAZON,18.00,"]);
        let summary = import_file(&conn, &second).unwrap();
        assert_eq!(summary.imported, 1);
        assert!(summary.uncategorized_vendor_ids.is_empty());
        assert!(PendingQueue::load(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_failed_submit_rolls_back_and_keeps_head() {
        let (dir, conn) = test_db();
        let mut rng = StdRng::seed_from_u64(3);
        let path = write_csv(dir.path(), "jan.csv", &["POSTED,01/15/2024,NETFLIX,15.99,"]);
        import_file(&conn, &path).unwrap();

        let mut queue = PendingQueue::load(&conn).unwrap();
        let head_id = queue.peek().unwrap().id;
        let err = queue.submit(&conn, 999, false, &mut rng).unwrap_err();
        assert!(matches!(err, SpendError::Db(_) | SpendError::NotFound(_)));

        assert_eq!(queue.peek().unwrap().id, head_id);
        let (txn_cat, vendor_cat): (Option<i64>, Option<i64>) = conn
            .query_row(
                "SELECT t.category_id, v.category_id FROM transactions t JOIN vendors v ON t.vendor_id = v.id",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(txn_cat, None);
        assert_eq!(vendor_cat, None);
    }

    #[test]
    fn test_submit_missing_transaction() {
        let (_dir, conn) = test_db();
        let cat = add_category(&conn, "Misc", None, None).unwrap();
        let err = submit_categorization(&conn, 77, cat, false, &mut StdRng::seed_from_u64(0)).unwrap_err();
        assert!(matches!(err, SpendError::NotFound(_)));
    }

    #[test]
    fn test_submit_on_empty_queue() {
        let (_dir, conn) = test_db();
        let mut queue = PendingQueue::load(&conn).unwrap();
        assert!(queue.peek().is_none());
        assert!(matches!(
            queue.submit(&conn, 1, false, &mut StdRng::seed_from_u64(0)),
            Err(SpendError::NotFound(_))
        ));
    }

    #[test]
    fn test_first_categorization_assigns_seeded_color() {
        let color_for_seed = |seed: u64| {
            let (dir, conn) = test_db();
            let cat = add_category(&conn, "Dining", None, None).unwrap();
            let path = write_csv(dir.path(), "jan.csv", &["POSTED,01/15/2024,CAFE,9.00,"]);
            import_file(&conn, &path).unwrap();
            let mut queue = PendingQueue::load(&conn).unwrap();
            queue.submit(&conn, cat, false, &mut StdRng::seed_from_u64(seed)).unwrap();
            get_category(&conn, cat).unwrap().color
        };
        let a = color_for_seed(11);
        assert_eq!(a, color_for_seed(11));
        assert!(is_valid_color(&a));
        assert_ne!(a, DEFAULT_COLOR);
    }

    #[test]
    fn test_chosen_placeholder_color_survives_categorization() {
        let (dir, conn) = test_db();
        let cat = add_category(&conn, "Fees", None, Some(DEFAULT_COLOR)).unwrap();
        let path = write_csv(dir.path(), "jan.csv", &["POSTED,01/15/2024,BANK FEE,3.00,"]);
        import_file(&conn, &path).unwrap();
        let mut queue = PendingQueue::load(&conn).unwrap();
        queue.submit(&conn, cat, false, &mut StdRng::seed_from_u64(5)).unwrap();
        assert_eq!(get_category(&conn, cat).unwrap().color, DEFAULT_COLOR);
    }

    #[test]
    fn test_existing_color_is_kept() {
        let (dir, conn) = test_db();
        let cat = add_category(&conn, "Bills", None, Some("#336699")).unwrap();
        let path = write_csv(dir.path(), "jan.csv", &["POSTED,01/15/2024,POWER CO,80.00,"]);
        import_file(&conn, &path).unwrap();
        let mut queue = PendingQueue::load(&conn).unwrap();
        queue.submit(&conn, cat, true, &mut StdRng::seed_from_u64(5)).unwrap();
        assert_eq!(get_category(&conn, cat).unwrap().color, "#336699");
    }
}
