//! Entry point for presentation layers.
//!
//! [`Pipeline`] owns the database connection, the color RNG and the pending
//! categorization queue. Read operations return `Result`; user-initiated
//! mutations return a [`MutationResult`] so a front end can render the
//! outcome without matching on error variants.

use std::path::Path;

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rusqlite::Connection;
use serde::Serialize;
use tracing::warn;

use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::importer::ImportSummary;
use crate::models::{Category, ImportRecord, MutationResult, Transaction, TransactionFilter, Vendor};
use crate::reports::{Dashboard, DEFAULT_RECENT_LIMIT};
use crate::reviewer::PendingQueue;
use crate::{categories, db, importer, reports, reviewer, transactions, vendors};

/// What an import produced, plus the queue it left behind.
#[derive(Debug, Clone, Serialize)]
pub struct ImportOutcome {
    pub summary: ImportSummary,
    pub pending: Vec<Transaction>,
}

pub struct Pipeline {
    conn: Connection,
    rng: StdRng,
    queue: PendingQueue,
    recent_limit: usize,
}

impl Pipeline {
    /// Open (creating if needed) the database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_rng(path, StdRng::from_entropy())
    }

    /// Like [`Pipeline::open`] with a caller-supplied RNG, so category
    /// colors are reproducible.
    pub fn open_with_rng(path: &Path, rng: StdRng) -> Result<Self> {
        let conn = get_connection(path)?;
        init_db(&conn)?;
        let queue = PendingQueue::load(&conn)?;
        Ok(Self {
            conn,
            rng,
            queue,
            recent_limit: DEFAULT_RECENT_LIMIT,
        })
    }

    pub fn with_recent_limit(mut self, limit: usize) -> Self {
        self.recent_limit = limit;
        self
    }

    fn refresh_queue(&mut self) {
        match PendingQueue::load(&self.conn) {
            Ok(queue) => self.queue = queue,
            Err(e) => warn!(error = %e, "Could not reload pending queue"),
        }
    }

    // -----------------------------------------------------------------------
    // Import and categorization
    // -----------------------------------------------------------------------

    pub fn import_file(&mut self, path: &Path) -> Result<ImportOutcome> {
        let summary = importer::import_file(&self.conn, path)?;
        self.queue = PendingQueue::load(&self.conn)?;
        let pending = self.queue.iter().cloned().collect();
        Ok(ImportOutcome { summary, pending })
    }

    pub fn uncategorized_transactions(&self) -> Result<Vec<Transaction>> {
        reviewer::get_uncategorized_transactions(&self.conn)
    }

    /// Categorize any transaction by id, then reload the pending queue.
    pub fn submit_categorization(&mut self, transaction_id: i64, category_id: i64, recurring: bool) -> MutationResult {
        match reviewer::submit_categorization(&self.conn, transaction_id, category_id, recurring, &mut self.rng) {
            Ok(()) => {
                self.refresh_queue();
                MutationResult::ok()
            }
            Err(e) => failed("submit categorization", e),
        }
    }

    /// Head of the pending queue.
    pub fn pending(&self) -> Option<&Transaction> {
        self.queue.peek()
    }

    pub fn pending_len(&self) -> usize {
        self.queue.len()
    }

    /// Categorize the head of the queue. On failure the head stays put.
    pub fn submit_pending(&mut self, category_id: i64, recurring: bool) -> MutationResult {
        match self.queue.submit(&self.conn, category_id, recurring, &mut self.rng) {
            Ok(done) => MutationResult::created(done.id),
            Err(e) => failed("submit pending", e),
        }
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub fn dashboard(&self) -> Result<Dashboard> {
        self.dashboard_at(chrono::Local::now().date_naive())
    }

    pub fn dashboard_at(&self, today: NaiveDate) -> Result<Dashboard> {
        reports::get_dashboard(&self.conn, today, self.recent_limit)
    }

    pub fn transactions(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>> {
        transactions::get_transactions(&self.conn, filter)
    }

    pub fn categories(&self) -> Result<Vec<Category>> {
        categories::list_categories(&self.conn)
    }

    pub fn vendors(&self) -> Result<Vec<Vendor>> {
        vendors::list_vendors(&self.conn)
    }

    pub fn import_history(&self) -> Result<Vec<ImportRecord>> {
        importer::list_import_history(&self.conn)
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    pub fn add_category(&mut self, name: &str, parent_id: Option<i64>, color: Option<&str>) -> MutationResult {
        match categories::add_category(&self.conn, name, parent_id, color) {
            Ok(id) => MutationResult::created(id),
            Err(e) => failed("add category", e),
        }
    }

    pub fn update_category_color(&mut self, id: i64, color: &str) -> MutationResult {
        match categories::update_category_color(&self.conn, id, color) {
            Ok(()) => MutationResult::ok(),
            Err(e) => failed("update category color", e),
        }
    }

    /// Deleting a category returns its transactions to the pending queue.
    pub fn delete_category(&mut self, id: i64) -> MutationResult {
        match categories::delete_category(&self.conn, id) {
            Ok(()) => {
                self.refresh_queue();
                MutationResult::ok()
            }
            Err(e) => failed("delete category", e),
        }
    }

    pub fn set_vendor_category(&mut self, vendor_id: i64, category_id: Option<i64>) -> MutationResult {
        match vendors::set_vendor_category(&self.conn, vendor_id, category_id) {
            Ok(()) => MutationResult::ok(),
            Err(e) => failed("set vendor category", e),
        }
    }

    pub fn delete_transaction(&mut self, id: i64) -> MutationResult {
        match transactions::delete_transaction(&self.conn, id) {
            Ok(()) => {
                self.refresh_queue();
                MutationResult::ok()
            }
            Err(e) => failed("delete transaction", e),
        }
    }

    pub fn clear_all_data(&mut self) -> MutationResult {
        match db::clear_all_data(&self.conn) {
            Ok(()) => {
                self.queue = PendingQueue::default();
                MutationResult::ok()
            }
            Err(e) => failed("clear data", e),
        }
    }
}

fn failed(action: &str, e: crate::error::SpendError) -> MutationResult {
    warn!(action, error = %e, "Mutation failed");
    MutationResult::failed(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categories::is_valid_color;
    use crate::db::DEFAULT_COLOR;
    use std::path::PathBuf;

    fn test_pipeline() -> (tempfile::TempDir, Pipeline) {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::open_with_rng(&dir.path().join("test.db"), StdRng::seed_from_u64(42)).unwrap();
        (dir, pipeline)
    }

    fn write_csv(dir: &Path, name: &str, rows: &[&str]) -> PathBuf {
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
    fn test_import_then_drain_queue() {
        let (dir, mut p) = test_pipeline();
        let shopping = p.add_category("Shopping", None, None).id.unwrap();
        let streaming = p.add_category("Streaming", None, None).id.unwrap();
        let path = write_csv(dir.path(), "jan.csv", &[
            "POSTED,01/15/2024,POS AMAZON PURCHASE,42.50,",
            "POSTED,01/20/2024,NETFLIX.COM,15.99,",
            "POSTED,01/22/2024,POS AMAZON PURCHASE,8.00,",
        ]);
        let outcome = p.import_file(&path).unwrap();
        assert_eq!(outcome.summary.imported, 3);
        assert_eq!(outcome.pending.len(), 3);
        assert_eq!(p.pending_len(), 3);

        // Newest first: AMAZON 01/22
        assert_eq!(p.pending().unwrap().vendor_name, "AMAZON");
        assert!(p.submit_pending(shopping, false).success);
        assert_eq!(p.pending().unwrap().vendor_name, "NETFLIX.COM");
        assert!(p.submit_pending(streaming, true).success);
        // The older AMAZON row is still queued; vendor defaults only apply to new imports
        assert_eq!(p.pending_len(), 1);
        assert!(p.submit_pending(shopping, false).success);
        assert!(p.pending().is_none());

        let cats = p.categories().unwrap();
        assert!(cats.iter().all(|c| is_valid_color(&c.color) && c.color != DEFAULT_COLOR));
    }

    #[test]
    fn test_failed_submit_keeps_head() {
        let (dir, mut p) = test_pipeline();
        let path = write_csv(dir.path(), "jan.csv", &["POSTED,01/15/2024,CAFE,5.00,"]);
        p.import_file(&path).unwrap();
        let head = p.pending().unwrap().id;
        let result = p.submit_pending(12345, false);
        assert!(!result.success);
        assert!(result.error.is_some());
        assert_eq!(p.pending().unwrap().id, head);
    }

    #[test]
    fn test_submit_by_id_outside_head() {
        let (dir, mut p) = test_pipeline();
        let cat = p.add_category("Travel", None, None).id.unwrap();
        let path = write_csv(dir.path(), "jan.csv", &[
            "POSTED,01/05/2024,AIRLINE,320.00,",
            "POSTED,01/10/2024,HOTEL,180.00,",
            "POSTED,01/15/2024,TAXI,25.00,",
        ]);
        p.import_file(&path).unwrap();
        let head = p.pending().unwrap().id;
        let middle = p.uncategorized_transactions().unwrap()[1].id;
        assert_ne!(head, middle);

        let result = p.submit_categorization(middle, cat, false);
        assert!(result.success);
        assert_eq!(p.pending_len(), 2);
        assert_eq!(p.pending().unwrap().id, head);
        assert!(p.queue.iter().all(|t| t.id != middle));
        assert!(p.uncategorized_transactions().unwrap().iter().all(|t| t.id != middle));
    }

    #[test]
    fn test_submit_by_id_bad_category_leaves_queue() {
        let (dir, mut p) = test_pipeline();
        let path = write_csv(dir.path(), "jan.csv", &["POSTED,01/05/2024,AIRLINE,320.00,", "POSTED,01/10/2024,HOTEL,180.00,"]);
        p.import_file(&path).unwrap();
        let head = p.pending().unwrap().id;
        let target = p.uncategorized_transactions().unwrap()[1].id;

        let result = p.submit_categorization(target, 9999, true);
        assert!(!result.success);
        assert!(result.error.is_some());
        assert_eq!(p.pending_len(), 2);
        assert_eq!(p.pending().unwrap().id, head);
        assert_eq!(p.uncategorized_transactions().unwrap().len(), 2);
    }

    #[test]
    fn test_import_unrecognized_propagates() {
        let (dir, mut p) = test_pipeline();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "Foo,Bar\n").unwrap();
        assert!(p.import_file(&path).is_err());
        assert!(p.import_history().unwrap().is_empty());
    }

    #[test]
    fn test_mutation_results() {
        let (_dir, mut p) = test_pipeline();
        let created = p.add_category("Food", None, Some("#aabbcc"));
        assert!(created.success);
        let id = created.id.unwrap();

        let dup = p.add_category("Food", None, None);
        assert!(!dup.success);
        assert!(dup.error.unwrap().contains("already exists"));

        assert!(!p.update_category_color(id, "blue").success);
        assert!(p.update_category_color(id, "#010203").success);
        assert!(!p.delete_category(999).success);
        assert!(!p.delete_transaction(999).success);
        assert!(!p.set_vendor_category(999, None).success);
        assert!(p.delete_category(id).success);
    }

    #[test]
    fn test_delete_category_requeues_transactions() {
        let (dir, mut p) = test_pipeline();
        let cat = p.add_category("Coffee", None, None).id.unwrap();
        let path = write_csv(dir.path(), "jan.csv", &["POSTED,01/15/2024,CAFE,5.00,"]);
        p.import_file(&path).unwrap();
        assert!(p.submit_pending(cat, false).success);
        assert_eq!(p.pending_len(), 0);

        assert!(p.delete_category(cat).success);
        assert_eq!(p.pending_len(), 1);
        assert_eq!(p.vendors().unwrap()[0].category_id, None);
    }

    #[test]
    fn test_clear_all_data() {
        let (dir, mut p) = test_pipeline();
        let path = write_csv(dir.path(), "jan.csv", &["POSTED,01/15/2024,CAFE,5.00,"]);
        p.import_file(&path).unwrap();
        assert!(p.clear_all_data().success);
        assert!(p.transactions(&TransactionFilter::default()).unwrap().is_empty());
        assert!(p.vendors().unwrap().is_empty());
        assert!(p.pending().is_none());
        assert_eq!(p.import_history().unwrap().len(), 1);
    }

    #[test]
    fn test_dashboard_at() {
        let (dir, mut p) = test_pipeline();
        let cat = p.add_category("Coffee", None, None).id.unwrap();
        let path = write_csv(dir.path(), "jan.csv", &["POSTED,01/15/2024,CAFE,5.00,"]);
        p.import_file(&path).unwrap();
        p.submit_pending(cat, true);
        let dash = p.dashboard_at(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()).unwrap();
        assert_eq!(dash.monthly.labels, vec!["2024-01"]);
        assert_eq!(dash.monthly.recurring, vec![5.0]);
        assert_eq!(dash.categories[0].name, "Coffee");
        assert_eq!(dash.pivot.row("Coffee").unwrap(), &[5.0]);
        assert_eq!(dash.recent.len(), 1);
    }
}
