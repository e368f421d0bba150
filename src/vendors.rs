use std::sync::OnceLock;

use regex::Regex;
use rusqlite::{Connection, OptionalExtension};

use crate::db::write_txn;
use crate::error::{Result, SpendError};
use crate::models::Vendor;

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Boilerplate stripped in order, each at most once.
fn affix_patterns() -> &'static [Regex] {
    static RE: OnceLock<Vec<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        [
            r"(?i)^POS\s+",
            r"(?i)^PURCHASE\s+",
            r"(?i)^DEBIT\s+",
            r"(?i)\s+PURCHASE$",
            r"(?i)\s+DEBIT$",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("invalid vendor affix regex"))
        .collect()
    })
}

fn noise_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\d{2}/\d{2}/\d{2,4}|\d{2}-\d{2}-\d{2,4}|\d{16,}").expect("invalid vendor noise regex")
    })
}

fn ws_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("invalid ws regex"))
}

/// Strip card-terminal boilerplate, embedded dates and card numbers from a
/// bank description.
pub fn normalize_vendor(description: &str) -> String {
    let mut vendor = description.trim().to_string();
    for re in affix_patterns() {
        vendor = re.replace(&vendor, "").into_owned();
    }
    let vendor = noise_re().replace_all(vendor.trim(), "");
    ws_re().replace_all(&vendor, " ").trim().to_string()
}

/// The unique vendor name for a description. Falls back to the raw
/// description when normalization strips everything.
pub fn vendor_key(description: &str) -> String {
    let normalized = normalize_vendor(description);
    if normalized.is_empty() {
        description.trim().to_string()
    } else {
        normalized
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Look up a vendor by exact name, creating it uncategorized on first sighting.
pub fn resolve_vendor(conn: &Connection, name: &str) -> Result<i64> {
    let existing: Option<i64> = conn
        .prepare_cached("SELECT id FROM vendors WHERE name = ?1")?
        .query_row([name], |row| row.get(0))
        .optional()?;
    if let Some(id) = existing {
        return Ok(id);
    }
    conn.execute("INSERT INTO vendors (name) VALUES (?1)", [name])?;
    let id = conn.last_insert_rowid();
    tracing::debug!(vendor = name, id, "Created vendor");
    Ok(id)
}

/// The vendor's learned default category, if any.
pub fn default_category(conn: &Connection, vendor_id: i64) -> Result<Option<i64>> {
    let category_id: Option<i64> = conn
        .prepare_cached("SELECT category_id FROM vendors WHERE id = ?1")?
        .query_row([vendor_id], |row| row.get(0))
        .optional()?
        .ok_or_else(|| SpendError::NotFound(format!("Vendor {vendor_id}")))?;
    Ok(category_id)
}

pub fn list_vendors(conn: &Connection) -> Result<Vec<Vendor>> {
    let mut stmt = conn.prepare(
        "SELECT v.id, v.name, v.category_id, c.name \
         FROM vendors v LEFT JOIN categories c ON v.category_id = c.id \
         ORDER BY v.name",
    )?;
    let vendors = stmt
        .query_map([], |row| {
            Ok(Vendor {
                id: row.get(0)?,
                name: row.get(1)?,
                category_id: row.get(2)?,
                category_name: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(vendors)
}

/// Set (or clear) a vendor's default category without touching its
/// existing transactions.
pub fn set_vendor_category(conn: &Connection, vendor_id: i64, category_id: Option<i64>) -> Result<()> {
    let tx = write_txn(conn)?;
    if let Some(cat) = category_id {
        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM categories WHERE id = ?1)",
            [cat],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(SpendError::NotFound(format!("Category {cat}")));
        }
    }
    let changed = tx.execute(
        "UPDATE vendors SET category_id = ?1 WHERE id = ?2",
        rusqlite::params![category_id, vendor_id],
    )?;
    if changed == 0 {
        return Err(SpendError::NotFound(format!("Vendor {vendor_id}")));
    }
    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;

    #[test]
    fn test_normalize_strips_prefix_and_suffix() {
        assert_eq!(normalize_vendor("POS AMAZON PURCHASE"), "AMAZON");
        assert_eq!(normalize_vendor("purchase Corner Cafe"), "Corner Cafe");
        assert_eq!(normalize_vendor("DEBIT NETFLIX.COM"), "NETFLIX.COM");
        assert_eq!(normalize_vendor("SHELL OIL DEBIT"), "SHELL OIL");
    }

    #[test]
    fn test_normalize_strips_stacked_prefixes_in_order() {
        assert_eq!(normalize_vendor("POS PURCHASE TARGET"), "TARGET");
        assert_eq!(normalize_vendor("POS DEBIT WALGREENS"), "WALGREENS");
    }

    #[test]
    fn test_normalize_removes_dates_and_card_numbers() {
        assert_eq!(normalize_vendor("WHOLE FOODS 01/15/24 AUSTIN"), "WHOLE FOODS AUSTIN");
        assert_eq!(normalize_vendor("UBER 03-02-2024 TRIP"), "UBER TRIP");
        assert_eq!(normalize_vendor("STARBUCKS 4417123456781234 SEATTLE"), "STARBUCKS SEATTLE");
        // Short digit runs are kept (store numbers)
        assert_eq!(normalize_vendor("SAFEWAY #1234"), "SAFEWAY #1234");
    }

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize_vendor("  TRADER   JOE'S   "), "TRADER JOE'S");
    }

    #[test]
    fn test_normalize_keeps_words_containing_tokens() {
        assert_eq!(normalize_vendor("POSTMATES"), "POSTMATES");
        assert_eq!(normalize_vendor("DEBITS R US"), "DEBITS R US");
    }

    #[test]
    fn test_vendor_key_falls_back_to_description() {
        assert_eq!(vendor_key("4417123456781234"), "4417123456781234");
        assert_eq!(vendor_key("POS AMAZON PURCHASE"), "AMAZON");
    }

    #[test]
    fn test_resolve_vendor_creates_once() {
        let (_dir, conn) = test_db();
        let first = resolve_vendor(&conn, "AMAZON").unwrap();
        let second = resolve_vendor(&conn, "AMAZON").unwrap();
        assert_eq!(first, second);
        let count: i64 = conn.query_row("SELECT count(*) FROM vendors", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 1);
        assert_eq!(default_category(&conn, first).unwrap(), None);
    }

    #[test]
    fn test_resolve_vendor_is_case_sensitive() {
        let (_dir, conn) = test_db();
        let upper = resolve_vendor(&conn, "AMAZON").unwrap();
        let lower = resolve_vendor(&conn, "Amazon").unwrap();
        assert_ne!(upper, lower);
    }

    #[test]
    fn test_set_vendor_category() {
        let (_dir, conn) = test_db();
        conn.execute("INSERT INTO categories (name) VALUES ('Shopping')", []).unwrap();
        let cat = conn.last_insert_rowid();
        let vendor = resolve_vendor(&conn, "AMAZON").unwrap();
        set_vendor_category(&conn, vendor, Some(cat)).unwrap();
        assert_eq!(default_category(&conn, vendor).unwrap(), Some(cat));

        let listed = list_vendors(&conn).unwrap();
        assert_eq!(listed[0].category_name.as_deref(), Some("Shopping"));

        set_vendor_category(&conn, vendor, None).unwrap();
        assert_eq!(default_category(&conn, vendor).unwrap(), None);
    }

    #[test]
    fn test_set_vendor_category_not_found() {
        let (_dir, conn) = test_db();
        let err = set_vendor_category(&conn, 42, None).unwrap_err();
        assert!(matches!(err, SpendError::NotFound(_)));

        let vendor = resolve_vendor(&conn, "AMAZON").unwrap();
        let err = set_vendor_category(&conn, vendor, Some(7)).unwrap_err();
        assert!(matches!(err, SpendError::NotFound(_)));
    }
}
