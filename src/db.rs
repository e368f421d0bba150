use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::error::Result;

pub const DEFAULT_COLOR: &str = "#e0e0e0";

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    parent_id INTEGER,
    color TEXT NOT NULL DEFAULT '#e0e0e0',
    color_assigned INTEGER NOT NULL DEFAULT 0,
    FOREIGN KEY (parent_id) REFERENCES categories(id)
);

CREATE TABLE IF NOT EXISTS vendors (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    category_id INTEGER,
    FOREIGN KEY (category_id) REFERENCES categories(id)
);

CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    date TEXT NOT NULL,
    vendor_id INTEGER NOT NULL,
    amount REAL NOT NULL,
    description TEXT,
    category_id INTEGER,
    recurring INTEGER NOT NULL DEFAULT 0,
    source_file TEXT,
    FOREIGN KEY (vendor_id) REFERENCES vendors(id),
    FOREIGN KEY (category_id) REFERENCES categories(id)
);

CREATE INDEX IF NOT EXISTS idx_transactions_fingerprint
    ON transactions (date, description, amount);
CREATE INDEX IF NOT EXISTS idx_transactions_category ON transactions (category_id);

CREATE TABLE IF NOT EXISTS import_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    filename TEXT NOT NULL,
    import_date TEXT NOT NULL DEFAULT (datetime('now')),
    transaction_count INTEGER NOT NULL,
    checksum TEXT
);
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    conn.busy_timeout(Duration::from_secs(5))?;
    Ok(conn)
}

/// Creates the schema, adds the color flag to databases created without it,
/// and backfills any category left without a color.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    migrate_color_assigned(conn)?;
    let backfilled = conn.execute(
        "UPDATE categories SET color = ?1, color_assigned = 0 WHERE color IS NULL OR trim(color) = ''",
        [DEFAULT_COLOR],
    )?;
    if backfilled > 0 {
        tracing::info!(backfilled, "Backfilled missing category colors");
    }
    Ok(())
}

/// For databases created before the flag existed, any color other than the
/// placeholder counts as chosen.
fn migrate_color_assigned(conn: &Connection) -> Result<()> {
    let present: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM pragma_table_info('categories') WHERE name = 'color_assigned')",
        [],
        |row| row.get(0),
    )?;
    if present {
        return Ok(());
    }
    conn.execute_batch("ALTER TABLE categories ADD COLUMN color_assigned INTEGER NOT NULL DEFAULT 0")?;
    let marked = conn.execute(
        "UPDATE categories SET color_assigned = 1 WHERE trim(color) <> '' AND lower(trim(color)) <> ?1",
        [DEFAULT_COLOR],
    )?;
    tracing::info!(marked, "Added category color_assigned column");
    Ok(())
}

/// Opens a write transaction that takes the database write lock up front.
///
/// Every mutation goes through here so two writers never interleave on the
/// same rows. Dropping the returned transaction without `commit` rolls back.
pub fn write_txn(conn: &Connection) -> Result<Transaction<'_>> {
    Ok(Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?)
}

/// Delete every transaction, vendor and category and restart their ids.
/// Import history is kept.
pub fn clear_all_data(conn: &Connection) -> Result<()> {
    let tx = write_txn(conn)?;
    tx.execute_batch(
        "DELETE FROM transactions;
         DELETE FROM vendors;
         DELETE FROM categories;
         DELETE FROM sqlite_sequence WHERE name IN ('transactions', 'vendors', 'categories');",
    )?;
    tx.commit()?;
    tracing::info!("Cleared all transactions, vendors and categories");
    Ok(())
}

#[cfg(test)]
pub(crate) fn test_db() -> (tempfile::TempDir, Connection) {
    let dir = tempfile::tempdir().unwrap();
    let conn = get_connection(&dir.path().join("test.db")).unwrap();
    init_db(&conn).unwrap();
    (dir, conn)
}
