use rusqlite::types::Value;
use rusqlite::Connection;
use tracing::info;

use crate::db::write_txn;
use crate::error::{Result, SpendError};
use crate::models::{Transaction, TransactionFilter};

/// Escape `\`, `%` and `_` so they match literally in a `LIKE ... ESCAPE '\'`.
fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Transactions matching every set field of `filter`, newest first.
///
/// Dates are inclusive bounds. `search` is a case-insensitive substring match
/// on either the vendor name or the description. `%` and `_` in it match
/// themselves.
pub fn get_transactions(conn: &Connection, filter: &TransactionFilter) -> Result<Vec<Transaction>> {
    let mut clauses: Vec<&str> = Vec::new();
    let mut params: Vec<Value> = Vec::new();

    if let Some(start) = &filter.start_date {
        clauses.push("t.date >= ?");
        params.push(Value::Text(start.clone()));
    }
    if let Some(end) = &filter.end_date {
        clauses.push("t.date <= ?");
        params.push(Value::Text(end.clone()));
    }
    if let Some(category_id) = filter.category_id {
        clauses.push("t.category_id = ?");
        params.push(Value::Integer(category_id));
    }
    if let Some(vendor_id) = filter.vendor_id {
        clauses.push("t.vendor_id = ?");
        params.push(Value::Integer(vendor_id));
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        clauses.push("(v.name LIKE ? ESCAPE '\\' OR t.description LIKE ? ESCAPE '\\')");
        let pattern = format!("%{}%", escape_like(search));
        params.push(Value::Text(pattern.clone()));
        params.push(Value::Text(pattern));
    }
    if let Some(min) = filter.min_amount {
        clauses.push("t.amount >= ?");
        params.push(Value::Real(min));
    }
    if let Some(max) = filter.max_amount {
        clauses.push("t.amount <= ?");
        params.push(Value::Real(max));
    }

    let mut sql = Transaction::SELECT.to_string();
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY t.date DESC, t.id DESC");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(params), Transaction::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn delete_transaction(conn: &Connection, id: i64) -> Result<()> {
    let tx = write_txn(conn)?;
    let deleted = tx.execute("DELETE FROM transactions WHERE id = ?1", [id])?;
    if deleted == 0 {
        return Err(SpendError::NotFound(format!("Transaction {id}")));
    }
    tx.commit()?;
    info!(id, "Deleted transaction");
    Ok(())
}
