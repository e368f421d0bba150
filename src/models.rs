use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
    pub color: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Vendor {
    pub id: i64,
    pub name: String,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
}

/// A stored transaction joined with its vendor and category display names.
#[derive(Debug, Clone, Serialize)]
pub struct Transaction {
    pub id: i64,
    pub date: String,
    pub vendor_id: i64,
    pub vendor_name: String,
    pub amount: f64,
    pub description: String,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub recurring: bool,
    pub source_file: Option<String>,
}

impl Transaction {
    /// Column list matching [`Transaction::from_row`]. Callers append their
    /// own WHERE / ORDER BY.
    pub(crate) const SELECT: &'static str = "SELECT t.id, t.date, t.vendor_id, v.name, t.amount, \
         t.description, t.category_id, c.name, t.recurring, t.source_file \
         FROM transactions t \
         JOIN vendors v ON t.vendor_id = v.id \
         LEFT JOIN categories c ON t.category_id = c.id";

    pub(crate) fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            date: row.get(1)?,
            vendor_id: row.get(2)?,
            vendor_name: row.get(3)?,
            amount: row.get(4)?,
            description: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
            category_id: row.get(6)?,
            category_name: row.get(7)?,
            recurring: row.get(8)?,
            source_file: row.get(9)?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportRecord {
    pub id: i64,
    pub filename: String,
    pub import_date: String,
    pub transaction_count: i64,
    pub checksum: Option<String>,
}

/// Intermediate representation from a layout parser before vendor resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRow {
    pub date: String,
    pub vendor_raw: String,
    pub description: String,
    pub amount: f64,
}

/// Optional constraints for listing transactions. Unset fields don't filter.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub category_id: Option<i64>,
    pub vendor_id: Option<i64>,
    pub search: Option<String>,
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
}

/// Outcome of a user-initiated mutation, shaped for a presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MutationResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

impl MutationResult {
    pub fn ok() -> Self {
        Self { success: true, error: None, id: None }
    }

    pub fn created(id: i64) -> Self {
        Self { success: true, error: None, id: Some(id) }
    }

    pub fn failed(error: impl ToString) -> Self {
        Self { success: false, error: Some(error.to_string()), id: None }
    }
}
