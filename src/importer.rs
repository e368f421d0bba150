use std::collections::HashSet;
use std::path::Path;

use rusqlite::Connection;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::db::write_txn;
use crate::error::{Result, SpendError};
use crate::models::{ImportRecord, ParsedRow};
use crate::vendors::{default_category, resolve_vendor, vendor_key};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a statement amount. `$`, `,` and quotes are ignored and `(x)` reads
/// as `-x`. Returns `None` for anything non-numeric.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let s = raw.replace([',', '"', '$'], "");
    let s = s.trim();
    let value = match s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        Some(inner) => -inner.trim().parse::<f64>().ok()?,
        None => s.parse::<f64>().ok()?,
    };
    value.is_finite().then_some(value)
}

/// `M/D/YYYY` (padding optional) to `YYYY-MM-DD`.
pub fn parse_date_mdy(raw: &str) -> Option<String> {
    let parts: Vec<&str> = raw.trim().split('/').collect();
    if parts.len() != 3 {
        return None;
    }
    let m: u32 = parts[0].trim().parse().ok()?;
    let d: u32 = parts[1].trim().parse().ok()?;
    let y: i32 = parts[2].trim().parse().ok()?;
    chrono::NaiveDate::from_ymd_opt(y, m, d).map(|dt| dt.format("%Y-%m-%d").to_string())
}

/// Split one CSV line into trimmed fields. Quoted fields keep embedded commas.
pub fn split_fields(line: &str) -> Vec<String> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(line.as_bytes());
    match rdr.records().next() {
        Some(Ok(record)) => record.iter().map(str::to_string).collect(),
        _ => Vec::new(),
    }
}

/// Non-blank lines of a statement, trimmed.
pub fn statement_lines(content: &str) -> Vec<&str> {
    content.lines().map(str::trim).filter(|l| !l.is_empty()).collect()
}

fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

// ---------------------------------------------------------------------------
// Layouts, tried in priority order
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsvLayout {
    /// `Date, Description, Amount, Running Bal.` below a six-line title block.
    RunningBalance,
    /// `Status, Date, Description, Debit, Credit` on the first line.
    DebitCredit,
}

const ALL_LAYOUTS: &[CsvLayout] = &[CsvLayout::RunningBalance, CsvLayout::DebitCredit];

impl CsvLayout {
    pub fn key(&self) -> &'static str {
        match self {
            Self::RunningBalance => "running_balance",
            Self::DebitCredit => "debit_credit",
        }
    }

    pub fn headers(&self) -> &'static [&'static str] {
        match self {
            Self::RunningBalance => &["Date", "Description", "Amount", "Running Bal."],
            Self::DebitCredit => &["Status", "Date", "Description", "Debit", "Credit"],
        }
    }

    /// Index of the header line among the non-blank lines.
    pub fn header_line(&self) -> usize {
        match self {
            Self::RunningBalance => 6,
            Self::DebitCredit => 0,
        }
    }

    pub fn detect(&self, lines: &[&str]) -> bool {
        let Some(line) = lines.get(self.header_line()) else {
            return false;
        };
        let fields = split_fields(line);
        self.headers().iter().all(|h| fields.iter().any(|f| f == h))
    }

    /// Convert one data row. `None` drops the row.
    pub fn parse_row(&self, fields: &[String]) -> Option<ParsedRow> {
        if fields.len() < self.headers().len() {
            return None;
        }
        let (date, description, amount) = match self {
            Self::RunningBalance => {
                let amount = if fields[2].is_empty() { 0.0 } else { parse_amount(&fields[2])? };
                (&fields[0], &fields[1], amount)
            }
            // Debit wins when both columns are filled.
            Self::DebitCredit => {
                let amount = if !fields[3].is_empty() {
                    parse_amount(&fields[3])?
                } else if !fields[4].is_empty() {
                    -parse_amount(&fields[4])?
                } else {
                    0.0
                };
                (&fields[1], &fields[2], amount)
            }
        };
        Some(ParsedRow {
            date: parse_date_mdy(date)?,
            vendor_raw: description.clone(),
            description: description.clone(),
            amount,
        })
    }

    pub fn parse(&self, lines: &[&str]) -> Vec<ParsedRow> {
        let data = lines.iter().skip(self.header_line() + 1);
        let total = data.len();
        let rows: Vec<ParsedRow> = data.filter_map(|line| self.parse_row(&split_fields(line))).collect();
        debug!(layout = self.key(), parsed = rows.len(), dropped = total - rows.len(), "Parsed statement rows");
        rows
    }
}

pub fn detect_layout(lines: &[&str]) -> Result<CsvLayout> {
    ALL_LAYOUTS
        .iter()
        .find(|layout| layout.detect(lines))
        .copied()
        .ok_or(SpendError::UnrecognizedFormat)
}

// ---------------------------------------------------------------------------
// Deduplication
// ---------------------------------------------------------------------------

/// Exact (date, vendor, description, amount) match against stored history.
pub fn is_duplicate(conn: &Connection, vendor: &str, row: &ParsedRow) -> Result<bool> {
    let mut stmt = conn.prepare_cached(
        "SELECT 1 FROM transactions t JOIN vendors v ON t.vendor_id = v.id \
         WHERE t.date = ?1 AND t.description = ?2 AND t.amount = ?3 AND v.name = ?4",
    )?;
    Ok(stmt.exists(rusqlite::params![row.date, row.description, row.amount, vendor])?)
}

// ---------------------------------------------------------------------------
// import_file
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub duplicates: usize,
    /// Vendors seen in this import with no default category, first-seen order.
    pub uncategorized_vendor_ids: Vec<i64>,
}

/// Import one statement file.
///
/// Unreadable files and unknown layouts fail before anything is written.
/// Each row is checked and inserted in its own write transaction, so rows
/// inserted before a later store failure stay in place. One import record is
/// appended per call.
pub fn import_file(conn: &Connection, file_path: &Path) -> Result<ImportSummary> {
    let data = std::fs::read(file_path)?;
    let content = String::from_utf8_lossy(&data);
    let lines = statement_lines(&content);
    let layout = detect_layout(&lines)?;
    let filename = file_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    info!(file = %filename, layout = layout.key(), "Importing statement");

    let rows = layout.parse(&lines);

    let mut summary = ImportSummary::default();
    let mut seen_uncategorized = HashSet::new();
    for row in &rows {
        let vendor = vendor_key(&row.vendor_raw);

        // The duplicate check and the insert share one write lock so
        // concurrent importers cannot both store the same row.
        let tx = write_txn(conn)?;
        if is_duplicate(&tx, &vendor, row)? {
            summary.duplicates += 1;
            continue;
        }
        let vendor_id = resolve_vendor(&tx, &vendor)?;
        let category_id = default_category(&tx, vendor_id)?;
        tx.execute(
            "INSERT INTO transactions (date, vendor_id, description, amount, category_id, recurring, source_file) \
             VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
            rusqlite::params![row.date, vendor_id, row.description, row.amount, category_id, filename],
        )?;
        tx.commit()?;

        if category_id.is_none() && seen_uncategorized.insert(vendor_id) {
            summary.uncategorized_vendor_ids.push(vendor_id);
        }
        summary.imported += 1;
    }

    conn.execute(
        "INSERT INTO import_history (filename, transaction_count, checksum) VALUES (?1, ?2, ?3)",
        rusqlite::params![filename, summary.imported as i64, compute_checksum(&data)],
    )?;

    info!(
        file = %filename,
        imported = summary.imported,
        duplicates = summary.duplicates,
        uncategorized_vendors = summary.uncategorized_vendor_ids.len(),
        "Import complete"
    );
    Ok(summary)
}

/// Import records, most recent first.
pub fn list_import_history(conn: &Connection) -> Result<Vec<ImportRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, filename, import_date, transaction_count, checksum \
         FROM import_history ORDER BY id DESC",
    )?;
    let records = stmt
        .query_map([], |row| {
            Ok(ImportRecord {
                id: row.get(0)?,
                filename: row.get(1)?,
                import_date: row.get(2)?,
                transaction_count: row.get(3)?,
                checksum: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(records)
}
