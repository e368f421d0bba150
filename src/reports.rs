use std::collections::HashMap;

use chrono::{Months, NaiveDate};
use rusqlite::Connection;
use serde::Serialize;

use crate::error::Result;
use crate::models::Transaction;

pub const DEFAULT_RECENT_LIMIT: usize = 10;

// ---------------------------------------------------------------------------
// Window helpers
// ---------------------------------------------------------------------------

fn months_ago(today: NaiveDate, months: u32) -> String {
    today
        .checked_sub_months(Months::new(months))
        .unwrap_or(NaiveDate::MIN)
        .format("%Y-%m-%d")
        .to_string()
}

fn days_ago(today: NaiveDate, days: u64) -> String {
    today
        .checked_sub_days(chrono::Days::new(days))
        .unwrap_or(NaiveDate::MIN)
        .format("%Y-%m-%d")
        .to_string()
}

// ---------------------------------------------------------------------------
// Monthly recurring / non-recurring series
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct MonthlySeries {
    pub labels: Vec<String>,
    pub recurring: Vec<f64>,
    pub non_recurring: Vec<f64>,
}

pub fn get_monthly_series(conn: &Connection, today: NaiveDate) -> Result<MonthlySeries> {
    let mut stmt = conn.prepare(
        "SELECT substr(date, 1, 7) AS month, \
                COALESCE(SUM(CASE WHEN recurring = 1 THEN amount ELSE 0 END), 0), \
                COALESCE(SUM(CASE WHEN recurring = 0 THEN amount ELSE 0 END), 0) \
         FROM transactions WHERE date >= ?1 \
         GROUP BY month ORDER BY month",
    )?;
    let mut series = MonthlySeries::default();
    let rows = stmt.query_map([months_ago(today, 12)], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?, row.get::<_, f64>(2)?))
    })?;
    for row in rows {
        let (label, recurring, non_recurring) = row?;
        series.labels.push(label);
        series.recurring.push(recurring);
        series.non_recurring.push(non_recurring);
    }
    Ok(series)
}

// ---------------------------------------------------------------------------
// Category breakdown
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct CategoryTotal {
    pub name: String,
    pub color: String,
    pub total: f64,
    pub recurring_count: i64,
}

/// Per-category totals over the trailing 30 days, largest first.
pub fn get_category_breakdown(conn: &Connection, today: NaiveDate) -> Result<Vec<CategoryTotal>> {
    let mut stmt = conn.prepare(
        "SELECT c.name, c.color, SUM(t.amount) AS total, SUM(t.recurring) \
         FROM transactions t JOIN categories c ON t.category_id = c.id \
         WHERE t.date >= ?1 \
         GROUP BY c.id ORDER BY total DESC, c.name",
    )?;
    let rows = stmt
        .query_map([days_ago(today, 30)], |row| {
            Ok(CategoryTotal {
                name: row.get(0)?,
                color: row.get(1)?,
                total: row.get(2)?,
                recurring_count: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Month x category pivot
// ---------------------------------------------------------------------------

/// Dense category-by-month matrix: `cells[category][month]`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PivotTable {
    pub months: Vec<String>,
    pub categories: Vec<String>,
    pub cells: Vec<Vec<f64>>,
}

impl PivotTable {
    /// Lay out the axes and overlay the sums. Pairs whose month or category
    /// is not on an axis are ignored.
    pub fn build(months: Vec<String>, categories: Vec<String>, sums: &[(String, String, f64)]) -> Self {
        let month_idx: HashMap<&str, usize> = months.iter().enumerate().map(|(i, m)| (m.as_str(), i)).collect();
        let cat_idx: HashMap<&str, usize> = categories.iter().enumerate().map(|(i, c)| (c.as_str(), i)).collect();
        let mut cells = vec![vec![0.0; months.len()]; categories.len()];
        for (month, category, total) in sums {
            if let (Some(&m), Some(&c)) = (month_idx.get(month.as_str()), cat_idx.get(category.as_str())) {
                cells[c][m] += total;
            }
        }
        Self { months, categories, cells }
    }

    #[allow(dead_code)]
    pub fn row(&self, category: &str) -> Option<&[f64]> {
        let i = self.categories.iter().position(|c| c == category)?;
        Some(&self.cells[i])
    }

    pub fn total(&self) -> f64 {
        self.cells.iter().flatten().sum()
    }
}

pub fn get_pivot(conn: &Connection, today: NaiveDate) -> Result<PivotTable> {
    let cutoff = months_ago(today, 12);

    let months = conn
        .prepare("SELECT DISTINCT substr(date, 1, 7) AS month FROM transactions WHERE date >= ?1 ORDER BY month")?
        .query_map([&cutoff], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    let categories = conn
        .prepare("SELECT name FROM categories ORDER BY name")?
        .query_map([], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    let sums = conn
        .prepare(
            "SELECT substr(t.date, 1, 7) AS month, c.name, SUM(t.amount) \
             FROM transactions t JOIN categories c ON t.category_id = c.id \
             WHERE t.date >= ?1 GROUP BY month, c.id",
        )?
        .query_map([&cutoff], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
        .collect::<std::result::Result<Vec<(String, String, f64)>, _>>()?;

    Ok(PivotTable::build(months, categories, &sums))
}

// ---------------------------------------------------------------------------
// Recent transactions and dashboard
// ---------------------------------------------------------------------------

pub fn get_recent_transactions(conn: &Connection, limit: usize) -> Result<Vec<Transaction>> {
    let sql = format!("{} ORDER BY t.date DESC, t.id DESC LIMIT ?1", Transaction::SELECT);
    let rows = conn
        .prepare(&sql)?
        .query_map([limit as i64], Transaction::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub monthly: MonthlySeries,
    pub categories: Vec<CategoryTotal>,
    pub pivot: PivotTable,
    pub recent: Vec<Transaction>,
}

pub fn get_dashboard(conn: &Connection, today: NaiveDate, recent_limit: usize) -> Result<Dashboard> {
    Ok(Dashboard {
        monthly: get_monthly_series(conn, today)?,
        categories: get_category_breakdown(conn, today)?,
        pivot: get_pivot(conn, today)?,
        recent: get_recent_transactions(conn, recent_limit)?,
    })
}
