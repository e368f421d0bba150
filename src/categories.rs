use std::sync::OnceLock;

use rand::Rng;
use regex::Regex;
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

use crate::db::{write_txn, DEFAULT_COLOR};
use crate::error::{Result, SpendError};
use crate::models::Category;

// ---------------------------------------------------------------------------
// Colors
// ---------------------------------------------------------------------------

fn color_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("invalid color regex"))
}

pub fn is_valid_color(color: &str) -> bool {
    color_re().is_match(color)
}

/// `hsl(h, s%, l%)` as `#rrggbb`.
pub fn hsl_to_hex(hue: f64, saturation: f64, lightness: f64) -> String {
    let c = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let h = (hue.rem_euclid(360.0)) / 60.0;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = lightness - c / 2.0;
    let channel = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    format!("#{:02x}{:02x}{:02x}", channel(r), channel(g), channel(b))
}

/// A random pastel: uniform hue, 70% saturation, 80% lightness.
pub fn pastel_color<R: Rng + ?Sized>(rng: &mut R) -> String {
    let hue: f64 = rng.gen_range(0.0..360.0);
    hsl_to_hex(hue, 0.70, 0.80)
}

/// Give the category a pastel color unless one was already chosen for it.
/// Returns the color assigned, if any.
///
/// A color counts as chosen once it was passed to [`add_category`] or
/// [`update_category_color`], or assigned here, even if it equals the
/// placeholder.
pub(crate) fn ensure_color<R: Rng + ?Sized>(
    conn: &Connection,
    category_id: i64,
    rng: &mut R,
) -> Result<Option<String>> {
    let (color, chosen): (Option<String>, bool) = conn
        .query_row(
            "SELECT color, color_assigned FROM categories WHERE id = ?1",
            [category_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?
        .ok_or_else(|| SpendError::NotFound(format!("Category {category_id}")))?;
    if chosen && color.as_deref().is_some_and(|c| !c.trim().is_empty()) {
        return Ok(None);
    }
    let assigned = pastel_color(rng);
    conn.execute(
        "UPDATE categories SET color = ?1, color_assigned = 1 WHERE id = ?2",
        rusqlite::params![assigned, category_id],
    )?;
    debug!(category_id, color = %assigned, "Assigned category color");
    Ok(Some(assigned))
}

// ---------------------------------------------------------------------------
// Category data layer
// ---------------------------------------------------------------------------

pub fn list_categories(conn: &Connection) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare("SELECT id, name, parent_id, color FROM categories ORDER BY name")?;
    let categories = stmt
        .query_map([], |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
                parent_id: row.get(2)?,
                color: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(categories)
}

pub fn get_category(conn: &Connection, id: i64) -> Result<Category> {
    conn.query_row(
        "SELECT id, name, parent_id, color FROM categories WHERE id = ?1",
        [id],
        |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
                parent_id: row.get(2)?,
                color: row.get(3)?,
            })
        },
    )
    .optional()?
    .ok_or_else(|| SpendError::NotFound(format!("Category {id}")))
}

pub fn add_category(conn: &Connection, name: &str, parent_id: Option<i64>, color: Option<&str>) -> Result<i64> {
    let name = name.trim();
    if name.is_empty() {
        return Err(SpendError::InvalidInput("Invalid category name".into()));
    }
    let chosen = color.is_some();
    let color = color.unwrap_or(DEFAULT_COLOR);
    if !is_valid_color(color) {
        return Err(SpendError::InvalidInput(format!("Invalid color format: {color}")));
    }

    let tx = write_txn(conn)?;
    let exists: bool = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM categories WHERE name = ?1)",
        [name],
        |row| row.get(0),
    )?;
    if exists {
        return Err(SpendError::InvalidInput(format!("Category with this name already exists: {name}")));
    }
    if let Some(parent) = parent_id {
        get_category(&tx, parent)?;
    }
    tx.execute(
        "INSERT INTO categories (name, parent_id, color, color_assigned) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![name, parent_id, color, chosen],
    )?;
    let id = tx.last_insert_rowid();
    tx.commit()?;
    info!(category = name, id, "Added category");
    Ok(id)
}

pub fn update_category_color(conn: &Connection, id: i64, color: &str) -> Result<()> {
    if !is_valid_color(color) {
        return Err(SpendError::InvalidInput(format!("Invalid color format: {color}")));
    }
    let tx = write_txn(conn)?;
    let changed = tx.execute(
        "UPDATE categories SET color = ?1, color_assigned = 1 WHERE id = ?2",
        rusqlite::params![color, id],
    )?;
    if changed == 0 {
        return Err(SpendError::NotFound(format!("Category {id}")));
    }
    tx.commit()?;
    Ok(())
}

/// Delete a category, detaching every transaction, vendor and child category
/// that referenced it. Nothing else is deleted.
pub fn delete_category(conn: &Connection, id: i64) -> Result<()> {
    let tx = write_txn(conn)?;
    get_category(&tx, id)?;
    let transactions = tx.execute("UPDATE transactions SET category_id = NULL WHERE category_id = ?1", [id])?;
    let vendors = tx.execute("UPDATE vendors SET category_id = NULL WHERE category_id = ?1", [id])?;
    let children = tx.execute("UPDATE categories SET parent_id = NULL WHERE parent_id = ?1", [id])?;
    tx.execute("DELETE FROM categories WHERE id = ?1", [id])?;
    tx.commit()?;
    info!(id, transactions, vendors, children, "Deleted category");
    Ok(())
}
