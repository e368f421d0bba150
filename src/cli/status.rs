use serde::Serialize;

use crate::cli::print_json;
use crate::db::get_connection;
use crate::error::Result;
use crate::settings::{load_settings, settings_path};

#[derive(Serialize)]
struct Counts {
    categories: i64,
    vendors: i64,
    transactions: i64,
    uncategorized: i64,
    imports: i64,
}

fn count(conn: &rusqlite::Connection, sql: &str) -> Result<i64> {
    Ok(conn.query_row(sql, [], |r| r.get(0))?)
}

pub fn run(json: bool) -> Result<()> {
    let settings = load_settings();
    let db_path = settings.db_path();

    let counts = if db_path.exists() {
        let conn = get_connection(&db_path)?;
        Some(Counts {
            categories: count(&conn, "SELECT count(*) FROM categories")?,
            vendors: count(&conn, "SELECT count(*) FROM vendors")?,
            transactions: count(&conn, "SELECT count(*) FROM transactions")?,
            uncategorized: count(&conn, "SELECT count(*) FROM transactions WHERE category_id IS NULL")?,
            imports: count(&conn, "SELECT count(*) FROM import_history")?,
        })
    } else {
        None
    };

    if json {
        return print_json(&serde_json::json!({
            "settings": settings_path(),
            "database": db_path,
            "counts": counts,
        }));
    }

    println!("Settings:   {}", settings_path().display());
    println!("Database:   {}", db_path.display());
    match counts {
        Some(c) => {
            println!();
            println!("Categories:     {}", c.categories);
            println!("Vendors:        {}", c.vendors);
            println!("Transactions:   {}", c.transactions);
            println!("Uncategorized:  {}", c.uncategorized);
            println!("Imports:        {}", c.imports);
        }
        None => {
            println!();
            println!("Database not found. Run `spendwise init` to set up.");
        }
    }
    Ok(())
}
