use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::{open_pipeline, print_json, report_mutation};
use crate::error::Result;
use crate::fmt::{money, signed_money, truncate};
use crate::models::TransactionFilter;

pub fn list(filter: TransactionFilter, json: bool) -> Result<()> {
    let pipeline = open_pipeline()?;
    let rows = pipeline.transactions(&filter)?;
    if json {
        return print_json(&rows);
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Vendor", "Description", "Category", "Amount", "Rec."]);
    for txn in &rows {
        table.add_row(vec![
            Cell::new(txn.id),
            Cell::new(&txn.date),
            Cell::new(truncate(&txn.vendor_name, 24)),
            Cell::new(truncate(&txn.description, 36)),
            Cell::new(txn.category_name.as_deref().unwrap_or("-")),
            Cell::new(signed_money(txn.amount)),
            Cell::new(if txn.recurring { "\u{2713}" } else { "" }),
        ]);
    }
    let total: f64 = rows.iter().map(|t| t.amount).sum();
    println!("Transactions\n{table}");
    println!("{} transactions, total {}", rows.len(), money(total));
    Ok(())
}

pub fn pending(json: bool) -> Result<()> {
    let pipeline = open_pipeline()?;
    let rows = pipeline.uncategorized_transactions()?;
    if json {
        return print_json(&rows);
    }
    if rows.is_empty() {
        println!("{}", "No transactions waiting for a category.".green());
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Vendor", "Description", "Amount"]);
    for txn in &rows {
        table.add_row(vec![
            Cell::new(txn.id),
            Cell::new(&txn.date),
            Cell::new(truncate(&txn.vendor_name, 24)),
            Cell::new(truncate(&txn.description, 36)),
            Cell::new(signed_money(txn.amount)),
        ]);
    }
    println!("Pending\n{table}");
    println!("{} transactions to review", rows.len());
    Ok(())
}

pub fn categorize(id: i64, category_id: i64, recurring: bool, json: bool) -> Result<()> {
    let mut pipeline = open_pipeline()?;
    let result = pipeline.submit_categorization(id, category_id, recurring);
    report_mutation(result, &format!("Categorized transaction {id}"), json)
}

pub fn delete(id: i64, json: bool) -> Result<()> {
    let mut pipeline = open_pipeline()?;
    let result = pipeline.delete_transaction(id);
    report_mutation(result, &format!("Deleted transaction {id}"), json)
}
