use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table};

use crate::cli::{open_pipeline, print_json};
use crate::error::Result;
use crate::fmt::{money, signed_money, truncate};
use crate::reports::Dashboard;

pub fn run(json: bool) -> Result<()> {
    let pipeline = open_pipeline()?;
    let dash = pipeline.dashboard()?;
    if json {
        return print_json(&dash);
    }
    print_monthly(&dash);
    print_breakdown(&dash);
    print_pivot(&dash);
    print_recent(&dash);
    Ok(())
}

fn amount_cell(val: f64) -> Cell {
    Cell::new(money(val)).set_alignment(CellAlignment::Right)
}

fn print_monthly(dash: &Dashboard) {
    let mut table = Table::new();
    table.set_header(vec!["Month", "Recurring", "Non-recurring", "Total"]);
    let m = &dash.monthly;
    for (i, label) in m.labels.iter().enumerate() {
        table.add_row(vec![
            Cell::new(label),
            amount_cell(m.recurring[i]),
            amount_cell(m.non_recurring[i]),
            amount_cell(m.recurring[i] + m.non_recurring[i]),
        ]);
    }
    println!("{}\n{table}\n", "Last 12 Months".bold());
}

fn print_breakdown(dash: &Dashboard) {
    let mut table = Table::new();
    table.set_header(vec!["Category", "Total", "Recurring"]);
    for item in &dash.categories {
        table.add_row(vec![
            Cell::new(&item.name),
            amount_cell(item.total),
            Cell::new(item.recurring_count),
        ]);
    }
    println!("{}\n{table}\n", "Last 30 Days by Category".bold());
}

fn print_pivot(dash: &Dashboard) {
    let pivot = &dash.pivot;
    if pivot.months.is_empty() || pivot.categories.is_empty() {
        return;
    }
    let mut header = vec!["Category".to_string()];
    header.extend(pivot.months.iter().cloned());
    let mut table = Table::new();
    table.set_header(header);
    for (name, row) in pivot.categories.iter().zip(&pivot.cells) {
        let mut cells = vec![Cell::new(name)];
        cells.extend(row.iter().map(|&v| if v == 0.0 { Cell::new("") } else { amount_cell(v) }));
        table.add_row(cells);
    }
    println!("{}\n{table}", "Category by Month".bold());
    println!("Categorized total: {}\n", money(pivot.total()));
}

fn print_recent(dash: &Dashboard) {
    let mut table = Table::new();
    table.set_header(vec!["Date", "Vendor", "Category", "Amount"]);
    for txn in &dash.recent {
        table.add_row(vec![
            Cell::new(&txn.date),
            Cell::new(truncate(&txn.vendor_name, 28)),
            Cell::new(txn.category_name.as_deref().unwrap_or("-")),
            Cell::new(signed_money(txn.amount)),
        ]);
    }
    println!("{}\n{table}", "Recent Transactions".bold());
}
