use colored::Colorize;
use comfy_table::{Cell, Table};
use dialoguer::{Confirm, Input};

use crate::api::Pipeline;
use crate::cli::open_pipeline;
use crate::error::Result;
use crate::fmt::signed_money;
use crate::models::Category;

pub fn run() -> Result<()> {
    let mut pipeline = open_pipeline()?;
    drain(&mut pipeline)
}

fn print_categories(categories: &[Category]) {
    let mut table = Table::new();
    table.set_header(vec!["#", "Name"]);
    for (i, cat) in categories.iter().enumerate() {
        table.add_row(vec![Cell::new(i + 1), Cell::new(&cat.name)]);
    }
    println!("Categories\n{table}\n");
}

/// Work through the pending queue until it is empty or the user quits.
pub fn drain(pipeline: &mut Pipeline) -> Result<()> {
    if pipeline.pending().is_none() {
        println!("{}", "No transactions waiting for a category.".green());
        return Ok(());
    }
    println!("\n{} transactions to review\n", pipeline.pending_len());

    let mut categories = pipeline.categories()?;
    print_categories(&categories);

    while let Some(txn) = pipeline.pending() {
        println!("{}", "\u{2500}".repeat(60));
        println!("  Date:        {}", txn.date);
        println!("  Vendor:      {}", txn.vendor_name);
        println!("  Description: {}", txn.description);
        println!("  Amount:      {}", signed_money(txn.amount));
        println!();

        let choice: String = Input::new()
            .with_prompt("Category # (n=new, q=quit)")
            .interact_text()
            .unwrap_or_else(|_| "q".to_string());
        let choice = choice.trim().to_lowercase();

        if choice == "q" {
            println!("{}", format!("Review paused, {} left.", pipeline.pending_len()).yellow());
            return Ok(());
        }

        let category_id = if choice == "n" {
            let name: String = Input::new()
                .with_prompt("New category name")
                .interact_text()
                .unwrap_or_default();
            let created = pipeline.add_category(&name, None, None);
            match created.id {
                Some(id) if created.success => {
                    categories = pipeline.categories()?;
                    print_categories(&categories);
                    id
                }
                _ => {
                    println!("{}", created.error.unwrap_or_default().red());
                    continue;
                }
            }
        } else {
            match choice.parse::<usize>() {
                Ok(n) if n >= 1 && n <= categories.len() => categories[n - 1].id,
                _ => {
                    println!("{}", "Invalid choice.".red());
                    continue;
                }
            }
        };

        let recurring = Confirm::new()
            .with_prompt("Recurring?")
            .default(false)
            .interact()
            .unwrap_or(false);

        let result = pipeline.submit_pending(category_id, recurring);
        if result.success {
            let name = categories.iter().find(|c| c.id == category_id).map(|c| c.name.as_str()).unwrap_or("");
            println!("{}", format!("\u{2192} Categorized as {name}").green());
        } else {
            println!("{}", format!("Could not save: {}", result.error.unwrap_or_default()).red());
        }
        println!();
    }

    println!("{}", "Review complete!".green());
    Ok(())
}
