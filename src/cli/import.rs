use std::path::PathBuf;

use colored::Colorize;
use dialoguer::Confirm;

use crate::cli::{open_pipeline, print_json, review};
use crate::error::Result;

pub fn run(files: &[String], no_review: bool, json: bool) -> Result<()> {
    let mut pipeline = open_pipeline()?;

    let mut outcomes = Vec::new();
    for file in files {
        let path = PathBuf::from(file);
        let outcome = pipeline.import_file(&path)?;
        if !json {
            println!(
                "{}: {} imported, {} skipped (duplicates), {} new uncategorized vendors",
                path.display(),
                outcome.summary.imported.to_string().green(),
                outcome.summary.duplicates,
                outcome.summary.uncategorized_vendor_ids.len()
            );
        }
        outcomes.push(outcome);
    }

    if json {
        return print_json(&outcomes);
    }

    let pending = pipeline.pending_len();
    if pending == 0 {
        println!("{}", "Everything is categorized.".green());
        return Ok(());
    }
    println!("{pending} transactions need a category.");
    if no_review {
        println!("Run `spendwise review` when you're ready.");
        return Ok(());
    }

    let start = Confirm::new()
        .with_prompt("Review them now?")
        .default(true)
        .interact()
        .unwrap_or(false);
    if start {
        review::drain(&mut pipeline)?;
    }
    Ok(())
}
