use colored::Colorize;
use dialoguer::Confirm;

use crate::cli::{open_pipeline, report_mutation};
use crate::error::Result;

pub fn run(yes: bool, json: bool) -> Result<()> {
    let mut pipeline = open_pipeline()?;
    if !yes {
        let confirmed = Confirm::new()
            .with_prompt("Delete every transaction, vendor and category? Import history is kept.")
            .default(false)
            .interact()
            .unwrap_or(false);
        if !confirmed {
            println!("{}", "Nothing deleted.".yellow());
            return Ok(());
        }
    }
    let result = pipeline.clear_all_data();
    report_mutation(result, "All data cleared.", json)
}
