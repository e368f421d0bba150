use comfy_table::{Cell, Table};

use crate::cli::{open_pipeline, print_json};
use crate::error::Result;

pub fn run(json: bool) -> Result<()> {
    let pipeline = open_pipeline()?;
    let records = pipeline.import_history()?;
    if json {
        return print_json(&records);
    }
    if records.is_empty() {
        println!("No imports yet.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Imported At", "File", "Rows", "Checksum"]);
    for record in records {
        let checksum = record.checksum.as_deref().map(|c| &c[..c.len().min(12)]).unwrap_or("");
        table.add_row(vec![
            Cell::new(record.id),
            Cell::new(&record.import_date),
            Cell::new(&record.filename),
            Cell::new(record.transaction_count),
            Cell::new(checksum),
        ]);
    }
    println!("Import History\n{table}");
    Ok(())
}
