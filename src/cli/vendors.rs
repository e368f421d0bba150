use comfy_table::{Cell, Table};

use crate::cli::{open_pipeline, print_json, report_mutation};
use crate::error::Result;

pub fn list(json: bool) -> Result<()> {
    let pipeline = open_pipeline()?;
    let vendors = pipeline.vendors()?;
    if json {
        return print_json(&vendors);
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Vendor", "Default Category"]);
    for vendor in vendors {
        table.add_row(vec![
            Cell::new(vendor.id),
            Cell::new(vendor.name),
            Cell::new(vendor.category_name.unwrap_or_else(|| "-".to_string())),
        ]);
    }
    println!("Vendors\n{table}");
    Ok(())
}

pub fn set_category(vendor_id: i64, category_id: Option<i64>, json: bool) -> Result<()> {
    let mut pipeline = open_pipeline()?;
    let result = pipeline.set_vendor_category(vendor_id, category_id);
    let done = match category_id {
        Some(cat) => format!("Vendor {vendor_id} now defaults to category {cat}"),
        None => format!("Cleared default category for vendor {vendor_id}"),
    };
    report_mutation(result, &done, json)
}
