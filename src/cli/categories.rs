use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::{open_pipeline, print_json, report_mutation};
use crate::error::Result;

/// A block in the category's own color.
fn swatch(color: &str) -> String {
    let hex = color.trim_start_matches('#');
    let channel = |i: usize| hex.get(i..i + 2).and_then(|c| u8::from_str_radix(c, 16).ok());
    match (channel(0), channel(2), channel(4)) {
        (Some(r), Some(g), Some(b)) => "\u{2588}\u{2588}".truecolor(r, g, b).to_string(),
        _ => String::new(),
    }
}

pub fn list(json: bool) -> Result<()> {
    let pipeline = open_pipeline()?;
    let categories = pipeline.categories()?;
    if json {
        return print_json(&categories);
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Parent", "Color", ""]);
    for cat in &categories {
        let parent = cat
            .parent_id
            .and_then(|p| categories.iter().find(|c| c.id == p))
            .map(|c| c.name.clone())
            .unwrap_or_default();
        table.add_row(vec![
            Cell::new(cat.id),
            Cell::new(&cat.name),
            Cell::new(parent),
            Cell::new(&cat.color),
            Cell::new(swatch(&cat.color)),
        ]);
    }
    println!("Categories\n{table}");
    Ok(())
}

pub fn add(name: &str, parent: Option<i64>, color: Option<&str>, json: bool) -> Result<()> {
    let mut pipeline = open_pipeline()?;
    let result = pipeline.add_category(name, parent, color);
    let done = format!("Added category: {} (id {})", name.trim(), result.id.unwrap_or_default());
    report_mutation(result, &done, json)
}

pub fn color(id: i64, color: &str, json: bool) -> Result<()> {
    let mut pipeline = open_pipeline()?;
    let result = pipeline.update_category_color(id, color);
    report_mutation(result, &format!("Category {id} color set to {color}"), json)
}

pub fn delete(id: i64, json: bool) -> Result<()> {
    let mut pipeline = open_pipeline()?;
    let result = pipeline.delete_category(id);
    report_mutation(result, &format!("Deleted category {id}"), json)
}
