pub mod categories;
pub mod clear;
pub mod dashboard;
pub mod history;
pub mod import;
pub mod init;
pub mod review;
pub mod status;
pub mod transactions;
pub mod vendors;

use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::api::Pipeline;
use crate::error::{Result, SpendError};
use crate::models::MutationResult;
use crate::settings::load_settings;

/// Open the configured database. Fails if `spendwise init` hasn't been run.
pub(crate) fn open_pipeline() -> Result<Pipeline> {
    let settings = load_settings();
    let db_path = settings.db_path();
    if !db_path.exists() {
        return Err(SpendError::Settings(format!(
            "no database at {}. Run `spendwise init` to set up.",
            db_path.display()
        )));
    }
    Ok(Pipeline::open(&db_path)?.with_recent_limit(settings.recent_limit))
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a mutation outcome and turn a failure into an error exit.
pub(crate) fn report_mutation(result: MutationResult, done: &str, json: bool) -> Result<()> {
    use colored::Colorize;

    if json {
        print_json(&result)?;
    } else if result.success {
        println!("{}", done.green());
    }
    match result.error {
        Some(err) if !result.success => Err(SpendError::InvalidInput(err)),
        _ => Ok(()),
    }
}

#[derive(Parser)]
#[command(name = "spendwise", version, about = "Import bank statements, categorize vendors, see where the money goes.")]
pub struct Cli {
    /// Verbose logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print machine-readable JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and initialize the database.
    Init {
        /// Path for spendwise data
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Import one or more bank-statement CSV files.
    Import {
        /// CSV files to import
        #[arg(required = true)]
        files: Vec<String>,
        /// Don't offer to review uncategorized transactions afterwards
        #[arg(long = "no-review")]
        no_review: bool,
    },
    /// Categorize pending transactions one at a time.
    Review,
    /// Manage categories.
    Categories {
        #[command(subcommand)]
        command: CategoriesCommands,
    },
    /// Manage vendors and their default categories.
    Vendors {
        #[command(subcommand)]
        command: VendorsCommands,
    },
    /// List or delete transactions.
    Transactions {
        #[command(subcommand)]
        command: TransactionsCommands,
    },
    /// Monthly trend, category breakdown, pivot and recent activity.
    Dashboard,
    /// Show past imports.
    History,
    /// Delete all transactions, vendors and categories.
    Clear {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Show current database and summary statistics.
    Status,
}

#[derive(Subcommand)]
pub enum CategoriesCommands {
    /// List all categories.
    List,
    /// Add a category.
    Add {
        name: String,
        /// Parent category ID
        #[arg(long)]
        parent: Option<i64>,
        /// Color as #rrggbb
        #[arg(long)]
        color: Option<String>,
    },
    /// Change a category's color.
    Color {
        id: i64,
        /// Color as #rrggbb
        color: String,
    },
    /// Delete a category. Its transactions and vendors become uncategorized.
    Delete { id: i64 },
}

#[derive(Subcommand)]
pub enum VendorsCommands {
    /// List vendors with their default category.
    List,
    /// Set or clear a vendor's default category.
    SetCategory {
        vendor_id: i64,
        /// Category ID (omit to clear)
        category_id: Option<i64>,
    },
}

#[derive(Subcommand)]
pub enum TransactionsCommands {
    /// List transactions, newest first.
    List {
        /// Start date, YYYY-MM-DD (inclusive)
        #[arg(long = "from")]
        from_date: Option<String>,
        /// End date, YYYY-MM-DD (inclusive)
        #[arg(long = "to")]
        to_date: Option<String>,
        /// Category ID
        #[arg(long)]
        category: Option<i64>,
        /// Vendor ID
        #[arg(long)]
        vendor: Option<i64>,
        /// Text to match in vendor or description
        #[arg(long)]
        search: Option<String>,
        /// Minimum amount
        #[arg(long, allow_hyphen_values = true)]
        min: Option<f64>,
        /// Maximum amount
        #[arg(long, allow_hyphen_values = true)]
        max: Option<f64>,
    },
    /// List transactions waiting for a category.
    Pending,
    /// Assign a category to one transaction and teach it to the vendor.
    Categorize {
        /// Transaction ID
        id: i64,
        /// Category ID
        category_id: i64,
        /// Mark the transaction as recurring
        #[arg(long)]
        recurring: bool,
    },
    /// Delete a transaction by ID.
    Delete { id: i64 },
}
