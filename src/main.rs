mod api;
mod categories;
mod cli;
mod db;
mod error;
mod fmt;
mod importer;
mod models;
mod reports;
mod reviewer;
mod settings;
mod transactions;
mod vendors;

use clap::Parser;
use tracing_subscriber::{prelude::*, EnvFilter};

use cli::{CategoriesCommands, Cli, Commands, TransactionsCommands, VendorsCommands};
use models::TransactionFilter;

fn main() {
    let cli = Cli::parse();

    // RUST_LOG > --verbose > warn
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();

    let json = cli.json;
    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Import { files, no_review } => cli::import::run(&files, no_review, json),
        Commands::Review => cli::review::run(),
        Commands::Categories { command } => match command {
            CategoriesCommands::List => cli::categories::list(json),
            CategoriesCommands::Add { name, parent, color } => {
                cli::categories::add(&name, parent, color.as_deref(), json)
            }
            CategoriesCommands::Color { id, color } => cli::categories::color(id, &color, json),
            CategoriesCommands::Delete { id } => cli::categories::delete(id, json),
        },
        Commands::Vendors { command } => match command {
            VendorsCommands::List => cli::vendors::list(json),
            VendorsCommands::SetCategory { vendor_id, category_id } => {
                cli::vendors::set_category(vendor_id, category_id, json)
            }
        },
        Commands::Transactions { command } => match command {
            TransactionsCommands::List {
                from_date,
                to_date,
                category,
                vendor,
                search,
                min,
                max,
            } => cli::transactions::list(
                TransactionFilter {
                    start_date: from_date,
                    end_date: to_date,
                    category_id: category,
                    vendor_id: vendor,
                    search,
                    min_amount: min,
                    max_amount: max,
                },
                json,
            ),
            TransactionsCommands::Pending => cli::transactions::pending(json),
            TransactionsCommands::Categorize {
                id,
                category_id,
                recurring,
            } => cli::transactions::categorize(id, category_id, recurring, json),
            TransactionsCommands::Delete { id } => cli::transactions::delete(id, json),
        },
        Commands::Dashboard => cli::dashboard::run(json),
        Commands::History => cli::history::run(json),
        Commands::Clear { yes } => cli::clear::run(yes, json),
        Commands::Status => cli::status::run(json),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
