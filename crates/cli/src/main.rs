//! FreshMart CLI - Database migrations and operator tools.
//!
//! # Usage
//!
//! ```bash
//! # Create or upgrade the schema
//! fm-cli migrate
//!
//! # Load the sample catalog (safe to repeat)
//! fm-cli seed
//!
//! # Summarize every table, optionally with its rows
//! fm-cli report --rows
//! ```
//!
//! The database is chosen with the same `FRESHMART_*` variables as the
//! storefront (a `.env` file is honored).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "fm-cli")]
#[command(author, version, about = "FreshMart CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Load sample products, categories, suppliers and inventory
    Seed {
        /// Apply migrations before seeding
        #[arg(long)]
        migrate: bool,
    },
    /// Log every application table with its row count
    Report {
        /// Also log each row
        #[arg(long)]
        rows: bool,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fm_cli=info,freshmart_storefront=info".into()),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await,
        Commands::Seed { migrate } => commands::seed::run(migrate).await,
        Commands::Report { rows } => commands::report::run(rows).await,
    }
}
