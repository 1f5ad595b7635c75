//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! fm-cli migrate
//! ```
//!
//! Applies the embedded migrations for the configured backend
//! (`crates/storefront/migrations/sqlite` or `.../postgres`): products,
//! users, orders, order items and the reference tables.

use super::{CommandError, connect};

/// Apply all pending migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CommandError> {
    let store = connect().await?;

    tracing::info!(backend = store.backend(), "Running migrations...");
    store.migrate().await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
