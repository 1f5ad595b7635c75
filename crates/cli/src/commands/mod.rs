//! Subcommand implementations.

pub mod migrate;
pub mod report;
pub mod seed;

use std::sync::Arc;

use thiserror::Error;

use freshmart_storefront::config::{ConfigError, StorefrontConfig};
use freshmart_storefront::db::{self, RepositoryError, Store};

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Could not connect to the database.
    #[error("Database connection error: {0}")]
    Connect(#[from] sqlx::Error),

    /// A store operation failed.
    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Connect to the configured database.
pub async fn connect() -> Result<Arc<dyn Store>, CommandError> {
    let config = StorefrontConfig::from_env()?;
    tracing::info!(backend = config.database.backend_name(), "Connecting to database");
    let database = db::connect(&config.database).await?;
    Ok(database.into_store())
}
