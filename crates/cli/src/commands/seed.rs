//! Seed the database with the sample catalog.
//!
//! The script inserts only rows that are missing, so running it twice leaves
//! one copy of everything.

use freshmart_storefront::db::SAMPLE_DATA;

use super::{CommandError, connect};

/// Load the sample data.
///
/// # Errors
///
/// Returns an error if the database is unreachable or the script fails
/// (for example because the schema has not been migrated).
pub async fn run(migrate_first: bool) -> Result<(), CommandError> {
    let store = connect().await?;

    if migrate_first {
        tracing::info!("Running migrations...");
        store.migrate().await?;
    }

    tracing::info!("Loading sample data...");
    store.run_script(SAMPLE_DATA).await?;

    let products = store.list_products(None).await?;
    tracing::info!("Seeding complete!");
    for product in &products {
        tracing::info!(
            "  {} ({}) at {} with {} in stock",
            product.name,
            product.category.as_deref().unwrap_or("uncategorized"),
            product.price,
            product
                .stock
                .map_or_else(|| "untracked".to_string(), |s| s.to_string()),
        );
    }

    Ok(())
}
