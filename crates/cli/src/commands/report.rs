//! Table report for operators.

use super::{CommandError, connect};

/// Log every table with its columns and row count.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a table cannot be read.
pub async fn run(with_rows: bool) -> Result<(), CommandError> {
    let store = connect().await?;
    let tables = store.dump_tables().await?;

    tracing::info!("Database report ({} tables)", tables.len());
    for table in &tables {
        tracing::info!(
            "{}: {} rows [{}]",
            table.name,
            table.rows.len(),
            table.columns.join(", ")
        );

        if with_rows {
            for row in &table.rows {
                let cells: Vec<&str> = row
                    .iter()
                    .map(|cell| cell.as_deref().unwrap_or("NULL"))
                    .collect();
                tracing::info!("  {}", cells.join(" | "));
            }
        }
    }

    Ok(())
}
