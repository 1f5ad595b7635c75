//! Database access for the storefront.
//!
//! # Backends
//!
//! The shop runs against either an embedded SQLite file (the default) or a
//! networked `PostgreSQL` server. Both implement [`Store`], and handlers only
//! ever see `Arc<dyn Store>`.
//!
//! ## Tables
//!
//! - `products` - Catalog and stock levels
//! - `users` - Accounts (unique email, unsalted password digest)
//! - `orders` - One row per checkout
//! - `order_items` - Lines of an order with the captured unit price
//! - `categories`, `suppliers`, `inventory` - Reference data, seeded but not
//!   read by the routes
//!
//! # Migrations
//!
//! Migrations live in `crates/storefront/migrations/{sqlite,postgres}/` and
//! run at startup or via:
//! ```bash
//! cargo run -p freshmart-cli -- migrate
//! ```

pub mod postgres;
pub mod sqlite;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use freshmart_core::{Cart, Email, OrderId, ProductId, Quantity, UserId};

use crate::config::DatabaseConfig;
use crate::models::{Order, OrderItem, OrderWithItems, Product, TableDump, User};
use crate::services::checkout::{CheckoutError, PlacedOrder};

pub use postgres::PgStore;
pub use sqlite::SqliteStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// A value does not fit its column.
    #[error("value out of range: {0}")]
    OutOfRange(String),
}

impl From<sqlx::migrate::MigrateError> for RepositoryError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::Database(sqlx::Error::Migrate(Box::new(err)))
    }
}

/// Fields for a new account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: Email,
    /// Hex password digest, see [`crate::services::auth::password_digest`].
    pub password_digest: String,
}

/// Every persistence operation the storefront performs.
#[async_trait]
pub trait Store: Send + Sync {
    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    /// Apply the embedded migrations.
    async fn migrate(&self) -> Result<(), RepositoryError>;

    /// Round-trip a trivial query (readiness check).
    async fn ping(&self) -> Result<(), RepositoryError>;

    /// List products ordered by name, optionally filtered by a
    /// case-insensitive substring of name or category.
    async fn list_products(&self, query: Option<&str>) -> Result<Vec<Product>, RepositoryError>;

    /// Look up one product.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Turn a cart into an order inside one transaction.
    ///
    /// Lines whose product no longer exists are skipped; a stock guard that
    /// blocks the decrement is reported, not treated as a failure. Any
    /// statement error rolls the whole order back.
    async fn place_order(&self, user_id: UserId, cart: &Cart) -> Result<PlacedOrder, CheckoutError>;

    /// All orders of a user, newest first, with their lines.
    async fn orders_for_user(&self, user_id: UserId)
    -> Result<Vec<OrderWithItems>, RepositoryError>;

    /// One order, only if it belongs to `user_id`.
    async fn order_for_user(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Option<OrderWithItems>, RepositoryError>;

    /// Insert a user.
    ///
    /// Returns `RepositoryError::Conflict` if the email is taken.
    async fn create_user(&self, user: &NewUser) -> Result<User, RepositoryError>;

    /// Find the user whose email and password digest both match.
    async fn find_user_by_credentials(
        &self,
        email: &Email,
        password_digest: &str,
    ) -> Result<Option<User>, RepositoryError>;

    /// Look up a user by id.
    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Overwrite a user's name and email.
    ///
    /// Returns `RepositoryError::NotFound` for an unknown id and
    /// `RepositoryError::Conflict` if the email belongs to someone else.
    async fn update_user(
        &self,
        id: UserId,
        name: &str,
        email: &Email,
    ) -> Result<User, RepositoryError>;

    /// Every application table with its columns and rows rendered as text.
    async fn dump_tables(&self) -> Result<Vec<TableDump>, RepositoryError>;

    /// Execute a multi-statement SQL script.
    async fn run_script(&self, sql: &str) -> Result<(), RepositoryError>;
}

/// Connect to the configured backend.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection options are invalid or the
/// database cannot be reached.
pub async fn connect(config: &DatabaseConfig) -> Result<Database, sqlx::Error> {
    match config {
        DatabaseConfig::Sqlite { url } => Ok(Database::Sqlite(SqliteStore::connect(url).await?)),
        DatabaseConfig::Postgres(pg) => Ok(Database::Postgres(PgStore::connect(pg).await?)),
    }
}

/// A connected backend.
///
/// Kept as an enum so startup code can reach the concrete pool (the session
/// store shares it) before erasing it into `Arc<dyn Store>`.
#[derive(Clone)]
pub enum Database {
    Sqlite(SqliteStore),
    Postgres(PgStore),
}

impl Database {
    /// Erase the backend.
    #[must_use]
    pub fn into_store(self) -> Arc<dyn Store> {
        match self {
            Self::Sqlite(store) => Arc::new(store),
            Self::Postgres(store) => Arc::new(store),
        }
    }
}

// =============================================================================
// Shared helpers
// =============================================================================

/// Name of the `tower-sessions` table, hidden from the report.
pub const SESSION_TABLE: &str = "tower_sessions";

/// Idempotent sample catalog and reference data.
pub const SAMPLE_DATA: &str = include_str!("../../seeds/sample_data.sql");

/// Build a `LIKE` pattern matching `query` anywhere, with `%`, `_` and `\`
/// escaped (use with `ESCAPE '\'`).
pub(crate) fn contains_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Trimmed, non-empty search text.
pub(crate) fn normalize_query(query: Option<&str>) -> Option<&str> {
    query.map(str::trim).filter(|q| !q.is_empty())
}

/// Quote an SQL identifier.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Query selecting every column of `table` as nullable text.
pub(crate) fn dump_select(table: &str, columns: &[String]) -> String {
    let list = columns
        .iter()
        .map(|c| format!("CAST({} AS TEXT)", quote_ident(c)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("SELECT {list} FROM {}", quote_ident(table))
}

/// Map a unique violation to `RepositoryError::Conflict`.
pub(crate) fn conflict_on_unique(err: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(err)
}

pub(crate) fn quantity_from_db(qty: i32) -> Result<Quantity, RepositoryError> {
    u32::try_from(qty)
        .ok()
        .and_then(Quantity::new)
        .ok_or_else(|| RepositoryError::DataCorruption(format!("invalid order quantity: {qty}")))
}

pub(crate) fn quantity_to_db(quantity: Quantity) -> Result<i32, RepositoryError> {
    i32::try_from(quantity.get())
        .map_err(|_| RepositoryError::OutOfRange(format!("order quantity {quantity}")))
}

pub(crate) fn email_from_db(raw: String) -> Result<Email, RepositoryError> {
    if raw.contains('@') {
        Ok(Email::from_trusted(raw))
    } else {
        Err(RepositoryError::DataCorruption(format!(
            "invalid email in database: {raw}"
        )))
    }
}

/// Attach items to their orders, keeping the order sequence.
pub(crate) fn group_items(orders: Vec<Order>, items: Vec<OrderItem>) -> Vec<OrderWithItems> {
    let mut by_order: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
    for item in items {
        by_order.entry(item.order_id).or_default().push(item);
    }
    orders
        .into_iter()
        .map(|order| {
            let items = by_order.remove(&order.id).unwrap_or_default();
            OrderWithItems { order, items }
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("rice"), "%rice%");
        assert_eq!(contains_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(contains_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn test_normalize_query() {
        assert_eq!(normalize_query(None), None);
        assert_eq!(normalize_query(Some("   ")), None);
        assert_eq!(normalize_query(Some(" milk ")), Some("milk"));
    }

    #[test]
    fn test_dump_select_quotes_identifiers() {
        let sql = dump_select("order_items", &["id".to_string(), "we\"ird".to_string()]);
        assert_eq!(
            sql,
            "SELECT CAST(\"id\" AS TEXT), CAST(\"we\"\"ird\" AS TEXT) FROM \"order_items\""
        );
    }

    #[test]
    fn test_quantity_from_db_rejects_non_positive() {
        assert_eq!(quantity_from_db(3).unwrap().get(), 3);
        assert!(matches!(
            quantity_from_db(0),
            Err(RepositoryError::DataCorruption(_))
        ));
        assert!(quantity_from_db(-2).is_err());
    }

    #[test]
    fn test_every_quantity_fits_the_qty_column() {
        assert_eq!(quantity_to_db(Quantity::MAX).unwrap(), i32::MAX);
        assert_eq!(quantity_to_db(Quantity::ONE).unwrap(), 1);
        assert_eq!(quantity_from_db(i32::MAX).unwrap(), Quantity::MAX);
    }
}
