//! Embedded SQLite store.
//!
//! Prices are `REAL` columns; they are rounded to cents and converted to
//! [`Price`] on the way out.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};

use freshmart_core::{Cart, Email, OrderId, OrderItemId, Price, ProductId, UserId};

use super::{
    NewUser, RepositoryError, SESSION_TABLE, Store, conflict_on_unique, contains_pattern,
    dump_select, email_from_db, group_items, normalize_query, quantity_from_db, quantity_to_db,
};
use crate::models::{Order, OrderItem, OrderWithItems, Product, TableDump, User};
use crate::services::checkout::{CheckoutError, PlacedOrder, draft_order};

/// SQLite implementation of [`Store`].
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `url`.
    ///
    /// # Errors
    ///
    /// Returns `sqlx::Error` if the URL is invalid or the file cannot be opened.
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    /// A private in-memory database on a single long-lived connection.
    ///
    /// # Errors
    ///
    /// Returns `sqlx::Error` if SQLite cannot be initialized.
    pub async fn in_memory() -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

// =============================================================================
// Row types
// =============================================================================

#[derive(sqlx::FromRow)]
struct ProductRow {
    product_id: i32,
    name: String,
    price: f64,
    category: Option<String>,
    stock: Option<i32>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ProductId::new(row.product_id),
            name: row.name,
            price: price_from_db(row.price)?,
            category: row.category,
            stock: row.stock,
        })
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    user_id: i32,
    name: String,
    email: String,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: UserId::new(row.user_id),
            name: row.name,
            email: email_from_db(row.email)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    order_id: i32,
    user_id: i32,
    total: f64,
    created_at: Option<NaiveDateTime>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: OrderId::new(row.order_id),
            user_id: UserId::new(row.user_id),
            total: price_from_db(row.total)?,
            created_at: row.created_at.map(|t| t.and_utc()),
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: i32,
    order_id: i32,
    product_id: i32,
    name: String,
    qty: i32,
    price: f64,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = RepositoryError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: OrderItemId::new(row.id),
            order_id: OrderId::new(row.order_id),
            product_id: ProductId::new(row.product_id),
            product_name: row.name,
            quantity: quantity_from_db(row.qty)?,
            price: price_from_db(row.price)?,
        })
    }
}

fn price_from_db(value: f64) -> Result<Price, RepositoryError> {
    Price::from_f64(value)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid price {value}: {e}")))
}

fn price_to_db(price: Price) -> Result<f64, RepositoryError> {
    price
        .to_f64()
        .ok_or_else(|| RepositoryError::DataCorruption(format!("price out of range: {price}")))
}

fn collect<R, T>(rows: Vec<R>) -> Result<Vec<T>, RepositoryError>
where
    T: TryFrom<R, Error = RepositoryError>,
{
    rows.into_iter().map(T::try_from).collect()
}

const PRODUCT_COLUMNS: &str = "product_id, name, price, category, stock";

const ORDER_ITEMS_SELECT: &str = r"
    SELECT oi.id, oi.order_id, oi.product_id, p.name, oi.qty, oi.price
    FROM order_items oi
    JOIN products p ON p.product_id = oi.product_id
";

#[async_trait]
impl Store for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn migrate(&self) -> Result<(), RepositoryError> {
        sqlx::migrate!("./migrations/sqlite").run(&self.pool).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn list_products(&self, query: Option<&str>) -> Result<Vec<Product>, RepositoryError> {
        let rows = match normalize_query(query) {
            Some(q) => {
                let sql = format!(
                    r"SELECT {PRODUCT_COLUMNS} FROM products
                      WHERE name LIKE $1 ESCAPE '\' OR category LIKE $1 ESCAPE '\'
                      ORDER BY name"
                );
                sqlx::query_as::<_, ProductRow>(&sql)
                    .bind(contains_pattern(q))
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name");
                sqlx::query_as::<_, ProductRow>(&sql)
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        collect(rows)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE product_id = $1");
        sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id.as_i32())
            .fetch_optional(&self.pool)
            .await?
            .map(Product::try_from)
            .transpose()
    }

    async fn place_order(&self, user_id: UserId, cart: &Cart) -> Result<PlacedOrder, CheckoutError> {
        let mut tx = self.pool.begin().await?;

        let mut prices = HashMap::with_capacity(cart.len());
        for line in cart.lines() {
            let price: Option<f64> =
                sqlx::query_scalar("SELECT price FROM products WHERE product_id = $1")
                    .bind(line.product_id.as_i32())
                    .fetch_optional(&mut *tx)
                    .await?;
            if let Some(price) = price {
                prices.insert(line.product_id, price_from_db(price)?);
            }
        }

        let draft = draft_order(cart, &prices)?;
        if draft.lines.is_empty() {
            return Err(CheckoutError::NothingToOrder);
        }

        let order_id: i32 = sqlx::query_scalar(
            "INSERT INTO orders (user_id, total) VALUES ($1, $2) RETURNING order_id",
        )
        .bind(user_id.as_i32())
        .bind(price_to_db(draft.total)?)
        .fetch_one(&mut *tx)
        .await?;

        let mut stock_shortfalls = Vec::new();
        for line in &draft.lines {
            let qty = quantity_to_db(line.quantity)?;

            sqlx::query(
                "INSERT INTO order_items (order_id, product_id, qty, price) VALUES ($1, $2, $3, $4)",
            )
            .bind(order_id)
            .bind(line.product_id.as_i32())
            .bind(qty)
            .bind(price_to_db(line.unit_price)?)
            .execute(&mut *tx)
            .await?;

            let updated = sqlx::query(
                r"UPDATE products SET stock = stock - $1
                  WHERE product_id = $2 AND (stock IS NULL OR stock >= $1)",
            )
            .bind(qty)
            .bind(line.product_id.as_i32())
            .execute(&mut *tx)
            .await?;

            if updated.rows_affected() == 0 {
                stock_shortfalls.push(line.product_id);
            }
        }

        tx.commit().await?;

        Ok(PlacedOrder {
            order_id: OrderId::new(order_id),
            total: draft.total,
            line_count: draft.lines.len(),
            skipped: draft.skipped,
            stock_shortfalls,
        })
    }

    async fn orders_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<OrderWithItems>, RepositoryError> {
        let orders = sqlx::query_as::<_, OrderRow>(
            r"SELECT order_id, user_id, total, created_at FROM orders
              WHERE user_id = $1
              ORDER BY CASE WHEN created_at IS NULL THEN 1 ELSE 0 END,
                       created_at DESC, order_id DESC",
        )
        .bind(user_id.as_i32())
        .fetch_all(&self.pool)
        .await?;

        let items = sqlx::query_as::<_, OrderItemRow>(&format!(
            "{ORDER_ITEMS_SELECT}
             JOIN orders o ON o.order_id = oi.order_id
             WHERE o.user_id = $1
             ORDER BY oi.id"
        ))
        .bind(user_id.as_i32())
        .fetch_all(&self.pool)
        .await?;

        Ok(group_items(collect(orders)?, collect(items)?))
    }

    async fn order_for_user(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Option<OrderWithItems>, RepositoryError> {
        let Some(order) = sqlx::query_as::<_, OrderRow>(
            "SELECT order_id, user_id, total, created_at FROM orders
             WHERE order_id = $1 AND user_id = $2",
        )
        .bind(order_id.as_i32())
        .bind(user_id.as_i32())
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, OrderItemRow>(&format!(
            "{ORDER_ITEMS_SELECT} WHERE oi.order_id = $1 ORDER BY oi.id"
        ))
        .bind(order_id.as_i32())
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(OrderWithItems {
            order: order.try_into()?,
            items: collect(items)?,
        }))
    }

    async fn create_user(&self, user: &NewUser) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (name, email, password) VALUES ($1, $2, $3)
             RETURNING user_id, name, email",
        )
        .bind(&user.name)
        .bind(user.email.as_str())
        .bind(&user.password_digest)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "email"))?
        .try_into()
    }

    async fn find_user_by_credentials(
        &self,
        email: &Email,
        password_digest: &str,
    ) -> Result<Option<User>, RepositoryError> {
        sqlx::query_as::<_, UserRow>(
            "SELECT user_id, name, email FROM users WHERE email = $1 AND password = $2",
        )
        .bind(email.as_str())
        .bind(password_digest)
        .fetch_optional(&self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        sqlx::query_as::<_, UserRow>("SELECT user_id, name, email FROM users WHERE user_id = $1")
            .bind(id.as_i32())
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn update_user(
        &self,
        id: UserId,
        name: &str,
        email: &Email,
    ) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, UserRow>(
            "UPDATE users SET name = $1, email = $2 WHERE user_id = $3
             RETURNING user_id, name, email",
        )
        .bind(name)
        .bind(email.as_str())
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "email"))?
        .ok_or(RepositoryError::NotFound)?
        .try_into()
    }

    async fn dump_tables(&self) -> Result<Vec<TableDump>, RepositoryError> {
        let tables: Vec<String> = sqlx::query_scalar(
            r"SELECT name FROM sqlite_master
              WHERE type = 'table'
                AND name NOT LIKE 'sqlite\_%' ESCAPE '\'
                AND name NOT LIKE '\_sqlx\_%' ESCAPE '\'
                AND name <> $1
              ORDER BY name",
        )
        .bind(SESSION_TABLE)
        .fetch_all(&self.pool)
        .await?;

        let mut dumps = Vec::with_capacity(tables.len());
        for table in tables {
            let columns: Vec<String> =
                sqlx::query_scalar("SELECT name FROM pragma_table_info($1) ORDER BY cid")
                    .bind(&table)
                    .fetch_all(&self.pool)
                    .await?;

            let rows = sqlx::query(&dump_select(&table, &columns))
                .fetch_all(&self.pool)
                .await?
                .iter()
                .map(|row| {
                    (0..columns.len())
                        .map(|i| row.try_get::<Option<String>, _>(i))
                        .collect::<Result<Vec<_>, _>>()
                })
                .collect::<Result<Vec<_>, _>>()?;

            dumps.push(TableDump {
                name: table,
                columns,
                rows,
            });
        }

        Ok(dumps)
    }

    async fn run_script(&self, sql: &str) -> Result<(), RepositoryError> {
        sqlx::raw_sql(sql).execute(&self.pool).await?;
        Ok(())
    }
}
