//! Domain models for the storefront.
//!
//! These are validated domain objects; each backend has its own row types and
//! converts into these.

pub mod session;

use chrono::{DateTime, Utc};

use freshmart_core::{
    Email, OrderId, OrderItemId, Price, PriceError, ProductId, Quantity, UserId,
};

pub use session::{CurrentUser, keys as session_keys};

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub category: Option<String>,
    /// Units on hand; `None` means stock is not tracked.
    pub stock: Option<i32>,
}

/// A registered shopper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
}

/// A completed checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub total: Price,
    /// Set by the database default; legacy rows may lack it.
    pub created_at: Option<DateTime<Utc>>,
}

/// One line of an order, priced at purchase time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    /// Current product name (joined at read time).
    pub product_name: String,
    pub quantity: Quantity,
    /// Unit price captured when the order was placed.
    pub price: Price,
}

impl OrderItem {
    /// Unit price times quantity.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Overflow` if the product does not fit.
    pub fn line_total(&self) -> Result<Price, PriceError> {
        self.price.times(self.quantity)
    }
}

/// An order together with its lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Contents of one table for the report page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDump {
    pub name: String,
    pub columns: Vec<String>,
    /// Row values rendered as text; `None` is SQL `NULL`.
    pub rows: Vec<Vec<Option<String>>>,
}
