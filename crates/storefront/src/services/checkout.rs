//! Checkout: turning the session cart into an order.
//!
//! Pricing is a pure step ([`draft_order`]) shared by both backends; the
//! backends own the transaction that writes the order, its lines and the
//! guarded stock decrement.

use std::collections::HashMap;

use thiserror::Error;
use tracing::instrument;

use freshmart_core::{Cart, OrderId, Price, PriceError, ProductId, Quantity, UserId};

use crate::db::{RepositoryError, Store};

/// Errors that can occur while placing an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The cart has no lines.
    #[error("cart is empty")]
    EmptyCart,

    /// None of the cart's products exist any more.
    #[error("no cart line refers to an existing product")]
    NothingToOrder,

    /// A line or the order total does not fit in a decimal amount.
    #[error("order total cannot be computed: {0}")]
    Pricing(#[from] PriceError),

    /// Repository/database error; the transaction was rolled back.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for CheckoutError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(err))
    }
}

/// A priced cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DraftLine {
    pub product_id: ProductId,
    pub quantity: Quantity,
    /// Price read at checkout time and stored on the order item.
    pub unit_price: Price,
}

/// The cart priced against the current catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    pub lines: Vec<DraftLine>,
    pub total: Price,
    /// Cart products that no longer exist.
    pub skipped: Vec<ProductId>,
}

/// Price every cart line with `prices`, skipping unknown products.
///
/// # Errors
///
/// Returns `CheckoutError::Pricing` if a line total or the order total
/// overflows.
pub fn draft_order(
    cart: &Cart,
    prices: &HashMap<ProductId, Price>,
) -> Result<OrderDraft, CheckoutError> {
    let mut lines = Vec::with_capacity(cart.len());
    let mut skipped = Vec::new();

    for line in cart.lines() {
        match prices.get(&line.product_id) {
            Some(&unit_price) => lines.push(DraftLine {
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price,
            }),
            None => skipped.push(line.product_id),
        }
    }

    let subtotals = lines
        .iter()
        .map(|l| l.unit_price.times(l.quantity))
        .collect::<Result<Vec<_>, _>>()?;
    let total = Price::try_sum(subtotals)?;

    Ok(OrderDraft {
        lines,
        total,
        skipped,
    })
}

/// Outcome of a committed checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedOrder {
    pub order_id: OrderId,
    pub total: Price,
    /// Number of order items written.
    pub line_count: usize,
    /// Cart products that were left out because they no longer exist.
    pub skipped: Vec<ProductId>,
    /// Products whose stock was too low to decrement.
    pub stock_shortfalls: Vec<ProductId>,
}

/// Checkout service.
pub struct CheckoutService<'a> {
    store: &'a dyn Store,
}

impl<'a> CheckoutService<'a> {
    /// Create a new checkout service.
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Place an order for `user_id` from `cart`.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyCart` without touching the database,
    /// `CheckoutError::NothingToOrder` if every product is gone,
    /// `CheckoutError::Pricing` if the total overflows, and
    /// `CheckoutError::Repository` if the transaction failed and was rolled
    /// back.
    #[instrument(skip(self, cart), fields(lines = cart.len()))]
    pub async fn place_order(
        &self,
        user_id: UserId,
        cart: &Cart,
    ) -> Result<PlacedOrder, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let placed = self.store.place_order(user_id, cart).await?;

        if !placed.skipped.is_empty() {
            tracing::warn!(
                order_id = %placed.order_id,
                skipped = ?placed.skipped,
                "Cart lines for missing products were left out"
            );
        }
        if !placed.stock_shortfalls.is_empty() {
            tracing::warn!(
                order_id = %placed.order_id,
                products = ?placed.stock_shortfalls,
                "Stock too low to decrement"
            );
        }
        tracing::info!(
            order_id = %placed.order_id,
            total = %placed.total,
            lines = placed.line_count,
            "Order placed"
        );

        Ok(placed)
    }
}
