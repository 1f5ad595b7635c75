//! The session shopping cart.
//!
//! A [`Cart`] maps product ids to positive quantities. It is a plain value:
//! the web layer reads it from the session, mutates it, and writes it back.
//! Nothing here touches storage, so a cart can reference products that have
//! since been deleted; checkout decides what to do with those lines.

use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use super::id::ProductId;

/// Why a raw quantity string was not accepted.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QuantityError {
    /// Not an integer at all.
    #[error("quantity is not a number: {0:?}")]
    NotANumber(String),
    /// Zero or negative.
    #[error("quantity must be at least 1 (got {0})")]
    NotPositive(i64),
    /// Above `Quantity::MAX`.
    #[error("quantity is too large (got {0})")]
    TooLarge(u32),
}

/// A positive number of units, at most [`Quantity::MAX`].
///
/// The upper bound is the largest value an `INTEGER` quantity column holds,
/// so a cart line is stored exactly as it was priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(NonZeroU32);

impl Quantity {
    /// One unit.
    pub const ONE: Self = Self(NonZeroU32::MIN);

    /// The largest quantity a line can hold.
    pub const MAX: Self = match NonZeroU32::new(i32::MAX.unsigned_abs()) {
        Some(v) => Self(v),
        None => Self::ONE,
    };

    /// Create a quantity, returning `None` for zero or values above
    /// [`Quantity::MAX`].
    #[must_use]
    pub const fn new(value: u32) -> Option<Self> {
        if value > Self::MAX.get() {
            return None;
        }
        match NonZeroU32::new(value) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Parse a form value.
    ///
    /// # Errors
    ///
    /// Returns `QuantityError::NotANumber` for non-integers and
    /// `QuantityError::NotPositive` for zero or negative values. Values above
    /// [`Quantity::MAX`] are clamped.
    pub fn parse(raw: &str) -> Result<Self, QuantityError> {
        let trimmed = raw.trim();
        let value: i64 = trimmed
            .parse()
            .map_err(|_| QuantityError::NotANumber(trimmed.to_owned()))?;
        if value <= 0 {
            return Err(QuantityError::NotPositive(value));
        }
        Ok(u32::try_from(value)
            .ok()
            .and_then(Self::new)
            .unwrap_or(Self::MAX))
    }

    /// The number of units.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    /// Add two quantities, saturating at [`Quantity::MAX`].
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        match Self::new(self.0.get().saturating_add(other.0.get())) {
            Some(sum) => sum,
            None => Self::MAX,
        }
    }
}

impl TryFrom<u32> for Quantity {
    type Error = QuantityError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        if value == 0 {
            return Err(QuantityError::NotPositive(0));
        }
        Self::new(value).ok_or(QuantityError::TooLarge(value))
    }
}

impl From<Quantity> for u32 {
    fn from(quantity: Quantity) -> Self {
        quantity.get()
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// One entry in the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Product the line refers to.
    pub product_id: ProductId,
    /// Desired number of units.
    pub quantity: Quantity,
}

/// A form field that `Cart::from_quantity_fields` could not use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedField {
    /// The form field name, e.g. `qty_3`.
    pub field: String,
    /// The submitted value.
    pub value: String,
    /// Why it was dropped.
    pub reason: String,
}

/// Result of rebuilding a cart from the cart page form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartUpdate {
    /// The replacement cart.
    pub cart: Cart,
    /// `qty_<id>` fields that were dropped.
    pub rejected: Vec<RejectedField>,
}

/// Session cart: product id to quantity, in the order products were added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Prefix of the cart form's quantity fields.
    pub const QUANTITY_FIELD_PREFIX: &'static str = "qty_";

    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Add `quantity` units of a product, merging with an existing line.
    pub fn add(&mut self, product_id: ProductId, quantity: Quantity) {
        match self.lines.iter_mut().find(|l| l.product_id == product_id) {
            Some(line) => line.quantity = line.quantity.saturating_add(quantity),
            None => self.lines.push(CartLine {
                product_id,
                quantity,
            }),
        }
    }

    /// Set the quantity of a product, replacing any existing line.
    pub fn set(&mut self, product_id: ProductId, quantity: Quantity) {
        match self.lines.iter_mut().find(|l| l.product_id == product_id) {
            Some(line) => line.quantity = quantity,
            None => self.lines.push(CartLine {
                product_id,
                quantity,
            }),
        }
    }

    /// Remove a product's line. Returns `false` if it was not in the cart.
    pub fn remove(&mut self, product_id: ProductId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);
        self.lines.len() != before
    }

    /// Build a replacement cart from `qty_<id>` form fields.
    ///
    /// Fields without the prefix are ignored. Fields whose id or quantity does
    /// not parse, or whose quantity is zero or negative, are left out of the
    /// cart and reported in [`CartUpdate::rejected`].
    pub fn from_quantity_fields<'a, I>(fields: I) -> CartUpdate
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut update = CartUpdate::default();

        for (field, value) in fields {
            let Some(raw_id) = field.strip_prefix(Self::QUANTITY_FIELD_PREFIX) else {
                continue;
            };

            let reject = |reason: String| RejectedField {
                field: field.to_owned(),
                value: value.to_owned(),
                reason,
            };

            let product_id = match raw_id.parse::<ProductId>() {
                Ok(id) => id,
                Err(e) => {
                    update.rejected.push(reject(format!("invalid product id: {e}")));
                    continue;
                }
            };

            match Quantity::parse(value) {
                Ok(quantity) => update.cart.set(product_id, quantity),
                Err(e) => update.rejected.push(reject(e.to_string())),
            }
        }

        update
    }

    /// Total number of units across all lines (the cart badge).
    #[must_use]
    pub fn total_count(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity.get())).sum()
    }

    /// The cart lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of distinct products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn qty(n: u32) -> Quantity {
        Quantity::new(n).unwrap()
    }

    #[test]
    fn test_quantity_parse() {
        assert_eq!(Quantity::parse(" 3 ").unwrap().get(), 3);
        assert_eq!(Quantity::parse("0"), Err(QuantityError::NotPositive(0)));
        assert_eq!(Quantity::parse("-1"), Err(QuantityError::NotPositive(-1)));
        assert!(matches!(
            Quantity::parse("x"),
            Err(QuantityError::NotANumber(_))
        ));
    }

    #[test]
    fn test_quantity_parse_clamps_huge_values() {
        assert_eq!(Quantity::parse("99999999999").unwrap(), Quantity::MAX);
        assert_eq!(Quantity::parse("2147483648").unwrap(), Quantity::MAX);
        assert_eq!(Quantity::MAX.get(), 2_147_483_647);
    }

    #[test]
    fn test_quantity_new_rejects_values_a_column_cannot_hold() {
        assert!(Quantity::new(0).is_none());
        assert!(Quantity::new(u32::MAX).is_none());
        assert_eq!(Quantity::new(2_147_483_647), Some(Quantity::MAX));
    }

    #[test]
    fn test_quantity_deserialize_enforces_bounds() {
        let ok: Quantity = serde_json::from_str("7").unwrap();
        assert_eq!(ok.get(), 7);
        assert!(serde_json::from_str::<Quantity>("0").is_err());
        assert!(serde_json::from_str::<Quantity>("4294967295").is_err());
        assert_eq!(serde_json::to_string(&ok).unwrap(), "7");
    }

    #[test]
    fn test_add_same_product_accumulates() {
        let mut cart = Cart::new();
        let rice = ProductId::new(1);
        cart.add(rice, qty(2));
        cart.add(rice, qty(3));
        assert_eq!(cart.lines(), &[CartLine {
            product_id: rice,
            quantity: qty(5),
        }]);
    }

    #[test]
    fn test_add_saturates() {
        let mut cart = Cart::new();
        let id = ProductId::new(9);
        cart.add(id, Quantity::MAX);
        cart.add(id, qty(10));
        assert_eq!(cart.lines()[0].quantity, Quantity::MAX);
        assert_eq!(cart.total_count(), 2_147_483_647);
    }

    #[test]
    fn test_remove() {
        let mut cart = Cart::new();
        cart.add(ProductId::new(1), qty(1));
        assert!(cart.remove(ProductId::new(1)));
        assert!(!cart.remove(ProductId::new(1)));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_from_quantity_fields_keeps_only_positive_quantities() {
        let update = Cart::from_quantity_fields([
            ("qty_1", "3"),
            ("qty_2", "0"),
            ("qty_3", "-1"),
            ("qty_4", "x"),
            ("csrf", "ignored"),
        ]);

        assert_eq!(update.cart.lines(), &[CartLine {
            product_id: ProductId::new(1),
            quantity: qty(3),
        }]);
        let rejected: Vec<&str> = update.rejected.iter().map(|r| r.field.as_str()).collect();
        assert_eq!(rejected, ["qty_2", "qty_3", "qty_4"]);
    }

    #[test]
    fn test_from_quantity_fields_rejects_bad_ids() {
        let update = Cart::from_quantity_fields([("qty_abc", "2")]);
        assert!(update.cart.is_empty());
        assert_eq!(update.rejected.len(), 1);
    }

    #[test]
    fn test_total_count() {
        let mut cart = Cart::new();
        cart.add(ProductId::new(1), qty(2));
        cart.add(ProductId::new(2), qty(5));
        assert_eq!(cart.total_count(), 7);
        assert_eq!(Cart::new().total_count(), 0);
    }

    #[test]
    fn test_serde_roundtrip_through_session_value() {
        let mut cart = Cart::new();
        cart.add(ProductId::new(4), qty(2));
        let value = serde_json::to_value(&cart).unwrap();
        let back: Cart = serde_json::from_value(value).unwrap();
        assert_eq!(back, cart);
    }
}
