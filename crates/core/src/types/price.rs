//! Type-safe price representation using decimal arithmetic.
//!
//! Prices are non-negative amounts in the store's currency. Arithmetic is done
//! in [`Decimal`] so line totals such as `40.00 x 2 + 25.00` are exact; the
//! embedded database stores prices as floating point and converts at the
//! boundary with [`Price::from_f64`] / [`Price::to_f64`].

use core::fmt;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use super::cart::Quantity;

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The amount is below zero.
    #[error("price cannot be negative: {0}")]
    Negative(Decimal),
    /// The floating-point value has no decimal representation (NaN, infinity).
    #[error("price is not a finite number")]
    NotFinite,
    /// The result does not fit in a decimal.
    #[error("amount overflowed")]
    Overflow,
}

/// A non-negative monetary amount.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// The zero amount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price from a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Negative` if the amount is below zero.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount < Decimal::ZERO {
            return Err(PriceError::Negative(amount));
        }
        Ok(Self(amount))
    }

    /// Create a price from a floating-point column value, rounded to cents.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::NotFinite` for NaN or infinite input and
    /// `PriceError::Negative` for amounts below zero.
    pub fn from_f64(amount: f64) -> Result<Self, PriceError> {
        let decimal = Decimal::try_from(amount).map_err(|_| PriceError::NotFinite)?;
        Self::new(decimal.round_dp(2))
    }

    /// The amount as a floating-point value for `REAL` columns.
    ///
    /// Returns `None` only if the decimal cannot be represented, which does
    /// not happen for amounts produced by this type.
    #[must_use]
    pub fn to_f64(self) -> Option<f64> {
        self.0.to_f64()
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(self) -> Decimal {
        self.0
    }

    /// Line total for `quantity` units at this price.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Overflow` if the product does not fit.
    pub fn times(self, quantity: Quantity) -> Result<Self, PriceError> {
        self.0
            .checked_mul(Decimal::from(quantity.get()))
            .map(Self)
            .ok_or(PriceError::Overflow)
    }

    /// Sum of two amounts.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Overflow` if the sum does not fit.
    pub fn checked_add(self, other: Self) -> Result<Self, PriceError> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or(PriceError::Overflow)
    }

    /// Sum of many amounts, starting from zero.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Overflow` if any partial sum does not fit.
    pub fn try_sum<I>(amounts: I) -> Result<Self, PriceError>
    where
        I: IntoIterator<Item = Self>,
    {
        amounts
            .into_iter()
            .try_fold(Self::ZERO, Self::checked_add)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_rejected() {
        assert!(matches!(
            Price::new(Decimal::new(-1, 2)),
            Err(PriceError::Negative(_))
        ));
    }

    #[test]
    fn test_from_f64_rounds_to_cents() {
        let price = Price::from_f64(19.999).unwrap();
        assert_eq!(price.amount(), Decimal::new(2000, 2));
    }

    #[test]
    fn test_from_f64_rejects_nan() {
        assert_eq!(Price::from_f64(f64::NAN), Err(PriceError::NotFinite));
    }

    #[test]
    fn test_line_totals_sum_exactly() {
        let rice = Price::from_f64(40.0).unwrap();
        let milk = Price::from_f64(25.0).unwrap();
        let total = Price::try_sum([
            rice.times(Quantity::new(2).unwrap()).unwrap(),
            milk.times(Quantity::new(1).unwrap()).unwrap(),
        ])
        .unwrap();
        assert_eq!(total.amount(), Decimal::new(105, 0));
        assert_eq!(total.to_string(), "105.00");
    }

    #[test]
    fn test_oversized_amounts_report_overflow() {
        let huge = Price::new(Decimal::MAX).unwrap();
        assert_eq!(huge.times(Quantity::new(2).unwrap()), Err(PriceError::Overflow));
        assert_eq!(huge.checked_add(huge), Err(PriceError::Overflow));
        assert_eq!(Price::try_sum([huge, huge]), Err(PriceError::Overflow));
        assert_eq!(huge.times(Quantity::ONE), Ok(huge));
    }

    #[test]
    fn test_corrupt_price_times_largest_quantity_is_an_error() {
        let corrupt = Price::from_f64(1e20).unwrap();
        assert_eq!(corrupt.times(Quantity::MAX), Err(PriceError::Overflow));
    }
}
