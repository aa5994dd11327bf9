//! Type-safe price representation using decimal arithmetic.
//!
//! The commerce API sends prices as JSON numbers (e.g. `99.99`). Parsing them
//! into [`Decimal`] keeps cart totals exact; rounding only happens when a
//! price is rendered for display.

use core::fmt;
use core::ops::{Add, Mul};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// Prices cannot be negative.
    #[error("price cannot be negative (got {0})")]
    Negative(Decimal),
    /// The input is not a decimal number.
    #[error("invalid price: {0}")]
    Invalid(String),
}

/// A non-negative amount in the store currency.
///
/// ```
/// use digistore_core::Price;
/// use rust_decimal::Decimal;
///
/// let price = Price::new(Decimal::new(1050, 2)).unwrap();
/// assert_eq!(price.display(), "$10.50");
/// assert_eq!((price * 3).display(), "$31.50");
/// assert!(Price::new(Decimal::new(-1, 0)).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// A price of zero.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price, rejecting negative amounts.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] if `amount` is below zero.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative(amount));
        }
        Ok(Self(amount))
    }

    /// Create a price from a whole number of cents.
    #[must_use]
    pub fn from_cents(cents: u32) -> Self {
        Self(Decimal::new(i64::from(cents), 2))
    }

    /// Parse a price typed into a form field (e.g. `"19.99"`).
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Invalid`] for non-numeric input and
    /// [`PriceError::Negative`] for amounts below zero.
    pub fn parse(input: &str) -> Result<Self, PriceError> {
        let amount = input
            .trim()
            .parse::<Decimal>()
            .map_err(|_| PriceError::Invalid(input.trim().to_owned()))?;
        Self::new(amount)
    }

    /// The exact decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// The amount rounded to cents.
    #[must_use]
    pub fn rounded(&self) -> Decimal {
        self.0
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }

    /// Format for display (e.g. `"$19.99"`).
    #[must_use]
    pub fn display(&self) -> String {
        format!("${:.2}", self.rounded())
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Self::new(amount)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Mul<u32> for Price {
    type Output = Self;

    fn mul(self, quantity: u32) -> Self::Output {
        Self(self.0 * Decimal::from(quantity))
    }
}

impl core::iter::Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_negative() {
        assert!(matches!(
            Price::new(Decimal::new(-5, 1)),
            Err(PriceError::Negative(_))
        ));
        assert!(Price::new(Decimal::ZERO).is_ok());
    }

    #[test]
    fn test_display_pads_and_rounds() {
        assert_eq!(Price::from_cents(2550).display(), "$25.50");
        assert_eq!(Price::new(Decimal::new(10, 0)).unwrap().display(), "$10.00");
        assert_eq!(Price::new(Decimal::new(19_995, 3)).unwrap().display(), "$20.00");
    }

    #[test]
    fn test_parse_form_input() {
        assert_eq!(Price::parse(" 49.99 ").unwrap(), Price::from_cents(4999));
        assert!(matches!(Price::parse("abc"), Err(PriceError::Invalid(_))));
        assert!(matches!(Price::parse("-1"), Err(PriceError::Negative(_))));
    }

    #[test]
    fn test_deserializes_json_number() {
        let price: Price = serde_json::from_str("99.99").unwrap();
        assert_eq!(price, Price::from_cents(9999));

        let err = serde_json::from_str::<Price>("-3.5");
        assert!(err.is_err());
    }

    #[test]
    fn test_line_total_and_sum() {
        let total: Price = [Price::from_cents(1000) * 2, Price::from_cents(550)]
            .into_iter()
            .sum();
        assert_eq!(total, Price::from_cents(2550));
    }
}
