//! Type-safe price representation using decimal arithmetic.
//!
//! Shopify's REST Admin API sends money as decimal strings (`"19.99"`) next to
//! a shop-level ISO 4217 currency code, and plan prices are stored as
//! `NUMERIC`, so amounts are never floats.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when building a [`Price`] or [`CurrencyCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The amount is not a valid decimal number.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    /// The amount is negative.
    #[error("amount cannot be negative")]
    Negative,
    /// The currency code is not three ASCII letters.
    #[error("invalid currency code: {0}")]
    InvalidCurrency(String),
}

/// An ISO 4217 currency code, stored uppercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode([u8; 3]);

impl CurrencyCode {
    /// US dollars, used when a payload omits its currency.
    pub const USD: Self = Self(*b"USD");

    /// Parse a currency code, accepting any case.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::InvalidCurrency` unless the input is exactly three
    /// ASCII letters.
    pub fn parse(s: &str) -> Result<Self, PriceError> {
        let bytes = s.trim().as_bytes();
        match bytes {
            [a, b, c] if bytes.iter().all(u8::is_ascii_alphabetic) => Ok(Self([
                a.to_ascii_uppercase(),
                b.to_ascii_uppercase(),
                c.to_ascii_uppercase(),
            ])),
            _ => Err(PriceError::InvalidCurrency(s.to_string())),
        }
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        // Constructed only from ASCII letters.
        std::str::from_utf8(&self.0).unwrap_or("USD")
    }
}

impl Default for CurrencyCode {
    fn default() -> Self {
        Self::USD
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = PriceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.as_str().to_string()
    }
}

/// A non-negative price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Negative` if the amount is below zero.
    pub fn new(amount: Decimal, currency_code: CurrencyCode) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }
        Ok(Self {
            amount,
            currency_code,
        })
    }

    /// Parse a price from Shopify's string representation.
    ///
    /// # Errors
    ///
    /// Returns a `PriceError` if the amount or currency is invalid.
    pub fn parse(amount: &str, currency: &str) -> Result<Self, PriceError> {
        let amount = Decimal::from_str(amount.trim())
            .map_err(|_| PriceError::InvalidAmount(amount.to_string()))?;
        Self::new(amount, CurrencyCode::parse(currency)?)
    }

    /// A zero amount in the given currency.
    #[must_use]
    pub const fn zero(currency_code: CurrencyCode) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency_code,
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} {}", self.amount, self.currency_code)
    }
}
