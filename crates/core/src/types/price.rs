//! Type-safe price representation using decimal arithmetic.
//!
//! Amounts are held in the currency's standard unit (dollars, not cents) as a
//! [`Decimal`], so percentage discounts never pass through floating point.

use core::fmt;
use core::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::types::Quantity;

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// Prices cannot be negative.
    #[error("price cannot be negative (got {0})")]
    Negative(Decimal),

    /// Amounts in different currencies cannot be combined.
    #[error("cannot add {found} to an amount in {expected}")]
    CurrencyMismatch {
        expected: CurrencyCode,
        found: CurrencyCode,
    },
}

/// A non-negative amount of money in a specific currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Price {
    amount: Decimal,
    currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] if `amount` is below zero.
    pub fn new(amount: Decimal, currency_code: CurrencyCode) -> Result<Self, PriceError> {
        if amount < Decimal::ZERO {
            return Err(PriceError::Negative(amount));
        }
        Ok(Self {
            amount,
            currency_code,
        })
    }

    /// A zero amount in the given currency.
    #[must_use]
    pub const fn zero(currency_code: CurrencyCode) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency_code,
        }
    }

    /// The amount in the currency's standard unit.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.amount
    }

    /// The ISO 4217 currency of this price.
    #[must_use]
    pub const fn currency_code(&self) -> CurrencyCode {
        self.currency_code
    }

    /// Round to the currency's minor unit using half-up rounding.
    ///
    /// `12.345` USD becomes `12.35`.
    #[must_use]
    pub fn round_to_minor_unit(self) -> Self {
        Self {
            amount: self.amount.round_dp_with_strategy(
                self.currency_code.minor_units(),
                RoundingStrategy::MidpointAwayFromZero,
            ),
            currency_code: self.currency_code,
        }
    }

    /// Reduce the price by `percent` of itself, rounded to the minor unit.
    #[must_use]
    pub fn discounted_by(self, percent: crate::Percentage) -> Self {
        let remaining = Decimal::ONE_HUNDRED - Decimal::from(percent.get());
        Self {
            amount: self.amount * remaining / Decimal::ONE_HUNDRED,
            currency_code: self.currency_code,
        }
        .round_to_minor_unit()
    }

    /// Sum of two amounts in the same currency.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::CurrencyMismatch`] if `rhs` is in another currency.
    pub fn checked_add(self, rhs: Self) -> Result<Self, PriceError> {
        if self.currency_code != rhs.currency_code {
            return Err(PriceError::CurrencyMismatch {
                expected: self.currency_code,
                found: rhs.currency_code,
            });
        }
        Ok(Self {
            amount: self.amount + rhs.amount,
            currency_code: self.currency_code,
        })
    }

    /// Multiply the unit price by a line quantity.
    #[must_use]
    pub fn times(self, quantity: Quantity) -> Self {
        Self {
            amount: self.amount * Decimal::from(quantity.get()),
            currency_code: self.currency_code,
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self.round_to_minor_unit();
        let digits = self.currency_code.minor_units() as usize;
        write!(
            f,
            "{}{:.*}",
            self.currency_code.symbol(),
            digits,
            rounded.amount
        )
    }
}

/// ISO 4217 currency codes supported by the shop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
    JPY,
}

impl CurrencyCode {
    /// Number of decimal places in the currency's minor unit.
    #[must_use]
    pub const fn minor_units(self) -> u32 {
        match self {
            Self::JPY => 0,
            Self::USD | Self::EUR | Self::GBP | Self::CAD | Self::AUD => 2,
        }
    }

    /// Display symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::USD | Self::CAD | Self::AUD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
            Self::JPY => "¥",
        }
    }

    /// ISO 4217 alphabetic code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::CAD => "CAD",
            Self::AUD => "AUD",
            Self::JPY => "JPY",
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            "CAD" => Ok(Self::CAD),
            "AUD" => Ok(Self::AUD),
            "JPY" => Ok(Self::JPY),
            other => Err(format!("unsupported currency: {other}")),
        }
    }
}
