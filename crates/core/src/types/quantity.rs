//! Line item quantity.

use core::fmt;
use core::num::NonZeroU32;

use serde::{Deserialize, Serialize};

/// A strictly positive number of units on a cart line.
///
/// Zero and negative quantities never reach a line item: requests asking for
/// them are turned into removals before a `Quantity` is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(NonZeroU32);

impl Quantity {
    /// A single unit.
    pub const ONE: Self = Self(NonZeroU32::MIN);

    /// Largest quantity a line can hold; fits a Postgres `INTEGER` column.
    pub const MAX: Self = Self(NonZeroU32::MIN.saturating_add(i32::MAX.unsigned_abs() - 1));

    /// Returns `None` for zero.
    #[must_use]
    pub const fn new(value: u32) -> Option<Self> {
        match NonZeroU32::new(value) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Interpret a signed request quantity. Anything `<= 0` is `None`,
    /// anything above [`Quantity::MAX`] is clamped to it.
    #[must_use]
    pub fn from_signed(value: i64) -> Option<Self> {
        let clamped = value.min(i64::from(Self::MAX.get()));
        u32::try_from(clamped).ok().and_then(Self::new)
    }

    /// The quantity as an integer.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    /// Sum two quantities, `None` on overflow.
    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.get()).map(Self)
    }

    /// Sum two quantities, capped at [`Quantity::MAX`].
    #[must_use]
    pub fn saturating_add(self, other: Self) -> Self {
        self.checked_add(other).map_or(Self::MAX, |sum| sum.min(Self::MAX))
    }

    /// The quantity as a database integer.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        i32::try_from(self.get()).unwrap_or(i32::MAX)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
