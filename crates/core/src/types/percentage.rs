//! Whole-number discount percentage.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Percentage`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PercentageError {
    /// Percentages must lie in `0..=100`.
    #[error("percentage must be between 0 and 100 (got {0})")]
    OutOfRange(i64),
}

/// A percentage in `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Percentage(u8);

impl Percentage {
    /// Create a percentage.
    ///
    /// # Errors
    ///
    /// Returns [`PercentageError::OutOfRange`] outside `0..=100`.
    pub fn new(value: i64) -> Result<Self, PercentageError> {
        match u8::try_from(value) {
            Ok(v) if v <= 100 => Ok(Self(v)),
            _ => Err(PercentageError::OutOfRange(value)),
        }
    }

    /// The percentage as an integer.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Percentage {
    type Error = PercentageError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Percentage> for u8 {
    fn from(p: Percentage) -> Self {
        p.0
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds() {
        assert_eq!(Percentage::new(0).unwrap().get(), 0);
        assert_eq!(Percentage::new(100).unwrap().get(), 100);
        assert_eq!(Percentage::new(101), Err(PercentageError::OutOfRange(101)));
        assert_eq!(Percentage::new(-1), Err(PercentageError::OutOfRange(-1)));
    }

    #[test]
    fn test_deserialize_validates() {
        let p: Percentage = serde_json::from_str("75").unwrap();
        assert_eq!(p.to_string(), "75%");
        assert!(serde_json::from_str::<Percentage>("150").is_err());
    }
}
