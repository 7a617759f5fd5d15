//! Core types for Tuckshop.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod percentage;
pub mod price;
pub mod quantity;

pub use email::{Email, EmailError};
pub use id::*;
pub use percentage::{Percentage, PercentageError};
pub use price::{CurrencyCode, Price, PriceError};
pub use quantity::Quantity;
