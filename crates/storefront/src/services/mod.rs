//! Business logic services for the storefront.
//!
//! Services are generic over the store traits in [`crate::db`] so the same
//! code runs against Postgres and [`crate::db::MemoryStore`].

pub mod auth;
pub mod cart;
pub mod catalog;

pub use auth::{AuthError, AuthService};
pub use cart::{CartError, CartService, CartSummary};
pub use catalog::{CatalogError, CatalogService, Retirement};
