//! Tuckshop Core - Domain types and pricing logic.
//!
//! This crate provides the types shared by every Tuckshop component:
//! - `storefront` - Public-facing shop (catalog, cart, accounts, admin actions)
//! - `cli` - Command-line tools for migrations, seeding and admin users
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. Everything here can be evaluated against a fixed point in
//! time, which keeps sale pricing and cart resolution deterministic in tests.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, prices, percentages, quantities and emails
//! - [`catalog`] - Products, sales and the validated inputs that change them
//! - [`pricing`] - The price engine (effective unit price under an active sale)
//! - [`cart`] - Carts, line items and cart arithmetic
//! - [`resolution`] - Pure planner deciding which cart a request works against

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod pricing;
pub mod resolution;
pub mod types;

pub use cart::{Cart, CartLine, CartOwner, LineItem};
pub use catalog::{NewProduct, NewSale, Product, ProductUpdate, Sale, ValidationError};
pub use resolution::Resolution;
pub use types::*;
