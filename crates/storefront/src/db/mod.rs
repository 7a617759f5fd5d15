//! Persistence for the storefront.
//!
//! Services talk to storage through the [`CartStore`], [`Catalog`] and
//! [`UserStore`] traits. [`PgStore`] implements them on `PostgreSQL`;
//! [`MemoryStore`] implements them in process for tests.
//!
//! # Schema: `storefront`
//!
//! - `user` - accounts with an Argon2 password hash and admin flag
//! - `sale` - time-limited percentage discounts
//! - `product` - catalog entries, optionally pointing at a sale
//! - `cart` - carts, anonymous (`user_id IS NULL`) or owned (unique per user)
//! - `cart_product` - line items, unique per (cart, product)
//! - `tower_sessions.session` - session storage
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p tuckshop-cli -- migrate
//! ```

pub mod carts;
pub mod memory;
pub mod products;
pub mod users;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use tuckshop_core::{
    Cart, CartId, CartOwner, CurrencyCode, Email, LineItem, NewProduct, NewSale, Product, ProductId,
    ProductUpdate, Quantity, Sale, SaleId, UserId,
};

pub use memory::MemoryStore;

use crate::models::user::User;

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Map a unique violation to [`RepositoryError::Conflict`].
fn conflict_on_unique(err: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(err)
}

/// Durable carts and their line items.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Look up a cart by id.
    async fn find_cart(&self, id: CartId) -> Result<Option<Cart>, RepositoryError>;

    /// The cart owned by `user`, if any.
    async fn find_cart_for_user(&self, user: UserId) -> Result<Option<Cart>, RepositoryError>;

    /// Create a cart.
    ///
    /// A user owns at most one cart: creating one for a user who already has
    /// a cart returns the existing cart.
    async fn create_cart(&self, owner: CartOwner) -> Result<Cart, RepositoryError>;

    /// Hand an anonymous cart to `user`.
    ///
    /// Fails with `NotFound` if the cart is gone or no longer anonymous, and
    /// with `Conflict` if the user already owns a cart.
    async fn assign_owner(&self, cart: CartId, user: UserId) -> Result<Cart, RepositoryError>;

    /// Fold every line of `source` into `target`, then delete `source`.
    ///
    /// Lines are replayed in insertion order; a product present in both carts
    /// ends up with the sum of both quantities. Atomic: either the whole merge
    /// happens or nothing changes. A missing `source` is a no-op.
    async fn merge_carts(&self, source: CartId, target: CartId) -> Result<(), RepositoryError>;

    /// Line items of a cart in insertion order.
    async fn line_items(&self, cart: CartId) -> Result<Vec<LineItem>, RepositoryError>;

    /// Add `by` units of `product`, creating the line if needed.
    async fn increment_line_item(
        &self,
        cart: CartId,
        product: ProductId,
        by: Quantity,
    ) -> Result<LineItem, RepositoryError>;

    /// Set the quantity of `product`, creating the line if needed.
    async fn set_line_item_quantity(
        &self,
        cart: CartId,
        product: ProductId,
        quantity: Quantity,
    ) -> Result<LineItem, RepositoryError>;

    /// Remove the line for `product`. Returns whether a line existed.
    async fn delete_line_item(
        &self,
        cart: CartId,
        product: ProductId,
    ) -> Result<bool, RepositoryError>;

    /// Remove `product` from every cart. Returns the number of lines removed.
    async fn delete_line_items_for_product(
        &self,
        product: ProductId,
    ) -> Result<u64, RepositoryError>;
}

/// Products and sales.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Products that are not retired, ordered by title.
    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError>;

    /// A product by id, retired or not, with its sale attached.
    async fn find_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Insert a validated product.
    async fn create_product(&self, input: &NewProduct) -> Result<Product, RepositoryError>;

    /// Apply a validated update. `NotFound` if the product does not exist.
    async fn update_product(
        &self,
        id: ProductId,
        update: &ProductUpdate,
    ) -> Result<Product, RepositoryError>;

    /// Mark a product retired at `at`. Retiring twice keeps the first timestamp.
    async fn retire_product(
        &self,
        id: ProductId,
        at: DateTime<Utc>,
    ) -> Result<Product, RepositoryError>;

    /// Insert a sale.
    async fn create_sale(&self, input: &NewSale) -> Result<Sale, RepositoryError>;

    /// A sale by id.
    async fn find_sale(&self, id: SaleId) -> Result<Option<Sale>, RepositoryError>;
}

/// User accounts.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// A user by id.
    async fn find_user(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Create a user with a password hash. `Conflict` if the email is taken.
    async fn create_user(
        &self,
        email: &Email,
        password_hash: &str,
        is_admin: bool,
    ) -> Result<User, RepositoryError>;

    /// A user and their password hash by email.
    async fn find_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError>;
}

/// `PostgreSQL` implementation of the store traits.
///
/// New products are priced in the shop currency given at construction.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
    currency: CurrencyCode,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool, currency: CurrencyCode) -> Self {
        Self { pool, currency }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
