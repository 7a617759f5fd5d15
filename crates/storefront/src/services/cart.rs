//! Cart identity resolution and line item mutations.
//!
//! [`CartService::resolve`] finds the one cart a request works against,
//! creating, adopting or merging carts as the visitor moves between anonymous
//! and logged-in. The mutators then change that cart's line items, keeping at
//! most one line per product.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::instrument;

use tuckshop_core::cart::{self, CartLine};
use tuckshop_core::resolution::{self, Resolution};
use tuckshop_core::{
    Cart, CartId, CartOwner, CurrencyCode, LineItem, Price, PriceError, Product, ProductId,
    Quantity, UserId,
};

use crate::db::{CartStore, Catalog, RepositoryError};

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The product does not exist or has been retired.
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    /// A product is priced in a currency other than the shop's.
    #[error("pricing error: {0}")]
    Pricing(#[from] PriceError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// A cart with its priced lines.
#[derive(Debug, Clone)]
pub struct CartSummary {
    pub cart: Cart,
    pub lines: Vec<CartLine>,
    pub total: Price,
    pub item_count: u64,
    /// Instant the prices were evaluated at.
    pub as_of: DateTime<Utc>,
}

/// Cart resolver and line item mutator over a store.
pub struct CartService<S: ?Sized> {
    store: Arc<S>,
    currency: CurrencyCode,
}

impl<S: ?Sized> Clone for CartService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            currency: self.currency,
        }
    }
}

impl<S> CartService<S>
where
    S: CartStore + Catalog + ?Sized,
{
    /// Create a cart service pricing totals in `currency`.
    #[must_use]
    pub const fn new(store: Arc<S>, currency: CurrencyCode) -> Self {
        Self { store, currency }
    }

    /// The shop currency.
    #[must_use]
    pub const fn currency(&self) -> CurrencyCode {
        self.currency
    }

    /// Find or create the active cart for a request.
    ///
    /// `session_cart` is the id remembered by the client session; a dangling
    /// id is treated as absent. With a `user`, an anonymous session cart is
    /// adopted when the user has no cart yet and merged into the user's cart
    /// otherwise.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store fails.
    #[instrument(skip(self))]
    pub async fn resolve(
        &self,
        session_cart: Option<CartId>,
        user: Option<UserId>,
    ) -> Result<Cart, CartError> {
        let session_cart = match session_cart {
            Some(id) => self.store.find_cart(id).await?,
            None => None,
        };
        let user_cart = match user {
            Some(user) => self.store.find_cart_for_user(user).await?,
            None => None,
        };

        let plan = resolution::plan(user, session_cart.as_ref(), user_cart.as_ref());
        tracing::debug!(?plan, "cart resolution");

        let loaded = |id: CartId| {
            [session_cart, user_cart]
                .into_iter()
                .flatten()
                .find(|cart| cart.id == id)
                .ok_or(CartError::Repository(RepositoryError::NotFound))
        };

        match plan {
            Resolution::UseSessionCart(id) | Resolution::UseUserCart(id) => loaded(id),
            Resolution::CreateAnonymous => {
                let cart = self.store.create_cart(CartOwner::Anonymous).await?;
                tracing::info!(cart = %cart.id, "created anonymous cart");
                Ok(cart)
            }
            Resolution::CreateForUser(user) => {
                Ok(self.store.create_cart(CartOwner::User(user)).await?)
            }
            Resolution::Adopt { cart, user } => self.adopt(cart, user).await,
            Resolution::Merge { source, target } => {
                self.store.merge_carts(source, target).await?;
                tracing::info!(%source, %target, "merged session cart into user cart");
                loaded(target)
            }
        }
    }

    /// Give an anonymous cart to `user`, merging instead if a concurrent
    /// request created a cart for the user first.
    async fn adopt(&self, cart: CartId, user: UserId) -> Result<Cart, CartError> {
        match self.store.assign_owner(cart, user).await {
            Ok(adopted) => {
                tracing::info!(cart = %adopted.id, %user, "adopted session cart");
                Ok(adopted)
            }
            Err(RepositoryError::Conflict(_)) => {
                let target = self.store.create_cart(CartOwner::User(user)).await?;
                self.store.merge_carts(cart, target.id).await?;
                tracing::info!(source = %cart, target = %target.id, "lost adoption race, merged");
                Ok(target)
            }
            Err(RepositoryError::NotFound) => {
                Ok(self.store.create_cart(CartOwner::User(user)).await?)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// A product that may be put into carts.
    async fn available_product(&self, product: ProductId) -> Result<Product, CartError> {
        let found = self
            .store
            .find_product(product)
            .await?
            .filter(|p| !p.is_retired())
            .ok_or(CartError::ProductNotFound(product))?;

        let currency = found.price.currency_code();
        if currency != self.currency {
            tracing::error!(%product, %currency, shop = %self.currency, "product in foreign currency");
            return Err(PriceError::CurrencyMismatch {
                expected: self.currency,
                found: currency,
            }
            .into());
        }
        Ok(found)
    }

    /// Add `quantity` units of `product`, incrementing an existing line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ProductNotFound` if the product does not exist or
    /// is retired.
    #[instrument(skip(self))]
    pub async fn add(
        &self,
        cart: CartId,
        product: ProductId,
        quantity: Quantity,
    ) -> Result<LineItem, CartError> {
        self.available_product(product).await?;

        self.store
            .increment_line_item(cart, product, quantity)
            .await
            .map_err(|e| not_found_as_product(e, product))
    }

    /// Set the quantity of `product`. Zero or negative removes the line.
    ///
    /// Returns the line after the change, or `None` if it was removed (or
    /// never existed).
    ///
    /// # Errors
    ///
    /// Returns `CartError::ProductNotFound` when a positive quantity names a
    /// product that is not in the cart and cannot be added.
    #[instrument(skip(self))]
    pub async fn set_quantity(
        &self,
        cart: CartId,
        product: ProductId,
        quantity: i64,
    ) -> Result<Option<LineItem>, CartError> {
        let Some(quantity) = Quantity::from_signed(quantity) else {
            self.remove(cart, product).await?;
            return Ok(None);
        };

        let present = self
            .store
            .line_items(cart)
            .await?
            .iter()
            .any(|line| line.product_id == product);
        if !present {
            self.available_product(product).await?;
        }

        let line = self
            .store
            .set_line_item_quantity(cart, product, quantity)
            .await
            .map_err(|e| not_found_as_product(e, product))?;
        Ok(Some(line))
    }

    /// Remove the line for `product`. Removing an absent line is not an error.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store fails.
    #[instrument(skip(self))]
    pub async fn remove(&self, cart: CartId, product: ProductId) -> Result<bool, CartError> {
        Ok(self.store.delete_line_item(cart, product).await?)
    }

    /// Remove a retired product from every cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store fails.
    #[instrument(skip(self))]
    pub async fn purge_retired(&self, product: ProductId) -> Result<u64, CartError> {
        let purged = self.store.delete_line_items_for_product(product).await?;
        tracing::info!(%product, purged, "purged retired product from carts");
        Ok(purged)
    }

    /// Line items of `cart` with their products, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store fails.
    pub async fn lines(&self, cart: CartId) -> Result<Vec<CartLine>, CartError> {
        let items = self.store.line_items(cart).await?;
        let mut lines = Vec::with_capacity(items.len());

        for item in items {
            match self.store.find_product(item.product_id).await? {
                Some(product) => lines.push(CartLine { item, product }),
                None => tracing::warn!(product = %item.product_id, "line item without product"),
            }
        }

        Ok(lines)
    }

    /// Effective unit price times quantity for one line.
    #[must_use]
    pub fn subtotal(line: &CartLine, as_of: DateTime<Utc>) -> Price {
        line.subtotal(as_of)
    }

    /// Sum of line subtotals at `as_of`.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store fails.
    pub async fn total(&self, cart: CartId, as_of: DateTime<Utc>) -> Result<Price, CartError> {
        let lines = self.lines(cart).await?;
        Ok(cart::total(&lines, self.currency, as_of)?)
    }

    /// Lines, total and item count of a cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store fails.
    pub async fn summary(&self, cart: Cart, as_of: DateTime<Utc>) -> Result<CartSummary, CartError> {
        let lines = self.lines(cart.id).await?;
        Ok(CartSummary {
            total: cart::total(&lines, self.currency, as_of)?,
            item_count: cart::item_count(&lines),
            cart,
            lines,
            as_of,
        })
    }
}

fn not_found_as_product(err: RepositoryError, product: ProductId) -> CartError {
    match err {
        RepositoryError::NotFound => CartError::ProductNotFound(product),
        other => CartError::Repository(other),
    }
}
