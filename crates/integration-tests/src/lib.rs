//! Integration tests for Tuckshop.
//!
//! Drives the storefront services over the in-memory store the way the HTTP
//! handlers do: every "request" resolves the active cart from a [`Visitor`]'s
//! session state before touching it.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p tuckshop-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use tuckshop_core::{
    Cart, CartId, CurrencyCode, NewProduct, NewSale, Percentage, ProductId, SaleId, UserId,
};
use tuckshop_storefront::db::{CartStore, MemoryStore};
use tuckshop_storefront::services::{
    AuthError, AuthService, CartError, CartService, CatalogError, CatalogService,
};

/// A shop backed by a fresh [`MemoryStore`].
pub struct TestShop {
    pub store: Arc<MemoryStore>,
    pub carts: CartService<MemoryStore>,
    pub catalog: CatalogService<MemoryStore>,
    pub auth: AuthService<MemoryStore>,
}

impl Default for TestShop {
    fn default() -> Self {
        Self::new()
    }
}

impl TestShop {
    #[must_use]
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new(CurrencyCode::USD));
        let carts = CartService::new(Arc::clone(&store), CurrencyCode::USD);
        let catalog = CatalogService::new(Arc::clone(&store), carts.clone());
        let auth = AuthService::new(Arc::clone(&store));

        Self {
            store,
            carts,
            catalog,
            auth,
        }
    }

    /// Create a product priced in whole dollars.
    ///
    /// # Errors
    ///
    /// Returns the catalog error if the product is rejected.
    pub async fn product(&self, title: &str, dollars: i64) -> Result<ProductId, CatalogError> {
        self.product_with_sale(title, dollars, None).await
    }

    /// Create a product attached to `sale`.
    ///
    /// # Errors
    ///
    /// Returns the catalog error if the product is rejected.
    pub async fn product_with_sale(
        &self,
        title: &str,
        dollars: i64,
        sale: Option<SaleId>,
    ) -> Result<ProductId, CatalogError> {
        let product = self
            .catalog
            .create(NewProduct {
                title: title.to_string(),
                description: None,
                price: Decimal::from(dollars),
                sale_id: sale,
            })
            .await?;
        Ok(product.id)
    }

    /// Create a sale ending at `ends_at`.
    ///
    /// # Errors
    ///
    /// Returns the catalog error if the store fails.
    pub async fn sale(
        &self,
        percentage: Percentage,
        ends_at: DateTime<Utc>,
    ) -> Result<SaleId, CatalogError> {
        let sale = self
            .catalog
            .create_sale(NewSale {
                percentage,
                ends_at,
            })
            .await?;
        Ok(sale.id)
    }

    /// Register a customer and return their id.
    ///
    /// # Errors
    ///
    /// Returns the auth error if registration fails.
    pub async fn customer(&self, email: &str) -> Result<UserId, AuthError> {
        let user = self.auth.register(email, PASSWORD, PASSWORD).await?;
        Ok(user.id)
    }

    /// Whether a cart with `id` is still stored.
    pub async fn cart_exists(&self, id: CartId) -> bool {
        matches!(self.store.find_cart(id).await, Ok(Some(_)))
    }
}

/// Password every test customer registers with.
pub const PASSWORD: &str = "tuckshop-password";

/// One browser: the session's cart id and logged-in user.
#[derive(Debug, Default, Clone, Copy)]
pub struct Visitor {
    pub cart_id: Option<CartId>,
    pub user: Option<UserId>,
}

impl Visitor {
    /// Resolve the active cart and store its id in the session.
    ///
    /// # Errors
    ///
    /// Returns the cart error if the store fails.
    pub async fn visit(&mut self, shop: &TestShop) -> Result<Cart, CartError> {
        let cart = shop.carts.resolve(self.cart_id, self.user).await?;
        self.cart_id = Some(cart.id);
        Ok(cart)
    }

    /// Log in and resolve the cart, merging the session cart.
    ///
    /// # Errors
    ///
    /// Returns the cart error if the store fails.
    pub async fn log_in(&mut self, shop: &TestShop, user: UserId) -> Result<Cart, CartError> {
        self.user = Some(user);
        self.visit(shop).await
    }

    /// Flush the session.
    pub fn log_out(&mut self) {
        *self = Self::default();
    }
}

/// End time for sales that stay active for the whole test run.
#[must_use]
pub fn far_future() -> DateTime<Utc> {
    Utc::now() + Duration::days(365)
}
