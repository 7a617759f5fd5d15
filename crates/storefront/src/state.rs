//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::db::PgStore;
use crate::services::{AuthService, CartService, CatalogService};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    carts: CartService<PgStore>,
    catalog: CatalogService<PgStore>,
    auth: AuthService<PgStore>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `pool` - `PostgreSQL` connection pool
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Self {
        let store = Arc::new(PgStore::new(pool.clone(), config.currency));
        let carts = CartService::new(Arc::clone(&store), config.currency);
        let catalog = CatalogService::new(Arc::clone(&store), carts.clone());
        let auth = AuthService::new(store);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                carts,
                catalog,
                auth,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Cart resolution and line-item operations.
    #[must_use]
    pub fn carts(&self) -> &CartService<PgStore> {
        &self.inner.carts
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogService<PgStore> {
        &self.inner.catalog
    }

    #[must_use]
    pub fn auth(&self) -> &AuthService<PgStore> {
        &self.inner.auth
    }
}
