//! Catalog browsing and administration.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::instrument;

use tuckshop_core::{
    NewProduct, NewSale, Product, ProductId, ProductUpdate, Sale, SaleId, ValidationError,
};

use super::cart::{CartError, CartService};
use crate::db::{CartStore, Catalog, RepositoryError};

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// No such product, or it has been retired.
    #[error("product {0} not found")]
    NotFound(ProductId),

    /// A referenced sale does not exist.
    #[error("sale {0} not found")]
    SaleNotFound(SaleId),

    /// Input failed validation.
    #[error("invalid product: {0}")]
    Validation(#[from] ValidationError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<CartError> for CatalogError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::ProductNotFound(id) => Self::NotFound(id),
            CartError::Repository(e) => Self::Repository(e),
        }
    }
}

/// Result of retiring a product.
#[derive(Debug, Clone)]
pub struct Retirement {
    pub product: Product,
    /// Line items removed from carts.
    pub purged_lines: u64,
}

/// Product listing and admin changes.
pub struct CatalogService<S: ?Sized> {
    store: Arc<S>,
    carts: CartService<S>,
}

impl<S: ?Sized> Clone for CatalogService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            carts: self.carts.clone(),
        }
    }
}

impl<S> CatalogService<S>
where
    S: CartStore + Catalog + ?Sized,
{
    #[must_use]
    pub const fn new(store: Arc<S>, carts: CartService<S>) -> Self {
        Self { store, carts }
    }

    /// Products available for sale, by title.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn list(&self) -> Result<Vec<Product>, CatalogError> {
        Ok(self.store.list_products().await?)
    }

    /// A product that is available for sale.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` for missing and retired products.
    pub async fn show(&self, id: ProductId) -> Result<Product, CatalogError> {
        self.store
            .find_product(id)
            .await?
            .filter(|product| !product.is_retired())
            .ok_or(CatalogError::NotFound(id))
    }

    async fn ensure_sale(&self, id: Option<SaleId>) -> Result<(), CatalogError> {
        if let Some(id) = id
            && self.store.find_sale(id).await?.is_none()
        {
            return Err(CatalogError::SaleNotFound(id));
        }
        Ok(())
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` for invalid input and
    /// `CatalogError::SaleNotFound` for a dangling sale reference.
    #[instrument(skip(self), fields(title = %input.title))]
    pub async fn create(&self, input: NewProduct) -> Result<Product, CatalogError> {
        input.validate()?;
        self.ensure_sale(input.sale_id).await?;

        let product = self.store.create_product(&input).await?;
        tracing::info!(product = %product.id, "product created");
        Ok(product)
    }

    /// Update the fields listed in `update`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the product does not exist,
    /// `CatalogError::Validation` for invalid input and
    /// `CatalogError::SaleNotFound` for a dangling sale reference.
    #[instrument(skip(self))]
    pub async fn update(
        &self,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<Product, CatalogError> {
        update.validate()?;
        self.ensure_sale(update.sale_id).await?;

        self.store
            .update_product(id, &update)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => CatalogError::NotFound(id),
                other => CatalogError::Repository(other),
            })
    }

    /// Retire a product and remove it from every cart.
    ///
    /// Retiring an already retired product purges again and otherwise
    /// changes nothing.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the product does not exist.
    #[instrument(skip(self))]
    pub async fn retire(&self, id: ProductId) -> Result<Retirement, CatalogError> {
        let product = self
            .store
            .retire_product(id, Utc::now())
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => CatalogError::NotFound(id),
                other => CatalogError::Repository(other),
            })?;

        let purged_lines = self.carts.purge_retired(id).await?;
        tracing::info!(product = %id, purged_lines, "product retired");

        Ok(Retirement {
            product,
            purged_lines,
        })
    }

    /// Create a sale.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    #[instrument(skip(self))]
    pub async fn create_sale(&self, input: NewSale) -> Result<Sale, CatalogError> {
        let sale = self.store.create_sale(&input).await?;
        tracing::info!(sale = %sale.id, percentage = %sale.percentage, "sale created");
        Ok(sale)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;
    use rust_decimal::Decimal;

    use tuckshop_core::{CartOwner, CurrencyCode, Percentage, Quantity};

    use super::*;
    use crate::db::MemoryStore;

    fn setup() -> (Arc<MemoryStore>, CatalogService<MemoryStore>) {
        let store = Arc::new(MemoryStore::default());
        let carts = CartService::new(Arc::clone(&store), CurrencyCode::USD);
        (Arc::clone(&store), CatalogService::new(store, carts))
    }

    fn mango() -> NewProduct {
        NewProduct {
            title: "Mango".to_owned(),
            description: Some("Ripe".to_owned()),
            price: Decimal::from(100),
            sale_id: None,
        }
    }

    #[tokio::test]
    async fn test_create_validates() {
        let (_, catalog) = setup();
        let mut input = mango();
        input.title = String::new();
        assert!(matches!(
            catalog.create(input).await,
            Err(CatalogError::Validation(ValidationError::EmptyTitle))
        ));

        let mut input = mango();
        input.sale_id = Some(SaleId::new(77));
        assert!(matches!(
            catalog.create(input).await,
            Err(CatalogError::SaleNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_attaches_sale() {
        let (_, catalog) = setup();
        let product = catalog.create(mango()).await.unwrap();
        let sale = catalog
            .create_sale(NewSale {
                percentage: Percentage::new(50).unwrap(),
                ends_at: Utc::now() + Duration::days(16),
            })
            .await
            .unwrap();

        let updated = catalog
            .update(
                product.id,
                ProductUpdate {
                    sale_id: Some(sale.id),
                    ..ProductUpdate::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.effective_price(Utc::now()).to_string(), "$50.00");
        assert!(matches!(
            catalog.update(ProductId::new(999), ProductUpdate {
                title: Some("x".to_owned()),
                ..ProductUpdate::default()
            })
            .await,
            Err(CatalogError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_retire_purges_carts_and_hides_product() {
        let (store, catalog) = setup();
        let product = catalog.create(mango()).await.unwrap();
        let cart = store.create_cart(CartOwner::Anonymous).await.unwrap();
        store
            .increment_line_item(cart.id, product.id, Quantity::ONE)
            .await
            .unwrap();

        let retirement = catalog.retire(product.id).await.unwrap();
        assert_eq!(retirement.purged_lines, 1);
        assert!(retirement.product.is_retired());
        assert!(store.line_items(cart.id).await.unwrap().is_empty());
        assert!(catalog.list().await.unwrap().is_empty());
        assert!(matches!(
            catalog.show(product.id).await,
            Err(CatalogError::NotFound(_))
        ));

        let again = catalog.retire(product.id).await.unwrap();
        assert_eq!(again.purged_lines, 0);
        assert_eq!(again.product.retired_at, retirement.product.retired_at);
    }
}
