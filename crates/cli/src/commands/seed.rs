//! Seed the catalog from a YAML file.
//!
//! ```yaml
//! sales:
//!   - key: summer
//!     percentage: 25
//!     ends_at: 2030-09-01T00:00:00Z
//! products:
//!   - title: Lemonade
//!     description: Freshly squeezed
//!     price: "2.50"
//!     sale: summer       # optional, refers to a sale key
//! ```
//!
//! Products go through the same validation as the admin API and are priced
//! in the shop currency (`STOREFRONT_CURRENCY`), the same one the storefront
//! totals carts in.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use tuckshop_core::{NewProduct, NewSale, Percentage, SaleId};
use tuckshop_storefront::config::{currency_from_env, database_url_from_env};
use tuckshop_storefront::db::{self, PgStore};
use tuckshop_storefront::services::{CartService, CatalogService};

/// Contents of a seed file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedFile {
    #[serde(default)]
    pub sales: Vec<SeedSale>,
    #[serde(default)]
    pub products: Vec<SeedProduct>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedSale {
    /// Name products use to refer to this sale.
    pub key: String,
    pub percentage: Percentage,
    pub ends_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedProduct {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    /// Key of a sale in the same file.
    #[serde(default)]
    pub sale: Option<String>,
}

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("sale key {0:?} is defined twice")]
    DuplicateSale(String),

    #[error("product {title:?} refers to unknown sale {sale:?}")]
    UnknownSale { title: String, sale: String },
}

impl SeedFile {
    /// Check sale references before anything is written.
    ///
    /// # Errors
    ///
    /// Returns the first duplicate or dangling sale key.
    pub fn validate(&self) -> Result<(), SeedError> {
        let mut keys = HashSet::new();
        for sale in &self.sales {
            if !keys.insert(sale.key.as_str()) {
                return Err(SeedError::DuplicateSale(sale.key.clone()));
            }
        }

        for product in &self.products {
            if let Some(sale) = &product.sale
                && !keys.contains(sale.as_str())
            {
                return Err(SeedError::UnknownSale {
                    title: product.title.clone(),
                    sale: sale.clone(),
                });
            }
        }

        Ok(())
    }
}

/// Seed sales and products from `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, references are
/// invalid, or a database write fails.
pub async fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    info!(path = %path.display(), "Loading seed file");
    let content = tokio::fs::read_to_string(path).await?;
    let seed: SeedFile = serde_yaml::from_str(&content)?;
    seed.validate()?;

    let currency = currency_from_env()?;
    let database_url = database_url_from_env()?;
    let pool = db::create_pool(&database_url).await?;
    info!(%currency, "Connected to database");

    let store = Arc::new(PgStore::new(pool, currency));
    let carts = CartService::new(Arc::clone(&store), currency);
    let catalog = CatalogService::new(store, carts);

    let mut sale_ids: HashMap<&str, SaleId> = HashMap::new();
    for sale in &seed.sales {
        let created = catalog
            .create_sale(NewSale {
                percentage: sale.percentage,
                ends_at: sale.ends_at,
            })
            .await?;
        sale_ids.insert(sale.key.as_str(), created.id);
    }

    for product in &seed.products {
        let created = catalog
            .create(NewProduct {
                title: product.title.clone(),
                description: product.description.clone(),
                price: product.price,
                sale_id: product
                    .sale
                    .as_deref()
                    .and_then(|key| sale_ids.get(key).copied()),
            })
            .await?;
        info!(id = %created.id, title = %created.title, "Product created");
    }

    info!(
        sales = seed.sales.len(),
        products = seed.products.len(),
        "Seeding complete!"
    );
    Ok(())
}
