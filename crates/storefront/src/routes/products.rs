//! Product route handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::instrument;

use tuckshop_core::{Percentage, Price, Product, ProductId};

use crate::error::Result;
use crate::state::AppState;

/// Product display data.
#[derive(Debug, Clone, Serialize)]
pub struct ProductView {
    pub id: ProductId,
    pub title: String,
    pub description: Option<String>,
    /// Base price before any sale.
    pub price: Price,
    /// Price charged right now.
    pub effective_price: Price,
    pub sale: Option<SaleView>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SaleView {
    pub percentage: Percentage,
    pub ends_at: DateTime<Utc>,
}

impl ProductView {
    /// Render `product` as priced at `as_of`.
    #[must_use]
    pub fn new(product: &Product, as_of: DateTime<Utc>) -> Self {
        Self {
            id: product.id,
            title: product.title.clone(),
            description: product.description.clone(),
            price: product.price,
            effective_price: product.effective_price(as_of),
            sale: product.active_sale(as_of).map(|sale| SaleView {
                percentage: sale.percentage,
                ends_at: sale.ends_at,
            }),
        }
    }
}

/// List available products.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<ProductView>>> {
    let now = Utc::now();
    let products = state.catalog().list().await?;

    Ok(Json(
        products.iter().map(|p| ProductView::new(p, now)).collect(),
    ))
}

/// Show one available product.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductView>> {
    let product = state.catalog().show(id).await?;
    Ok(Json(ProductView::new(&product, Utc::now())))
}
