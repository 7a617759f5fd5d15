//! Administrator catalog actions.
//!
//! Every handler takes [`RequireAdmin`], so non-admins get 403.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::Serialize;
use tracing::instrument;

use tuckshop_core::{NewProduct, NewSale, ProductId, ProductUpdate, Sale};

use super::products::ProductView;
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// Response after retiring a product.
#[derive(Debug, Serialize)]
pub struct RetirementView {
    pub product: ProductView,
    pub retired_at: Option<chrono::DateTime<Utc>>,
    /// Cart lines removed by the retirement.
    pub purged_lines: u64,
}

/// Create a product.
#[instrument(skip(state, admin), fields(admin = %admin.id))]
pub async fn create_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<NewProduct>,
) -> Result<(StatusCode, Json<ProductView>)> {
    let product = state.catalog().create(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(ProductView::new(&product, Utc::now())),
    ))
}

/// Update a product's listed fields.
#[instrument(skip(state, admin), fields(admin = %admin.id))]
pub async fn update_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
    Json(update): Json<ProductUpdate>,
) -> Result<Json<ProductView>> {
    let product = state.catalog().update(id, update).await?;
    Ok(Json(ProductView::new(&product, Utc::now())))
}

/// Retire a product and purge it from every cart.
#[instrument(skip(state, admin), fields(admin = %admin.id))]
pub async fn retire_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<Json<RetirementView>> {
    let retirement = state.catalog().retire(id).await?;

    Ok(Json(RetirementView {
        product: ProductView::new(&retirement.product, Utc::now()),
        retired_at: retirement.product.retired_at,
        purged_lines: retirement.purged_lines,
    }))
}

/// Create a sale.
#[instrument(skip(state, admin), fields(admin = %admin.id))]
pub async fn create_sale(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<NewSale>,
) -> Result<(StatusCode, Json<Sale>)> {
    let sale = state.catalog().create_sale(input).await?;
    Ok((StatusCode::CREATED, Json(sale)))
}
