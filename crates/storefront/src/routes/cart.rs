//! Cart route handlers.
//!
//! Every handler works on the [`ActiveCart`] resolved for the request and
//! answers with the cart as it stands after the change.

use axum::{Form, Json, extract::State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::instrument;

use tuckshop_core::{CartId, CartLine, Price, ProductId, Quantity};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::ActiveCart;
use crate::services::CartSummary;
use crate::state::AppState;

/// Cart line display data.
#[derive(Debug, Clone, Serialize)]
pub struct CartItemView {
    pub product_id: ProductId,
    pub title: String,
    pub quantity: Quantity,
    pub unit_price: Price,
    pub subtotal: Price,
}

/// Cart display data.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub id: CartId,
    pub items: Vec<CartItemView>,
    pub total: Price,
    pub item_count: u64,
}

impl CartItemView {
    fn new(line: &CartLine, as_of: DateTime<Utc>) -> Self {
        Self {
            product_id: line.product.id,
            title: line.product.title.clone(),
            quantity: line.item.quantity,
            unit_price: line.unit_price(as_of),
            subtotal: line.subtotal(as_of),
        }
    }
}

impl From<&CartSummary> for CartView {
    fn from(summary: &CartSummary) -> Self {
        Self {
            id: summary.cart.id,
            items: summary
                .lines
                .iter()
                .map(|line| CartItemView::new(line, summary.as_of))
                .collect(),
            total: summary.total,
            item_count: summary.item_count,
        }
    }
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: ProductId,
    pub quantity: Option<u32>,
}

/// Update cart form data. Zero or negative removes the line.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: ProductId,
}

async fn view(state: &AppState, cart: tuckshop_core::Cart) -> Result<Json<CartView>> {
    let summary = state.carts().summary(cart, Utc::now()).await?;
    Ok(Json(CartView::from(&summary)))
}

/// Show the cart.
#[instrument(skip(state, cart), fields(cart = %cart.id))]
pub async fn show(
    State(state): State<AppState>,
    ActiveCart(cart): ActiveCart,
) -> Result<Json<CartView>> {
    view(&state, cart).await
}

/// Add a product, incrementing an existing line.
#[instrument(skip(state, cart), fields(cart = %cart.id))]
pub async fn add(
    State(state): State<AppState>,
    ActiveCart(cart): ActiveCart,
    Form(form): Form<AddToCartForm>,
) -> Result<Json<CartView>> {
    let quantity = Quantity::new(form.quantity.unwrap_or(1))
        .ok_or_else(|| AppError::BadRequest("quantity must be at least 1".to_string()))?;

    state.carts().add(cart.id, form.product_id, quantity).await?;
    let product_id = form.product_id.to_string();
    add_breadcrumb("cart", "Added product", Some(&[("product_id", product_id.as_str())]));

    view(&state, cart).await
}

/// Set a line's quantity.
#[instrument(skip(state, cart), fields(cart = %cart.id))]
pub async fn update(
    State(state): State<AppState>,
    ActiveCart(cart): ActiveCart,
    Form(form): Form<UpdateCartForm>,
) -> Result<Json<CartView>> {
    state
        .carts()
        .set_quantity(cart.id, form.product_id, form.quantity)
        .await?;

    view(&state, cart).await
}

/// Remove a line.
#[instrument(skip(state, cart), fields(cart = %cart.id))]
pub async fn remove(
    State(state): State<AppState>,
    ActiveCart(cart): ActiveCart,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Json<CartView>> {
    state.carts().remove(cart.id, form.product_id).await?;
    view(&state, cart).await
}

/// Number of units in the cart.
#[instrument(skip(state, cart), fields(cart = %cart.id))]
pub async fn count(
    State(state): State<AppState>,
    ActiveCart(cart): ActiveCart,
) -> Result<Json<Value>> {
    let summary = state.carts().summary(cart, Utc::now()).await?;
    Ok(Json(json!({ "count": summary.item_count })))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::Duration;
    use rust_decimal::Decimal;

    use tuckshop_core::{
        Cart, CartOwner, CurrencyCode, LineItem, LineItemId, Percentage, Product, Sale, SaleId,
        cart,
    };

    use super::*;

    fn line(title: &str, price: i64, quantity: u32, sale: Option<Sale>) -> CartLine {
        let now = Utc::now();
        let product_id = ProductId::new(price.try_into().unwrap());
        CartLine {
            item: LineItem {
                id: LineItemId::new(1),
                cart_id: CartId::new(1),
                product_id,
                quantity: Quantity::new(quantity).unwrap(),
                added_at: now,
            },
            product: Product {
                id: product_id,
                title: title.to_string(),
                description: None,
                price: Price::new(Decimal::from(price), CurrencyCode::USD).unwrap(),
                sale,
                retired_at: None,
                created_at: now,
                updated_at: now,
            },
        }
    }

    #[test]
    fn test_cart_view_prices_lines() {
        let now = Utc::now();
        let sale = Sale {
            id: SaleId::new(1),
            percentage: Percentage::new(50).unwrap(),
            ends_at: now + Duration::days(1),
        };
        let lines = vec![line("Cola", 10, 2, None), line("Crisps", 100, 1, Some(sale))];
        let summary = CartSummary {
            cart: Cart {
                id: CartId::new(1),
                owner: CartOwner::Anonymous,
                created_at: now,
            },
            total: cart::total(&lines, CurrencyCode::USD, now).unwrap(),
            item_count: cart::item_count(&lines),
            lines,
            as_of: now,
        };

        let view = CartView::from(&summary);
        assert_eq!(view.items.len(), 2);
        assert_eq!(view.items[0].subtotal.to_string(), "$20.00");
        assert_eq!(view.items[1].unit_price.to_string(), "$50.00");
        assert_eq!(view.total.to_string(), "$70.00");
        assert_eq!(view.item_count, 3);
    }
}
