//! Active cart extractor.
//!
//! Resolves the request's cart from the session cart id and the logged-in
//! user, then stores the resolved id back in the session.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use tuckshop_core::{Cart, CartId};

use super::auth::session_user;
use crate::error::AppError;
use crate::models::session_keys;
use crate::state::AppState;

/// The cart for this request, created on first use.
///
/// # Example
///
/// ```rust,ignore
/// async fn cart_count(
///     State(state): State<AppState>,
///     ActiveCart(cart): ActiveCart,
/// ) -> Result<Json<u64>> { ... }
/// ```
pub struct ActiveCart(pub Cart);

/// Get the cart ID from the session.
pub async fn get_cart_id(session: &Session) -> Option<CartId> {
    session
        .get::<CartId>(session_keys::CART_ID)
        .await
        .ok()
        .flatten()
}

/// Set the cart ID in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_cart_id(
    session: &Session,
    cart_id: CartId,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CART_ID, cart_id).await
}

impl FromRequestParts<AppState> for ActiveCart {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("session layer missing".to_string()))?;
        let user = session_user(parts).await;

        let session_cart = get_cart_id(&session).await;
        let cart = state
            .carts()
            .resolve(session_cart, user.as_ref().map(|u| u.id))
            .await?;

        if session_cart != Some(cart.id) {
            set_cart_id(&session, cart.id).await?;
        }

        Ok(Self(cart))
    }
}
