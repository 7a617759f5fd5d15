//! Authentication route handlers.
//!
//! Logging in (or registering, which logs in) hands the visitor's session
//! cart to the cart resolver so it is adopted or merged into the user's cart.

use axum::{
    Form, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use tuckshop_core::CartId;

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{
    ActiveCart, RequireAuth, get_cart_id, set_cart_id, set_current_user,
};
use crate::models::{CurrentUser, User};
use crate::state::AppState;

/// Login form data.
#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Registration form data.
#[derive(Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

/// Response after a successful login or registration.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub user: CurrentUser,
    /// The user's cart after any merge.
    pub cart_id: CartId,
}

/// Store `user` in the session and attach the session cart to them.
async fn sign_in(state: &AppState, session: &Session, user: &User) -> Result<SessionView> {
    let session_cart = get_cart_id(session).await;

    // New session id on privilege change
    session.cycle_id().await?;

    let current = CurrentUser::from(user);
    set_current_user(session, &current).await?;

    let cart = state.carts().resolve(session_cart, Some(user.id)).await?;
    set_cart_id(session, cart.id).await?;

    set_sentry_user(&user.id, Some(user.email.as_str()));

    Ok(SessionView {
        user: current,
        cart_id: cart.id,
    })
}

/// Handle login form submission.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Json<SessionView>> {
    let user = state
        .auth()
        .login(&form.email, &form.password)
        .await
        .inspect_err(|e| tracing::warn!(error = %e, "Login failed"))?;

    Ok(Json(sign_in(&state, &session, &user).await?))
}

/// Handle registration form submission. The new user is logged in.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    let user = state
        .auth()
        .register(&form.email, &form.password, &form.password_confirm)
        .await
        .inspect_err(|e| tracing::warn!(error = %e, "Registration failed"))?;

    let view = sign_in(&state, &session, &user).await?;
    Ok((StatusCode::CREATED, Json(view)).into_response())
}

/// The logged-in user and their active cart.
///
/// Authentication is checked before the cart is resolved, so anonymous
/// visitors get a 401 without a cart being created for them.
pub async fn me(
    RequireAuth(user): RequireAuth,
    ActiveCart(cart): ActiveCart,
) -> Json<SessionView> {
    Json(SessionView {
        user,
        cart_id: cart.id,
    })
}

/// Handle logout.
///
/// Destroys the whole session, so the next visit starts a new anonymous cart.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> StatusCode {
    if let Err(e) = session.flush().await {
        tracing::error!("Failed to flush session: {}", e);
    }
    clear_sentry_user();

    StatusCode::NO_CONTENT
}
