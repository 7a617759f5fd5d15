//! Session layer.
//!
//! A session holds at most two values: the id of the visitor's active cart
//! and the logged-in user (see [`crate::models::session_keys`]). Both live in
//! the `tower_sessions` table, which `tuck-cli migrate` creates.

use sqlx::PgPool;
use tower_sessions::cookie::{SameSite, time::Duration};
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::StorefrontConfig;

pub const SESSION_COOKIE_NAME: &str = "tuck_session";

/// Idle time after which a session, and with it an anonymous cart id, is forgotten.
pub const SESSION_IDLE_TIMEOUT: Duration = Duration::days(7);

/// Build the session layer over the shared pool.
///
/// The cookie is only marked `Secure` when the shop is served over https so
/// local development over plain http keeps its cart.
#[must_use]
pub fn create_session_layer(
    pool: &PgPool,
    config: &StorefrontConfig,
) -> SessionManagerLayer<PostgresStore> {
    SessionManagerLayer::new(PostgresStore::new(pool.clone()))
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(SESSION_IDLE_TIMEOUT))
        .with_secure(config.is_https())
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
