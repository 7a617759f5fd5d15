//! Admin user management commands.

use std::sync::Arc;

use tuckshop_core::CurrencyCode;
use tuckshop_storefront::config::database_url_from_env;
use tuckshop_storefront::db::{self, PgStore};
use tuckshop_storefront::services::AuthService;

/// Create a new administrator.
///
/// # Errors
///
/// Returns an error if the database is unreachable, the email is invalid or
/// taken, or the password is too short.
pub async fn create_user(email: &str, password: &str) -> Result<(), Box<dyn std::error::Error>> {
    let database_url = database_url_from_env()?;

    tracing::info!("Connecting to storefront database...");
    let pool = db::create_pool(&database_url).await?;

    // Currency only matters for product writes
    let store = Arc::new(PgStore::new(pool, CurrencyCode::default()));
    let user = AuthService::new(store).create_admin(email, password).await?;

    tracing::info!(
        "Admin user created successfully! ID: {}, Email: {}",
        user.id,
        user.email
    );
    Ok(())
}
