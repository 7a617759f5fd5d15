//! Handler error type.
//!
//! Every handler returns [`Result`]. Service errors convert into [`AppError`]
//! with `?`; the response is a JSON body `{"error": "..."}` whose status
//! follows the service error. Server-side failures are reported to Sentry
//! and answered with a generic message.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::services::{AuthError, CartError, CatalogError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("session store: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Input a handler rejected before reaching a service.
    #[error("{0}")]
    BadRequest(String),

    #[error("internal: {0}")]
    Internal(String),
}

impl AppError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Cart(CartError::ProductNotFound(_))
            | Self::Catalog(CatalogError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Catalog(CatalogError::SaleNotFound(_) | CatalogError::Validation(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Auth(AuthError::InvalidCredentials) => StatusCode::UNAUTHORIZED,
            Self::Auth(AuthError::UserAlreadyExists) => StatusCode::CONFLICT,
            Self::Auth(err) if err.is_rejected_input() => StatusCode::BAD_REQUEST,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Cart(CartError::Repository(_) | CartError::Pricing(_))
            | Self::Catalog(CatalogError::Repository(_))
            | Self::Auth(_)
            | Self::Session(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the client. Server errors never leak their cause.
    fn public_message(&self) -> String {
        if self.status().is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(error = %self, sentry_event_id = %event_id, "request failed");
        } else {
            tracing::debug!(error = %self, %status, "request rejected");
        }

        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Attach the logged-in user to subsequent Sentry events.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| scope.set_user(None));
}

/// Record a cart action so error reports show what the visitor did before.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data.unwrap_or_default() {
        breadcrumb
            .data
            .insert((*key).to_string(), serde_json::Value::from(*value));
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use tuckshop_core::{CurrencyCode, PriceError, ProductId, SaleId, ValidationError};

    use super::*;
    use crate::db::RepositoryError;

    fn status_of(err: impl Into<AppError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn test_cart_and_catalog_statuses() {
        assert_eq!(
            status_of(CartError::ProductNotFound(ProductId::new(1))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(CatalogError::NotFound(ProductId::new(1))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(CatalogError::SaleNotFound(SaleId::new(9))),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(CatalogError::Validation(ValidationError::EmptyTitle)),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(CartError::Repository(RepositoryError::NotFound)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(CartError::Pricing(PriceError::CurrencyMismatch {
                expected: CurrencyCode::USD,
                found: CurrencyCode::EUR,
            })),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_auth_statuses() {
        assert_eq!(status_of(AuthError::InvalidCredentials), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(AuthError::UserAlreadyExists), StatusCode::CONFLICT);
        assert_eq!(status_of(AuthError::PasswordMismatch), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(AuthError::WeakPassword("short".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_of(AuthError::PasswordHash), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_bad_request_message_is_shown() {
        let err = AppError::BadRequest("quantity must be at least 1".to_string());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.public_message(), "quantity must be at least 1");
    }

    #[test]
    fn test_internal_details_hidden() {
        let err = AppError::Cart(CartError::Repository(RepositoryError::DataCorruption(
            "line 7 has quantity 0".to_string(),
        )));
        assert_eq!(err.public_message(), "Internal server error");

        let err = AppError::Internal("session layer missing".to_string());
        assert_eq!(err.public_message(), "Internal server error");

        let err = AppError::Auth(AuthError::InvalidCredentials);
        assert_eq!(err.public_message(), "invalid email or password");
    }
}
