//! Account errors.

use thiserror::Error;

use tuckshop_core::EmailError;

use crate::db::RepositoryError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Unknown email or wrong password. The two are not distinguished.
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("an account with this email already exists")]
    UserAlreadyExists,

    #[error("password rejected: {0}")]
    WeakPassword(String),

    #[error("password and confirmation do not match")]
    PasswordMismatch,

    #[error("account store error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("password hashing failed")]
    PasswordHash,
}

impl AuthError {
    /// True when the visitor can fix the problem by changing their input.
    #[must_use]
    pub const fn is_rejected_input(&self) -> bool {
        matches!(
            self,
            Self::InvalidEmail(_)
                | Self::InvalidCredentials
                | Self::UserAlreadyExists
                | Self::WeakPassword(_)
                | Self::PasswordMismatch
        )
    }
}
