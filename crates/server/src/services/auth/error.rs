//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during sign-up, login and link verification.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] ez_apps_core::EmailError),

    /// A profile with this email already exists.
    #[error("an account with this email already exists")]
    EmailTaken,

    /// No profile with this email.
    #[error("profile not found")]
    ProfileNotFound,

    /// Unknown, expired or already-used magic link.
    #[error("invalid or expired link")]
    InvalidToken,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}
