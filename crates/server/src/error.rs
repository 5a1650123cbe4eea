//! Unified error handling for the API.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::{AuthError, EmailError, SyncError};
use crate::shopify::ShopifyError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(RepositoryError),

    /// Shopify API operation failed.
    #[error("Shopify error: {0}")]
    Shopify(#[from] ShopifyError),

    /// Sending email failed.
    #[error("Email error: {0}")]
    Email(#[from] EmailError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Request conflicts with current state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound("resource".to_string()),
            RepositoryError::Conflict(msg) => Self::Conflict(msg),
            other => Self::Database(other),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidEmail(e) => Self::BadRequest(e.to_string()),
            AuthError::EmailTaken => Self::Conflict(err.to_string()),
            AuthError::ProfileNotFound => Self::NotFound("profile".to_string()),
            AuthError::InvalidToken => Self::Unauthorized(err.to_string()),
            AuthError::Repository(e) => e.into(),
        }
    }
}

impl From<SyncError> for AppError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::NotConnected(_) | SyncError::Revoked(_) => Self::Conflict(err.to_string()),
            SyncError::Shopify(e) => Self::Shopify(e),
            SyncError::Repository(e) => e.into(),
        }
    }
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Email(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Shopify(_) => StatusCode::BAD_GATEWAY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log server errors with Sentry
        if matches!(
            self,
            Self::Database(_) | Self::Internal(_) | Self::Shopify(_) | Self::Email(_)
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Database(_) | Self::Internal(_) | Self::Email(_) => {
                "Internal server error".to_string()
            }
            Self::Shopify(_) => "External service error".to_string(),
            _ => self.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Set the Sentry user context for the current request.
///
/// Only the profile ID is attached.
pub fn set_sentry_user(profile_id: i32) {
    sentry::configure_scope(|scope| scope.set_user(Some(sentry_user(profile_id))));
}

fn sentry_user(profile_id: i32) -> sentry::User {
    sentry::User {
        id: Some(profile_id.to_string()),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("store".to_string());
        assert_eq!(err.to_string(), "Not found: store");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Conflict("test".to_string())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::Shopify(ShopifyError::RateLimited(2))),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_repository_errors_map_to_client_statuses() {
        assert_eq!(
            AppError::from(RepositoryError::NotFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(RepositoryError::Conflict("dup".to_string())).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::from(RepositoryError::DataCorruption("bad".to_string())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_auth_and_sync_errors_map() {
        assert_eq!(AppError::from(AuthError::EmailTaken).status(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::from(AuthError::InvalidToken).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::from(SyncError::NotConnected(ez_apps_core::StoreId::new(1))).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::from(SyncError::Revoked(ez_apps_core::StoreId::new(1))).status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_sentry_user_carries_only_profile_id() {
        let user = sentry_user(42);
        assert_eq!(user.id.as_deref(), Some("42"));
        assert!(user.email.is_none());
        assert!(user.username.is_none());
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let response =
            AppError::Internal("connection refused at 10.0.0.3".to_string()).into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap_or_default();
        let text = String::from_utf8_lossy(&body);
        assert!(text.contains("Internal server error"));
        assert!(!text.contains("10.0.0.3"));
    }
}
