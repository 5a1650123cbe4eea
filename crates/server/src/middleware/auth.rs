//! Authentication extractors and session helpers.
//!
//! Every route is a JSON API route, so rejections are status codes with a
//! JSON body rather than redirects.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tower_sessions::Session;

use crate::db::ProfileRepository;
use crate::error::set_sentry_user;
use crate::models::{CurrentUser, session_keys};
use crate::state::AppState;

/// Extractor that requires a signed-in profile.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireUser(user): RequireUser) -> impl IntoResponse {
///     format!("Hello, {}!", user.full_name)
/// }
/// ```
pub struct RequireUser(pub CurrentUser);

/// Extractor that requires a signed-in superadmin.
///
/// The role is re-read from the database so a demotion takes effect
/// immediately rather than at the next sign-in.
pub struct RequireSuperAdmin(pub CurrentUser);

/// Rejection for the auth extractors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    /// No session or no signed-in user.
    Unauthorized,
    /// Signed in but not allowed.
    Forbidden,
    /// The role lookup failed.
    Unavailable,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "Not signed in"),
            Self::Forbidden => (
                StatusCode::FORBIDDEN,
                "Only superadmins can access this resource",
            ),
            Self::Unavailable => (StatusCode::SERVICE_UNAVAILABLE, "Try again shortly"),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

async fn current_user(parts: &Parts) -> Result<CurrentUser, AuthRejection> {
    let session = parts
        .extensions
        .get::<Session>()
        .ok_or(AuthRejection::Unauthorized)?;

    let user: CurrentUser = session
        .get(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
        .ok_or(AuthRejection::Unauthorized)?;

    set_sentry_user(user.id.as_i32());
    Ok(user)
}

impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        current_user(parts).await.map(Self)
    }
}

impl FromRequestParts<AppState> for RequireSuperAdmin {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = current_user(parts).await?;

        let profile = ProfileRepository::new(state.pool())
            .get_by_id(user.id)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to load profile for role check");
                AuthRejection::Unavailable
            })?
            .ok_or(AuthRejection::Unauthorized)?;

        if !profile.is_superadmin() {
            return Err(AuthRejection::Forbidden);
        }

        Ok(Self(CurrentUser::from(&profile)))
    }
}

/// Store the signed-in user, rotating the session ID first.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Drop the whole session (logout).
///
/// # Errors
///
/// Returns an error if the session store cannot be updated.
pub async fn clear_session(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_statuses() {
        assert_eq!(
            AuthRejection::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthRejection::Forbidden.into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AuthRejection::Unavailable.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn test_require_user_without_session_is_unauthorized() {
        let (mut parts, ()) = axum::http::Request::builder()
            .uri("/api/stores")
            .body(())
            .unwrap_or_default()
            .into_parts();

        let result = RequireUser::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AuthRejection::Unauthorized)));
    }
}
