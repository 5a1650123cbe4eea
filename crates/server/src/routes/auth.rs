//! Magic link authentication routes.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use tower_sessions::Session;
use tracing::instrument;

use ez_apps_core::Email;

use crate::error::AppError;
use crate::middleware::{RequireUser, clear_session, set_current_user};
use crate::models::CurrentUser;
use crate::services::{AuthService, MagicLink};
use crate::state::AppState;

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/signup", post(signup))
        .route("/api/auth/login", post(login))
        .route("/api/auth/verify", get(verify))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/session", get(current_session))
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    #[serde(default)]
    pub full_name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    pub token: Option<String>,
}

fn accepted() -> Response {
    (
        StatusCode::ACCEPTED,
        Json(json!({ "message": "If the address is registered, a sign-in link is on its way." })),
    )
        .into_response()
}

async fn send_link(
    state: &AppState,
    auth: &AuthService<'_>,
    email: &Email,
    name: &str,
    link: &MagicLink,
) -> Result<(), AppError> {
    state
        .email()
        .send_magic_link(email, name, &link.url, auth.ttl_minutes())
        .await?;
    Ok(())
}

/// POST /api/auth/signup - Create a customer profile and mail its first link.
#[instrument(skip_all)]
async fn signup(
    State(state): State<AppState>,
    Json(body): Json<SignupRequest>,
) -> Result<Response, AppError> {
    let auth = state.auth();
    let (profile, link) = auth.signup(&body.email, &body.full_name).await?;

    // Counts as the first request of the window for this email.
    state.magic_link_limiter().try_acquire(&profile.email).await;
    send_link(&state, &auth, &profile.email, &profile.full_name, &link).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Account created. Check your email for a sign-in link." })),
    )
        .into_response())
}

/// POST /api/auth/login - Mail a sign-in link.
///
/// Answers 202 whether or not the email is registered.
#[instrument(skip_all)]
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Response, AppError> {
    let email = Email::parse(&body.email).map_err(|e| AppError::BadRequest(e.to_string()))?;

    if !state.magic_link_limiter().try_acquire(&email).await {
        tracing::info!("Magic link request throttled");
        return Ok(accepted());
    }

    let auth = state.auth();
    if let Some((profile, link)) = auth.request_link(email.as_str()).await? {
        // A delivery failure only happens for registered emails, so it must
        // not change the response.
        if let Err(e) = send_link(&state, &auth, &profile.email, &profile.full_name, &link).await
        {
            tracing::error!(error = %e, profile_id = %profile.id, "Failed to send magic link");
        }
    }

    Ok(accepted())
}

/// GET /api/auth/verify - Consume a link and start the session.
#[instrument(skip_all)]
async fn verify(
    State(state): State<AppState>,
    session: Session,
    Query(params): Query<VerifyParams>,
) -> Response {
    let app_url = &state.config().app_url;
    let token = params.token.unwrap_or_default();

    let profile = match state.auth().verify(&token).await {
        Ok(profile) => profile,
        Err(e) => {
            tracing::warn!(error = %e, "Magic link verification failed");
            return Redirect::to(&format!("{app_url}?error=invalid_link")).into_response();
        }
    };

    if let Err(e) = set_current_user(&session, &CurrentUser::from(&profile)).await {
        tracing::error!(error = %e, "Failed to store session");
        return Redirect::to(&format!("{app_url}?error=session_failed")).into_response();
    }

    tracing::info!(profile_id = %profile.id, "Signed in via magic link");
    Redirect::to(app_url).into_response()
}

/// POST /api/auth/logout - End the session.
async fn logout(session: Session) -> Result<StatusCode, AppError> {
    clear_session(&session)
        .await
        .map_err(|e| AppError::Internal(format!("session flush failed: {e}")))?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/auth/session - Return the signed-in user.
async fn current_session(RequireUser(user): RequireUser) -> Json<CurrentUser> {
    Json(user)
}
