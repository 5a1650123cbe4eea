//! Merchant dashboard routes: stores, billing, apps and profile.
//!
//! Every handler requires a signed-in user and only touches rows the user
//! owns. A store that belongs to someone else answers 404.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use ez_apps_core::{StoreId, SubscriptionStatus};

use crate::db::{AppRepository, PlanRepository, ProfileRepository, StoreRepository};
use crate::error::AppError;
use crate::middleware::RequireUser;
use crate::models::{App, CurrentUser, Plan, Profile, StoreApp, StoreView, session_keys};
use crate::routes::shopify::owned_store;
use crate::state::AppState;

const MAX_NAME_LEN: usize = 255;

/// Build the dashboard router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/stores", get(list_stores))
        .route("/api/stores/{id}", get(get_store).patch(update_store))
        .route("/api/stores/{id}/disconnect", post(disconnect_store))
        .route("/api/stores/{id}/apps", get(list_store_apps))
        .route(
            "/api/stores/{id}/apps/{slug}",
            put(enable_store_app).delete(disable_store_app),
        )
        .route("/api/apps", get(list_apps))
        .route("/api/billing/plans", get(list_plans))
        .route("/api/billing", get(current_billing))
        .route("/api/billing/subscribe", post(subscribe))
        .route("/api/billing/cancel", post(cancel_subscription))
        .route("/api/profile", put(update_profile).patch(update_profile))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStoreRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct StoreAppRequest {
    #[serde(default = "empty_settings")]
    pub settings: serde_json::Value,
}

fn empty_settings() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub plan_slug: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub full_name: String,
}

/// Current plan and subscription state of a profile.
#[derive(Debug, Serialize)]
pub struct BillingView {
    pub plan: Option<Plan>,
    pub subscription_status: SubscriptionStatus,
    pub store_count: i64,
}

/// Trim a display name and check its length.
fn validate_name(name: &str) -> Result<&str, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("name must not be empty".to_string()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::BadRequest(format!(
            "name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(name)
}

async fn load_profile(state: &AppState, user: &CurrentUser) -> Result<Profile, AppError> {
    ProfileRepository::new(state.pool())
        .get_by_id(user.id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("profile no longer exists".to_string()))
}

async fn billing_view(state: &AppState, profile: &Profile) -> Result<BillingView, AppError> {
    let plan = match profile.plan_id {
        Some(plan_id) => PlanRepository::new(state.pool()).get(plan_id).await?,
        None => None,
    };
    let store_count = StoreRepository::new(state.pool())
        .count_for_profile(profile.id)
        .await?;

    Ok(BillingView {
        plan,
        subscription_status: profile.subscription_status,
        store_count,
    })
}

// =============================================================================
// Stores
// =============================================================================

/// GET /api/stores - Stores of the current user.
async fn list_stores(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<Vec<StoreView>>, AppError> {
    let stores = StoreRepository::new(state.pool())
        .list_for_profile(user.id)
        .await?;
    Ok(Json(stores.iter().map(StoreView::from).collect()))
}

/// GET /api/stores/{id}
async fn get_store(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<StoreId>,
) -> Result<Json<StoreView>, AppError> {
    let store = owned_store(&state, &user, id).await?;
    Ok(Json(StoreView::from(&store)))
}

/// PATCH /api/stores/{id} - Save store settings.
#[instrument(skip_all, fields(store_id = %id))]
async fn update_store(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<StoreId>,
    Json(body): Json<UpdateStoreRequest>,
) -> Result<Json<StoreView>, AppError> {
    let name = validate_name(&body.name)?;
    let store = StoreRepository::new(state.pool())
        .rename(id, user.id, name)
        .await?;
    Ok(Json(StoreView::from(&store)))
}

/// POST /api/stores/{id}/disconnect - Clear the token, keep synced data.
#[instrument(skip_all, fields(store_id = %id))]
async fn disconnect_store(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<StoreId>,
) -> Result<StatusCode, AppError> {
    let store = owned_store(&state, &user, id).await?;
    StoreRepository::new(state.pool())
        .disconnect(store.id)
        .await?;
    tracing::info!(shop = %store.shop_domain, "Store disconnected");
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Apps
// =============================================================================

/// GET /api/apps - Active app catalog.
async fn list_apps(
    State(state): State<AppState>,
    RequireUser(_user): RequireUser,
) -> Result<Json<Vec<App>>, AppError> {
    let apps = AppRepository::new(state.pool()).list_active().await?;
    Ok(Json(apps))
}

/// GET /api/stores/{id}/apps
async fn list_store_apps(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<StoreId>,
) -> Result<Json<Vec<StoreApp>>, AppError> {
    let store = owned_store(&state, &user, id).await?;
    let apps = AppRepository::new(state.pool())
        .list_for_store(store.id)
        .await?;
    Ok(Json(apps))
}

/// PUT /api/stores/{id}/apps/{slug} - Enable an app or replace its settings.
#[instrument(skip_all, fields(store_id = %id, app = %slug))]
async fn enable_store_app(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path((id, slug)): Path<(StoreId, String)>,
    Json(body): Json<StoreAppRequest>,
) -> Result<Json<StoreApp>, AppError> {
    if !body.settings.is_object() {
        return Err(AppError::BadRequest(
            "settings must be a JSON object".to_string(),
        ));
    }

    let store = owned_store(&state, &user, id).await?;
    let repo = AppRepository::new(state.pool());
    let app = repo
        .get_active_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("app {slug}")))?;

    let store_app = repo.enable_for_store(store.id, &app, &body.settings).await?;
    Ok(Json(store_app))
}

/// DELETE /api/stores/{id}/apps/{slug}
#[instrument(skip_all, fields(store_id = %id, app = %slug))]
async fn disable_store_app(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path((id, slug)): Path<(StoreId, String)>,
) -> Result<StatusCode, AppError> {
    let store = owned_store(&state, &user, id).await?;
    let repo = AppRepository::new(state.pool());
    let app = repo
        .get_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("app {slug}")))?;

    if repo.disable_for_store(store.id, app.id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("app {slug} on store {id}")))
    }
}

// =============================================================================
// Billing
// =============================================================================

/// GET /api/billing/plans - Plans available for purchase.
async fn list_plans(
    State(state): State<AppState>,
    RequireUser(_user): RequireUser,
) -> Result<Json<Vec<Plan>>, AppError> {
    let plans = PlanRepository::new(state.pool()).list_active().await?;
    Ok(Json(plans))
}

/// GET /api/billing - Current plan and subscription status.
async fn current_billing(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<BillingView>, AppError> {
    let profile = load_profile(&state, &user).await?;
    Ok(Json(billing_view(&state, &profile).await?))
}

/// POST /api/billing/subscribe - Choose a plan.
///
/// Refused with 409 when the profile already owns more stores than the plan
/// allows.
#[instrument(skip_all, fields(profile_id = %user.id, plan = %body.plan_slug))]
async fn subscribe(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Json(body): Json<SubscribeRequest>,
) -> Result<Json<BillingView>, AppError> {
    let plan = PlanRepository::new(state.pool())
        .get_by_slug(body.plan_slug.trim())
        .await?
        .filter(|plan| plan.is_active)
        .ok_or_else(|| AppError::NotFound(format!("plan {}", body.plan_slug)))?;

    let store_count = StoreRepository::new(state.pool())
        .count_for_profile(user.id)
        .await?;
    if !plan.allows_store_count(store_count) {
        return Err(AppError::Conflict(format!(
            "plan {} allows {} stores, you have {store_count}",
            plan.slug, plan.max_stores
        )));
    }

    let profile = ProfileRepository::new(state.pool())
        .set_subscription(user.id, Some(plan.id), SubscriptionStatus::Active)
        .await?;

    tracing::info!("Subscription activated");
    Ok(Json(billing_view(&state, &profile).await?))
}

/// POST /api/billing/cancel - Cancel the subscription, keeping the plan on record.
#[instrument(skip_all, fields(profile_id = %user.id))]
async fn cancel_subscription(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<BillingView>, AppError> {
    let current = load_profile(&state, &user).await?;
    if !current.subscription_status.is_active() {
        return Err(AppError::Conflict("no active subscription".to_string()));
    }

    let profile = ProfileRepository::new(state.pool())
        .set_subscription(user.id, current.plan_id, SubscriptionStatus::Canceled)
        .await?;

    tracing::info!("Subscription canceled");
    Ok(Json(billing_view(&state, &profile).await?))
}

// =============================================================================
// Profile
// =============================================================================

/// PUT /api/profile - Update the display name.
#[instrument(skip_all, fields(profile_id = %user.id))]
async fn update_profile(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<Profile>, AppError> {
    let full_name = validate_name(&body.full_name)?;
    let profile = ProfileRepository::new(state.pool())
        .update_name(user.id, full_name)
        .await?;

    if let Err(e) = session
        .insert(session_keys::CURRENT_USER, CurrentUser::from(&profile))
        .await
    {
        tracing::warn!(error = %e, "Failed to refresh session user");
    }

    Ok(Json(profile))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name_trims() {
        assert!(matches!(validate_name("  My Shop "), Ok("My Shop")));
    }

    #[test]
    fn test_validate_name_rejects_blank_and_long() {
        assert!(matches!(validate_name("   "), Err(AppError::BadRequest(_))));
        let long = "x".repeat(MAX_NAME_LEN + 1);
        assert!(matches!(validate_name(&long), Err(AppError::BadRequest(_))));
        let max = "x".repeat(MAX_NAME_LEN);
        assert!(validate_name(&max).is_ok());
    }

    #[test]
    fn test_store_app_request_defaults_to_empty_object() {
        let body: StoreAppRequest = serde_json::from_str("{}").unwrap_or(StoreAppRequest {
            settings: serde_json::Value::Null,
        });
        assert_eq!(body.settings, serde_json::json!({}));
    }
}
