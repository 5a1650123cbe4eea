//! Superadmin routes.
//!
//! All handlers take [`RequireSuperAdmin`], which re-checks the role on every
//! request.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post, put},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use ez_apps_core::{Price, ProfileId, StoreId, UserRole};

use crate::db::plans::PlanInput;
use crate::db::{AppRepository, PlanRepository, ProfileRepository, StoreRepository};
use crate::error::AppError;
use crate::middleware::RequireSuperAdmin;
use crate::models::{App, Plan, Profile, StoreView};
use crate::services::{ProductSyncReport, SyncReport};
use crate::state::AppState;

/// Build the superadmin router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/profiles", get(list_profiles))
        .route("/api/admin/profiles/{id}/role", put(set_role))
        .route("/api/admin/stores", get(list_stores))
        .route("/api/admin/stores/{id}/sync", post(sync_store))
        .route("/api/admin/magic-link", post(issue_magic_link))
        .route("/api/admin/plans", post(upsert_plan))
        .route("/api/admin/apps", post(upsert_app))
}

#[derive(Debug, Deserialize)]
pub struct MagicLinkRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct MagicLinkResponse {
    pub profile_id: ProfileId,
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: UserRole,
}

#[derive(Debug, Deserialize)]
pub struct PlanRequest {
    pub slug: String,
    pub name: String,
    /// Monthly price as a decimal string, e.g. "29.00".
    pub price: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub max_stores: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct AppRequest {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Serialize)]
pub struct StoreSyncResponse {
    pub store_id: StoreId,
    pub orders: SyncReport,
    pub products: ProductSyncReport,
}

fn default_currency() -> String {
    "USD".to_string()
}

const fn default_true() -> bool {
    true
}

/// Slugs are lowercase ASCII letters, digits and hyphens.
fn validate_slug(slug: &str) -> Result<&str, AppError> {
    let slug = slug.trim();
    let valid = !slug.is_empty()
        && !slug.starts_with('-')
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');

    if valid {
        Ok(slug)
    } else {
        Err(AppError::BadRequest(format!("invalid slug: {slug:?}")))
    }
}

impl PlanRequest {
    fn into_input(self) -> Result<PlanInput, AppError> {
        let slug = validate_slug(&self.slug)?.to_string();
        let price = Price::parse(&self.price, &self.currency)
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        if self.max_stores < 1 {
            return Err(AppError::BadRequest(
                "max_stores must be at least 1".to_string(),
            ));
        }
        if self.name.trim().is_empty() {
            return Err(AppError::BadRequest("name must not be empty".to_string()));
        }

        Ok(PlanInput {
            slug,
            name: self.name.trim().to_string(),
            price,
            max_stores: self.max_stores,
            is_active: self.is_active,
        })
    }
}

/// GET /api/admin/profiles
async fn list_profiles(
    State(state): State<AppState>,
    RequireSuperAdmin(_admin): RequireSuperAdmin,
) -> Result<Json<Vec<Profile>>, AppError> {
    let profiles = ProfileRepository::new(state.pool()).list_all().await?;
    Ok(Json(profiles))
}

/// PUT /api/admin/profiles/{id}/role
#[instrument(skip_all, fields(admin_id = %admin.id, profile_id = %id))]
async fn set_role(
    State(state): State<AppState>,
    RequireSuperAdmin(admin): RequireSuperAdmin,
    Path(id): Path<ProfileId>,
    Json(body): Json<RoleRequest>,
) -> Result<Json<Profile>, AppError> {
    if id == admin.id && body.role != UserRole::Superadmin {
        return Err(AppError::Conflict(
            "superadmins cannot demote themselves".to_string(),
        ));
    }

    let profile = ProfileRepository::new(state.pool())
        .set_role(id, body.role)
        .await?;

    tracing::info!(role = %profile.role, "Role changed");
    Ok(Json(profile))
}

/// GET /api/admin/stores
async fn list_stores(
    State(state): State<AppState>,
    RequireSuperAdmin(_admin): RequireSuperAdmin,
) -> Result<Json<Vec<StoreView>>, AppError> {
    let stores = StoreRepository::new(state.pool()).list_all().await?;
    Ok(Json(stores.iter().map(StoreView::from).collect()))
}

/// POST /api/admin/stores/{id}/sync - Sync orders and products of any store.
#[instrument(skip_all, fields(admin_id = %admin.id, store_id = %id))]
async fn sync_store(
    State(state): State<AppState>,
    RequireSuperAdmin(admin): RequireSuperAdmin,
    Path(id): Path<StoreId>,
) -> Result<Json<StoreSyncResponse>, AppError> {
    let store = StoreRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("store {id}")))?;

    let sync = state.sync();
    let orders = sync.sync_orders(&store).await?;
    let products = sync.sync_products(&store).await?;

    Ok(Json(StoreSyncResponse {
        store_id: store.id,
        orders,
        products,
    }))
}

/// POST /api/admin/magic-link - Issue a sign-in link for support.
///
/// Skips the per-email rate limit and returns the link instead of mailing it.
#[instrument(skip_all, fields(admin_id = %admin.id))]
async fn issue_magic_link(
    State(state): State<AppState>,
    RequireSuperAdmin(admin): RequireSuperAdmin,
    Json(body): Json<MagicLinkRequest>,
) -> Result<Json<MagicLinkResponse>, AppError> {
    let (profile, link) = state
        .auth()
        .issue_admin_link(&body.email, Some(admin.id))
        .await?;

    tracing::info!(profile_id = %profile.id, "Support magic link issued");
    Ok(Json(MagicLinkResponse {
        profile_id: profile.id,
        url: link.url,
        expires_at: link.expires_at,
    }))
}

/// POST /api/admin/plans - Create or update a plan by slug.
#[instrument(skip_all, fields(admin_id = %admin.id, plan = %body.slug))]
async fn upsert_plan(
    State(state): State<AppState>,
    RequireSuperAdmin(admin): RequireSuperAdmin,
    Json(body): Json<PlanRequest>,
) -> Result<Json<Plan>, AppError> {
    let input = body.into_input()?;
    let plan = PlanRepository::new(state.pool()).upsert(&input).await?;
    Ok(Json(plan))
}

/// POST /api/admin/apps - Create or update a catalog app by slug.
#[instrument(skip_all, fields(admin_id = %admin.id, app = %body.slug))]
async fn upsert_app(
    State(state): State<AppState>,
    RequireSuperAdmin(admin): RequireSuperAdmin,
    Json(body): Json<AppRequest>,
) -> Result<Json<App>, AppError> {
    let slug = validate_slug(&body.slug)?;
    if body.name.trim().is_empty() {
        return Err(AppError::BadRequest("name must not be empty".to_string()));
    }

    let app = AppRepository::new(state.pool())
        .upsert(slug, body.name.trim(), &body.description, body.is_active)
        .await?;
    Ok(Json(app))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn plan_request(price: &str, max_stores: i32) -> PlanRequest {
        PlanRequest {
            slug: "growth".to_string(),
            name: " Growth ".to_string(),
            price: price.to_string(),
            currency: default_currency(),
            max_stores,
            is_active: true,
        }
    }

    #[test]
    fn test_validate_slug() {
        assert!(matches!(validate_slug("low-stock-alerts"), Ok("low-stock-alerts")));
        assert!(validate_slug("Growth").is_err());
        assert!(validate_slug("-lead").is_err());
        assert!(validate_slug("").is_err());
        assert!(validate_slug("has space").is_err());
    }

    #[test]
    fn test_plan_request_into_input() {
        let input = plan_request("29.00", 3).into_input();
        assert!(input.is_ok());
        if let Ok(input) = input {
            assert_eq!(input.name, "Growth");
            assert_eq!(input.price.amount, Decimal::new(2900, 2));
            assert_eq!(input.price.currency_code.as_str(), "USD");
        }
    }

    #[test]
    fn test_plan_request_rejects_bad_values() {
        assert!(plan_request("-1", 3).into_input().is_err());
        assert!(plan_request("abc", 3).into_input().is_err());
        assert!(plan_request("10", 0).into_input().is_err());
    }

    #[test]
    fn test_plan_request_defaults() {
        let body: Result<PlanRequest, _> = serde_json::from_str(
            r#"{"slug":"starter","name":"Starter","price":"0","max_stores":1}"#,
        );
        assert!(matches!(body, Ok(ref b) if b.is_active && b.currency == "USD"));
    }
}
