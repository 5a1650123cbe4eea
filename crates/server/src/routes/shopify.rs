//! Shopify OAuth and sync routes.

use std::collections::HashMap;

use axum::{
    Json, Router,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use secrecy::ExposeSecret;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use ez_apps_core::StoreId;

use crate::db::{ItemRepository, OrderRepository, StoreRepository};
use crate::error::AppError;
use crate::middleware::RequireUser;
use crate::models::{CurrentUser, Item, OrderWithLineItems, Store, session_keys};
use crate::services::{ProductSyncReport, SyncReport};
use crate::shopify::{generate_state, normalize_shop_domain, verify_hmac};
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 250;

/// Build the Shopify router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/shopify/authorize", get(authorize))
        .route("/api/auth/shopify/callback", get(callback))
        .route("/api/shopify/orders", get(list_orders).post(sync_orders))
        .route(
            "/api/shopify/products",
            get(list_products).post(sync_products),
        )
}

#[derive(Debug, Deserialize)]
pub struct AuthorizeParams {
    pub shop: String,
}

#[derive(Debug, Deserialize)]
pub struct SyncRequest {
    pub store_id: StoreId,
}

#[derive(Debug, Deserialize)]
pub struct ListOrdersParams {
    pub store_id: StoreId,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ListProductsParams {
    pub store_id: StoreId,
}

/// Load a store owned by the current user, 404 otherwise.
pub(crate) async fn owned_store(
    state: &AppState,
    user: &CurrentUser,
    store_id: StoreId,
) -> Result<Store, AppError> {
    StoreRepository::new(state.pool())
        .get_owned(store_id, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("store {store_id}")))
}

/// Default display name for a newly connected shop.
fn default_store_name(shop: &str) -> &str {
    shop.strip_suffix(".myshopify.com").unwrap_or(shop)
}

fn page_bounds(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    (
        limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        offset.unwrap_or(0).max(0),
    )
}

fn error_redirect(state: &AppState, code: &str) -> Response {
    Redirect::to(&format!("{}?error={code}", state.config().app_url)).into_response()
}

/// GET /api/auth/shopify/authorize - Start the OAuth flow for a shop.
#[instrument(skip_all, fields(profile_id = %user.id))]
async fn authorize(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
    Query(params): Query<AuthorizeParams>,
) -> Result<Redirect, AppError> {
    let shop = normalize_shop_domain(&params.shop)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    let csrf_state = generate_state();

    let stored = async {
        session
            .insert(session_keys::SHOPIFY_OAUTH_STATE, &csrf_state)
            .await?;
        session.insert(session_keys::SHOPIFY_OAUTH_SHOP, &shop).await
    }
    .await;
    stored.map_err(|e| AppError::Internal(format!("session write failed: {e}")))?;

    let url = state.shopify().authorization_url(
        &shop,
        &state.config().shopify_redirect_uri(),
        &csrf_state,
    );

    tracing::info!(shop = %shop, "Redirecting to Shopify authorization");
    Ok(Redirect::to(&url))
}

/// GET /api/auth/shopify/callback - Finish OAuth and store the access token.
///
/// Every failure redirects back to the dashboard with an `error` code.
#[instrument(skip_all)]
async fn callback(
    State(state): State<AppState>,
    session: Session,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let user: Option<CurrentUser> = session
        .get(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten();
    let Some(user) = user else {
        return error_redirect(&state, "not_signed_in");
    };

    if let Some(error) = params.get("error") {
        tracing::warn!(error = %error, "Shopify authorization declined");
        return error_redirect(&state, "access_denied");
    }

    if !verify_hmac(&params, state.shopify().client_secret().expose_secret()) {
        tracing::warn!("Shopify callback failed HMAC verification");
        return error_redirect(&state, "invalid_hmac");
    }

    let Some(code) = params.get("code") else {
        return error_redirect(&state, "missing_code");
    };

    let expected_state: Option<String> = session
        .remove(session_keys::SHOPIFY_OAUTH_STATE)
        .await
        .ok()
        .flatten();
    let expected_shop: Option<String> = session
        .remove(session_keys::SHOPIFY_OAUTH_SHOP)
        .await
        .ok()
        .flatten();

    if expected_state.is_none() || expected_state.as_ref() != params.get("state") {
        tracing::warn!("Shopify callback state mismatch");
        return error_redirect(&state, "invalid_state");
    }

    let shop = match params.get("shop").map(|s| normalize_shop_domain(s)) {
        Some(Ok(shop)) if expected_shop.as_deref() == Some(shop.as_str()) => shop,
        _ => {
            tracing::warn!("Shopify callback shop mismatch");
            return error_redirect(&state, "invalid_shop");
        }
    };

    let token = match state.shopify().exchange_code(&shop, code).await {
        Ok(token) => token,
        Err(e) => {
            tracing::error!(shop = %shop, error = %e, "Token exchange failed");
            return error_redirect(&state, "exchange_failed");
        }
    };

    let stored = StoreRepository::new(state.pool())
        .upsert_connected(
            user.id,
            &shop,
            default_store_name(&shop),
            token.access_token.expose_secret(),
            &token.scopes,
        )
        .await;

    match stored {
        Ok(store) => {
            tracing::info!(store_id = %store.id, shop = %shop, "Store connected");
            Redirect::to(&format!(
                "{}/stores/{}?connected=1",
                state.config().app_url,
                store.id
            ))
            .into_response()
        }
        Err(crate::db::RepositoryError::Conflict(msg)) => {
            tracing::warn!(shop = %shop, reason = %msg, "Shop owned by another profile");
            error_redirect(&state, "shop_taken")
        }
        Err(e) => {
            tracing::error!(shop = %shop, error = %e, "Failed to store connection");
            error_redirect(&state, "store_failed")
        }
    }
}

/// POST /api/shopify/orders - Sync orders for an owned store.
#[instrument(skip_all, fields(profile_id = %user.id))]
async fn sync_orders(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Json(body): Json<SyncRequest>,
) -> Result<Json<SyncReport>, AppError> {
    let store = owned_store(&state, &user, body.store_id).await?;
    let report = state.sync().sync_orders(&store).await?;
    Ok(Json(report))
}

/// GET /api/shopify/orders - List synced orders, newest first.
async fn list_orders(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Query(params): Query<ListOrdersParams>,
) -> Result<Json<Vec<OrderWithLineItems>>, AppError> {
    let store = owned_store(&state, &user, params.store_id).await?;
    let (limit, offset) = page_bounds(params.limit, params.offset);
    let orders = OrderRepository::new(state.pool())
        .list_for_store(store.id, limit, offset)
        .await?;
    Ok(Json(orders))
}

/// POST /api/shopify/products - Sync products for an owned store.
#[instrument(skip_all, fields(profile_id = %user.id))]
async fn sync_products(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Json(body): Json<SyncRequest>,
) -> Result<Json<ProductSyncReport>, AppError> {
    let store = owned_store(&state, &user, body.store_id).await?;
    let report = state.sync().sync_products(&store).await?;
    Ok(Json(report))
}

/// GET /api/shopify/products - List synced items with committed stock.
async fn list_products(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Query(params): Query<ListProductsParams>,
) -> Result<Json<Vec<Item>>, AppError> {
    let store = owned_store(&state, &user, params.store_id).await?;
    let items = ItemRepository::new(state.pool())
        .list_for_store(store.id)
        .await?;
    Ok(Json(items))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_store_name() {
        assert_eq!(default_store_name("demo-shop.myshopify.com"), "demo-shop");
        assert_eq!(default_store_name("odd"), "odd");
    }

    #[test]
    fn test_page_bounds() {
        assert_eq!(page_bounds(None, None), (50, 0));
        assert_eq!(page_bounds(Some(1000), Some(-5)), (250, 0));
        assert_eq!(page_bounds(Some(0), Some(100)), (1, 100));
    }
}
