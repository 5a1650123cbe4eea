//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                              - Liveness
//! GET  /health/ready                        - Readiness (database)
//!
//! # Auth (magic links, shared session cookie)
//! POST /api/auth/signup                     - Create profile, send link
//! POST /api/auth/login                      - Send link (always 202)
//! GET  /api/auth/verify?token=              - Consume link, start session
//! POST /api/auth/logout                     - End session
//! GET  /api/auth/session                    - Current user
//!
//! # Shopify
//! GET  /api/auth/shopify/authorize?shop=    - Start OAuth
//! GET  /api/auth/shopify/callback           - Finish OAuth, upsert store
//! POST /api/shopify/orders                  - Sync orders for a store
//! GET  /api/shopify/orders                  - List synced orders
//! POST /api/shopify/products                - Sync products for a store
//! GET  /api/shopify/products                - List synced items
//!
//! # Dashboard
//! GET   /api/stores                         - Own stores
//! GET   /api/stores/{id}                    - One store
//! PATCH /api/stores/{id}                    - Rename store
//! POST  /api/stores/{id}/disconnect         - Drop token
//! GET   /api/stores/{id}/apps               - Enabled apps
//! PUT   /api/stores/{id}/apps/{slug}        - Enable/configure app
//! DELETE /api/stores/{id}/apps/{slug}       - Disable app
//! GET   /api/apps                           - App catalog
//! GET   /api/billing/plans                  - Active plans
//! GET   /api/billing                        - Current subscription
//! POST  /api/billing/subscribe              - Choose plan
//! POST  /api/billing/cancel                 - Cancel subscription
//! PUT   /api/profile                        - Update profile
//!
//! # Superadmin
//! GET  /api/admin/profiles                  - All profiles
//! PUT  /api/admin/profiles/{id}/role        - Change role
//! GET  /api/admin/stores                    - All stores
//! POST /api/admin/stores/{id}/sync          - Sync any store
//! POST /api/admin/magic-link                - Issue link without rate limit
//! POST /api/admin/plans                     - Upsert plan
//! POST /api/admin/apps                      - Upsert app
//! ```

pub mod admin;
pub mod auth;
pub mod dashboard;
pub mod shopify;

use axum::{Router, extract::State, http::StatusCode, routing::get};

use crate::state::AppState;

/// Build the full router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(auth::router())
        .merge(shopify::router())
        .merge(dashboard::router())
        .merge(admin::router())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::config::test_config;
    use crate::services::EmailService;

    /// State backed by a lazy pool; no request below reaches the database.
    fn test_app() -> Router {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/ez_apps_test")
            .unwrap();

        routes().with_state(AppState::new(test_config(), pool, EmailService::log_only()))
    }

    async fn status_of(request: Request<Body>) -> StatusCode {
        test_app().oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_health_is_ok() {
        assert_eq!(health().await, "ok");
        let request = Request::get("/health").body(Body::empty()).unwrap();
        assert_eq!(status_of(request).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_protected_routes_require_session() {
        for uri in [
            "/api/auth/session",
            "/api/stores",
            "/api/billing",
            "/api/apps",
            "/api/admin/profiles",
            "/api/admin/stores",
        ] {
            let request = Request::get(uri).body(Body::empty()).unwrap();
            assert_eq!(status_of(request).await, StatusCode::UNAUTHORIZED, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_login_rejects_malformed_email() {
        let request = Request::post("/api/auth/login")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"email":"not-an-email"}"#))
            .unwrap();
        assert_eq!(status_of(request).await, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let request = Request::get("/api/nope").body(Body::empty()).unwrap();
        assert_eq!(status_of(request).await, StatusCode::NOT_FOUND);
    }
}
