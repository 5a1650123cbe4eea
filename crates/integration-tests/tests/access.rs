//! Dashboard and superadmin access control tests.
//!
//! Run with: cargo test -p ez-apps-integration-tests -- --ignored

#![allow(clippy::unwrap_used, clippy::expect_used)]

use ez_apps_core::UserRole;
use ez_apps_integration_tests::{base_url, client, pool, sign_in_as};
use reqwest::StatusCode;
use serde_json::{Value, json};

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_dashboard_requires_sign_in() {
    let client = client().unwrap();
    for path in ["/api/stores", "/api/billing", "/api/apps"] {
        let resp = client
            .get(format!("{}{path}", base_url()))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{path}");
    }
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_admin_requires_sign_in() {
    let client = client().unwrap();
    let resp = client
        .get(format!("{}/api/admin/profiles", base_url()))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running server and DATABASE_URL"]
async fn test_customer_cannot_use_admin_routes() {
    let pool = pool().await.unwrap();
    let client = client().unwrap();
    sign_in_as(&client, &pool, UserRole::Customer).await.unwrap();

    let resp = client
        .get(format!("{}/api/admin/profiles", base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = client
        .post(format!("{}/api/admin/magic-link", base_url()))
        .json(&json!({ "email": "anyone@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "Requires running server and DATABASE_URL"]
async fn test_superadmin_lists_profiles_and_issues_links() {
    let pool = pool().await.unwrap();
    let client = client().unwrap();
    let email = sign_in_as(&client, &pool, UserRole::Superadmin).await.unwrap();

    let profiles: Vec<Value> = client
        .get(format!("{}/api/admin/profiles", base_url()))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(profiles.iter().any(|p| p["email"] == email.as_str()));

    let link: Value = client
        .post(format!("{}/api/admin/magic-link", base_url()))
        .json(&json!({ "email": email }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(link["url"].as_str().unwrap().contains("/api/auth/verify?token="));
}

#[tokio::test]
#[ignore = "Requires running server and DATABASE_URL"]
async fn test_new_customer_has_no_stores() {
    let pool = pool().await.unwrap();
    let client = client().unwrap();
    sign_in_as(&client, &pool, UserRole::Customer).await.unwrap();

    let stores: Vec<Value> = client
        .get(format!("{}/api/stores", base_url()))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(stores.is_empty());

    let resp = client
        .get(format!("{}/api/stores/999999", base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
