//! Health endpoint tests.
//!
//! Run with: cargo test -p ez-apps-integration-tests -- --ignored

use ez_apps_integration_tests::{base_url, client};
use reqwest::StatusCode;

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_liveness() {
    let client = client().expect("Failed to create HTTP client");
    let resp = client
        .get(format!("{}/health", base_url()))
        .send()
        .await
        .expect("Failed to call /health");

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.expect("Failed to read body"), "ok");
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_readiness_with_database() {
    let client = client().expect("Failed to create HTTP client");
    let resp = client
        .get(format!("{}/health/ready", base_url()))
        .send()
        .await
        .expect("Failed to call /health/ready");

    assert_eq!(resp.status(), StatusCode::OK);
}
