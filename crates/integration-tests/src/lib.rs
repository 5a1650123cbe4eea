//! Integration tests for EZ Apps.
//!
//! # Running Tests
//!
//! ```bash
//! # Migrate and start the server against a scratch database
//! cargo run -p ez-apps-cli -- migrate
//! cargo run -p ez-apps-server
//!
//! # Run the ignored integration tests
//! cargo test -p ez-apps-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `EZ_TEST_BASE_URL` - Server under test (default `http://localhost:3000`)
//! - `DATABASE_URL` - Same database as the server, used to create profiles
//!   and issue magic links directly
//!
//! Leave `EZ_COOKIE_DOMAIN` unset on the server: a domain cookie is not sent
//! back to `localhost`.

use chrono::Duration;
use ez_apps_core::UserRole;
use ez_apps_server::services::AuthService;
use reqwest::Client;
use reqwest::redirect::Policy;
use sqlx::PgPool;

/// Base URL of the server under test.
#[must_use]
pub fn base_url() -> String {
    std::env::var("EZ_TEST_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// A client that keeps cookies and does not follow redirects.
///
/// # Errors
///
/// Returns an error if the client cannot be built.
pub fn client() -> reqwest::Result<Client> {
    Client::builder()
        .cookie_store(true)
        .redirect(Policy::none())
        .build()
}

/// A unique email address for one test run.
#[must_use]
pub fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@example.com", uuid::Uuid::new_v4().simple())
}

/// Connect to the server's database.
///
/// # Errors
///
/// Returns an error if `DATABASE_URL` is missing or unreachable.
pub async fn pool() -> Result<PgPool, Box<dyn std::error::Error>> {
    let url = std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL not set")?;
    Ok(PgPool::connect(&url).await?)
}

/// Create a profile with the given role and sign `client` in as it.
///
/// The link is issued straight from the database, then redeemed over HTTP
/// so the session cookie lands in the client's cookie store.
///
/// # Errors
///
/// Returns an error if the profile cannot be created or the link is rejected.
pub async fn sign_in_as(
    client: &Client,
    pool: &PgPool,
    role: UserRole,
) -> Result<String, Box<dyn std::error::Error>> {
    let base = base_url();
    let auth = AuthService::new(pool, &base, Duration::minutes(15));
    let email = unique_email(&role.to_string());

    let profile = match role {
        UserRole::Superadmin => auth.create_superadmin(&email, "Integration Admin").await?,
        UserRole::Customer => auth.signup(&email, "Integration Merchant").await?.0,
    };
    let (_, link) = auth.issue_admin_link(profile.email.as_str(), None).await?;

    let resp = client.get(&link.url).send().await?;
    let location = resp
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !resp.status().is_redirection() || location.contains("error=") {
        return Err(format!("verify returned {} -> {location}", resp.status()).into());
    }

    Ok(email)
}
