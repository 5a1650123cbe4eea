//! Superadmin management commands.
//!
//! # Usage
//!
//! ```bash
//! # Create a superadmin (sign in afterwards with a magic link)
//! ez-cli admin create -e ops@ezapps.io -n "Ops Team"
//!
//! # Print a sign-in link for any profile
//! ez-cli admin magic-link -e merchant@example.com
//! ```
//!
//! # Environment Variables
//!
//! Both commands read the same environment as the server (`DATABASE_URL`,
//! `EZ_BASE_URL`, `EZ_MAGIC_LINK_TTL_MINUTES`, ...).

use ez_apps_core::ProfileId;
use ez_apps_server::config::AppConfig;
use ez_apps_server::services::AuthService;
use thiserror::Error;

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Server configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ez_apps_server::config::ConfigError),

    /// Profile creation or link issuance failed.
    #[error(transparent)]
    Auth(#[from] ez_apps_server::services::AuthError),
}

/// Create a new superadmin profile.
///
/// # Errors
///
/// Returns an error if the email is invalid or already registered.
pub async fn create_superadmin(
    email: &str,
    name: &str,
) -> Result<ProfileId, Box<dyn std::error::Error>> {
    let config = AppConfig::from_env().map_err(AdminError::from)?;
    let pool = super::connect().await?;

    let auth = AuthService::new(&pool, &config.base_url, config.magic_link_ttl);
    let profile = auth
        .create_superadmin(email, name)
        .await
        .map_err(AdminError::from)?;

    tracing::info!(
        "Superadmin created successfully! ID: {}, Email: {}",
        profile.id,
        profile.email
    );
    tracing::info!("Sign in with: ez-cli admin magic-link -e {}", profile.email);

    Ok(profile.id)
}

/// Issue a magic link for an existing profile and log it.
///
/// # Errors
///
/// Returns an error if the configuration is incomplete or no profile matches.
pub async fn magic_link(email: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env().map_err(AdminError::from)?;
    let pool = super::connect().await?;

    let auth = AuthService::new(&pool, &config.base_url, config.magic_link_ttl);
    let (profile, link) = auth
        .issue_admin_link(email, None)
        .await
        .map_err(AdminError::from)?;

    tracing::info!("Magic link issued for {} ({})", profile.email, profile.role);
    tracing::info!("  Expires at: {}", link.expires_at);
    tracing::info!("");
    tracing::info!("  {}", link.url);

    Ok(())
}
