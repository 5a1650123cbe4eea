//! Magic link authentication service.
//!
//! A magic link carries 32 random bytes encoded as unpadded base64url. Only
//! the SHA-256 hex digest is persisted; verification hashes the presented
//! token and consumes the matching row in a single statement.

mod error;
mod rate_limit;

pub use error::AuthError;
pub use rate_limit::MagicLinkRateLimiter;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use tracing::instrument;

use ez_apps_core::{Email, ProfileId, UserRole};

use crate::db::{MagicLinkRepository, ProfileRepository, RepositoryError};
use crate::models::Profile;

/// Path of the verification endpoint, relative to the API base URL.
pub const VERIFY_PATH: &str = "/api/auth/verify";

const LINK_CLEANUP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60 * 60);

/// A freshly issued sign-in link. The raw token only exists inside `url`.
#[derive(Debug, Clone)]
pub struct MagicLink {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

/// Authentication service for magic link operations.
pub struct AuthService<'a> {
    pool: &'a PgPool,
    base_url: &'a str,
    ttl: Duration,
}

impl<'a> AuthService<'a> {
    /// Create a new auth service.
    ///
    /// `base_url` is the public API URL the verification link points at.
    #[must_use]
    pub const fn new(pool: &'a PgPool, base_url: &'a str, ttl: Duration) -> Self {
        Self {
            pool,
            base_url,
            ttl,
        }
    }

    /// Link lifetime in whole minutes, for email copy.
    #[must_use]
    pub fn ttl_minutes(&self) -> i64 {
        self.ttl.num_minutes()
    }

    /// Register a customer profile and issue its first sign-in link.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::EmailTaken` if the email is already registered.
    #[instrument(skip(self))]
    pub async fn signup(
        &self,
        email: &str,
        full_name: &str,
    ) -> Result<(Profile, MagicLink), AuthError> {
        let email = Email::parse(email)?;
        let profile = self
            .create_profile(&email, full_name, UserRole::Customer)
            .await?;
        let link = self.issue_link(&profile, None).await?;

        tracing::info!(profile_id = %profile.id, "Profile signed up");
        Ok((profile, link))
    }

    /// Issue a sign-in link for an existing profile.
    ///
    /// Returns `None` for unknown emails so callers can answer identically
    /// either way.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` for malformed input.
    #[instrument(skip(self))]
    pub async fn request_link(
        &self,
        email: &str,
    ) -> Result<Option<(Profile, MagicLink)>, AuthError> {
        let email = Email::parse(email)?;
        let Some(profile) = ProfileRepository::new(self.pool)
            .get_by_email(&email)
            .await?
        else {
            return Ok(None);
        };

        let link = self.issue_link(&profile, None).await?;
        Ok(Some((profile, link)))
    }

    /// Issue a link on someone's behalf (superadmin panel or CLI).
    ///
    /// # Errors
    ///
    /// Returns `AuthError::ProfileNotFound` if no profile has this email.
    #[instrument(skip(self))]
    pub async fn issue_admin_link(
        &self,
        email: &str,
        issued_by: Option<ProfileId>,
    ) -> Result<(Profile, MagicLink), AuthError> {
        let email = Email::parse(email)?;
        let profile = ProfileRepository::new(self.pool)
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::ProfileNotFound)?;

        let link = self.issue_link(&profile, issued_by).await?;
        tracing::info!(
            profile_id = %profile.id,
            issued_by = ?issued_by,
            "Administrative magic link issued"
        );
        Ok((profile, link))
    }

    /// Create a superadmin profile.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::EmailTaken` if the email is already registered.
    pub async fn create_superadmin(
        &self,
        email: &str,
        full_name: &str,
    ) -> Result<Profile, AuthError> {
        let email = Email::parse(email)?;
        self.create_profile(&email, full_name, UserRole::Superadmin)
            .await
    }

    /// Consume a presented token and return its profile.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` for unknown, expired or used tokens.
    #[instrument(skip_all)]
    pub async fn verify(&self, token: &str) -> Result<Profile, AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::InvalidToken);
        }

        let profile_id = MagicLinkRepository::new(self.pool)
            .consume(&hash_token(token))
            .await?
            .ok_or(AuthError::InvalidToken)?;

        ProfileRepository::new(self.pool)
            .get_by_id(profile_id)
            .await?
            .ok_or(AuthError::InvalidToken)
    }

    async fn create_profile(
        &self,
        email: &Email,
        full_name: &str,
        role: UserRole,
    ) -> Result<Profile, AuthError> {
        ProfileRepository::new(self.pool)
            .create(email, full_name.trim(), role)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::EmailTaken,
                other => AuthError::Repository(other),
            })
    }

    async fn issue_link(
        &self,
        profile: &Profile,
        issued_by: Option<ProfileId>,
    ) -> Result<MagicLink, AuthError> {
        let token = generate_token();
        let expires_at = Utc::now() + self.ttl;

        MagicLinkRepository::new(self.pool)
            .create(profile.id, &hash_token(&token), expires_at, issued_by)
            .await?;

        Ok(MagicLink {
            url: verify_url(self.base_url, &token),
            expires_at,
        })
    }
}

/// Generate a 256-bit URL-safe token.
#[must_use]
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// SHA-256 hex digest of a token, as stored in `magic_links.token_hash`.
#[must_use]
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Spawn the hourly purge of expired and used magic links.
pub fn spawn_link_cleanup(pool: PgPool) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(LINK_CLEANUP_INTERVAL);
        loop {
            ticker.tick().await;
            match MagicLinkRepository::new(&pool).delete_stale().await {
                Ok(0) => {}
                Ok(deleted) => tracing::info!(deleted, "Purged stale magic links"),
                Err(e) => tracing::warn!(error = %e, "Magic link purge failed"),
            }
        }
    })
}

fn verify_url(base_url: &str, token: &str) -> String {
    format!(
        "{}{VERIFY_PATH}?token={}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(token)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_token_format() {
        let token = generate_token();
        // 32 bytes -> 43 base64 chars without padding
        assert_eq!(token.len(), 43);
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
        assert_ne!(token, generate_token());
    }

    #[test]
    fn test_hash_token_is_sha256_hex() {
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(hash_token("abc").len(), 64);
        assert_ne!(hash_token("abc"), hash_token("abd"));
    }

    #[test]
    fn test_verify_url() {
        assert_eq!(
            verify_url("https://api.ezapps.io/", "tok_en-1"),
            "https://api.ezapps.io/api/auth/verify?token=tok_en-1"
        );
    }
}
