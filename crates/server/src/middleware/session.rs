//! Session middleware configuration.
//!
//! Sets up `PostgreSQL`-backed sessions using tower-sessions. When
//! `EZ_COOKIE_DOMAIN` is set the cookie is scoped to it, so the marketing
//! site, the API and the dashboard subdomains all see the same session.

use secrecy::ExposeSecret;
use sha2::{Digest, Sha512};
use sqlx::PgPool;
use tower_sessions::cookie::{Key, SameSite};
use tower_sessions::service::SignedCookie;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::AppConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "ez_session";

/// Session expiry time in seconds (7 days of inactivity).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Create the session layer with `PostgreSQL` store.
///
/// The session table lives in the `tower_sessions` schema and is created by
/// the server migrations. Cookies are signed with a key derived from
/// `EZ_SESSION_SECRET`.
#[must_use]
pub fn create_session_layer(
    pool: &PgPool,
    config: &AppConfig,
) -> SessionManagerLayer<PostgresStore, SignedCookie> {
    let store = PostgresStore::new(pool.clone());

    let layer = SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        // Lax so the session survives the redirect back from Shopify OAuth
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/");

    let layer = match &config.cookie_domain {
        Some(domain) => layer.with_domain(domain.clone()),
        None => layer,
    };

    layer.with_signed(signing_key(config))
}

/// Derive the 64-byte cookie signing key from the session secret.
fn signing_key(config: &AppConfig) -> Key {
    let digest = Sha512::digest(config.session_secret.expose_secret().as_bytes());
    Key::from(digest.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;

    #[test]
    fn test_signing_key_is_deterministic() {
        let config = test_config();
        assert_eq!(
            signing_key(&config).master(),
            signing_key(&config).master()
        );
    }

    #[test]
    fn test_signing_key_depends_on_secret() {
        let a = test_config();
        let mut b = test_config();
        b.session_secret = secrecy::SecretString::from("y".repeat(32));
        assert_ne!(signing_key(&a).master(), signing_key(&b).master());
    }
}
