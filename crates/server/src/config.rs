//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `EZ_BASE_URL` - Public URL of this API (OAuth redirect URIs are built from it)
//! - `EZ_SESSION_SECRET` - Session signing secret (min 32 chars, high entropy)
//! - `SHOPIFY_CLIENT_ID` - Shopify app client ID
//! - `SHOPIFY_CLIENT_SECRET` - Shopify app client secret (also the callback HMAC key)
//!
//! ## Optional
//! - `EZ_HOST` - Bind address (default: 127.0.0.1)
//! - `EZ_PORT` - Listen port (default: 3000)
//! - `EZ_APP_URL` - Dashboard URL users land on after login (default: `{EZ_BASE_URL}/dashboard`)
//! - `EZ_COOKIE_DOMAIN` - Session cookie domain, e.g. `.ezapps.io`, shares the
//!   session between the root domain and app subdomains
//! - `EZ_MAGIC_LINK_TTL_MINUTES` - Magic link lifetime (default: 15)
//! - `EZ_SYNC_INTERVAL_SECS` - Enables the scheduled order/product sync
//! - `SHOPIFY_API_VERSION` - REST Admin API version (default: 2024-01)
//! - `SHOPIFY_SCOPES` - Comma-separated OAuth scopes
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`
//!
//! ## Optional (SMTP - magic links are logged instead of mailed when unset)
//! - `SMTP_HOST`, `SMTP_PORT` (default: 587), `SMTP_USERNAME`, `SMTP_PASSWORD`, `SMTP_FROM`
//!
//! ## Optional (TLS)
//! - `EZ_TLS_CERT` - PEM-encoded certificate chain
//! - `EZ_TLS_KEY` - PEM-encoded private key

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_API_VERSION: &str = "2024-01";
const DEFAULT_SCOPES: &str = "read_orders,read_products,read_inventory";
const DEFAULT_MAGIC_LINK_TTL_MINUTES: i64 = 15;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of the API
    pub base_url: String,
    /// Dashboard URL for post-login and post-OAuth redirects
    pub app_url: String,
    /// Session signing secret
    pub session_secret: SecretString,
    /// Cookie domain shared by the root domain and app subdomains
    pub cookie_domain: Option<String>,
    /// Lifetime of issued magic links
    pub magic_link_ttl: chrono::Duration,
    /// Interval of the scheduled store sync (disabled when `None`)
    pub sync_interval: Option<Duration>,
    /// Shopify app configuration
    pub shopify: ShopifyConfig,
    /// SMTP configuration (magic links are logged when absent)
    pub email: Option<EmailConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
    /// TLS configuration for HTTPS (optional)
    pub tls: Option<TlsConfig>,
}

/// Shopify app configuration.
///
/// Implements `Debug` manually to redact the client secret.
#[derive(Clone)]
pub struct ShopifyConfig {
    /// REST Admin API version (e.g., 2024-01)
    pub api_version: String,
    /// OAuth client ID
    pub client_id: String,
    /// OAuth client secret, also used to verify callback HMACs
    pub client_secret: SecretString,
    /// Scopes requested during OAuth
    pub scopes: Vec<String>,
}

impl std::fmt::Debug for ShopifyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyConfig")
            .field("api_version", &self.api_version)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Email (SMTP) configuration.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct EmailConfig {
    /// SMTP server hostname
    pub smtp_host: String,
    /// SMTP server port
    pub smtp_port: u16,
    /// SMTP authentication username
    pub smtp_username: String,
    /// SMTP authentication password
    pub smtp_password: SecretString,
    /// Email sender address (From header)
    pub from_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

/// TLS configuration for HTTPS.
#[derive(Clone)]
pub struct TlsConfig {
    /// PEM-encoded certificate chain
    pub cert_pem: String,
    /// PEM-encoded private key
    pub key_pem: SecretString,
}

impl std::fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConfig")
            .field("cert_pem", &"[CERTIFICATE]")
            .field("key_pem", &"[REDACTED]")
            .finish()
    }
}

impl TlsConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let cert_pem = get_optional_env("EZ_TLS_CERT");
        let key_pem = get_optional_env("EZ_TLS_KEY");

        match (cert_pem, key_pem) {
            (Some(cert), Some(key)) => Ok(Some(Self {
                cert_pem: cert,
                key_pem: SecretString::from(key),
            })),
            (None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "EZ_TLS_*".to_string(),
                "Both EZ_TLS_CERT and EZ_TLS_KEY must be set together".to_string(),
            )),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_required_secret("DATABASE_URL")?;
        let host = get_env_or_default("EZ_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("EZ_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("EZ_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("EZ_PORT".to_string(), e.to_string()))?;
        let base_url = parse_base_url("EZ_BASE_URL", &get_required_env("EZ_BASE_URL")?)?;
        let app_url = match get_optional_env("EZ_APP_URL") {
            Some(url) => parse_base_url("EZ_APP_URL", &url)?,
            None => format!("{base_url}/dashboard"),
        };
        let session_secret = get_validated_secret("EZ_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "EZ_SESSION_SECRET")?;
        let cookie_domain = get_optional_env("EZ_COOKIE_DOMAIN")
            .map(|d| validate_cookie_domain(&d, &base_url))
            .transpose()?;

        let magic_link_ttl = get_optional_env("EZ_MAGIC_LINK_TTL_MINUTES")
            .map(|v| {
                v.parse::<i64>()
                    .ok()
                    .filter(|m| *m > 0)
                    .ok_or_else(|| {
                        ConfigError::InvalidEnvVar(
                            "EZ_MAGIC_LINK_TTL_MINUTES".to_string(),
                            "must be a positive number of minutes".to_string(),
                        )
                    })
            })
            .transpose()?
            .unwrap_or(DEFAULT_MAGIC_LINK_TTL_MINUTES);

        let sync_interval = get_optional_env("EZ_SYNC_INTERVAL_SECS")
            .map(|v| {
                v.parse::<u64>()
                    .ok()
                    .filter(|s| *s > 0)
                    .map(Duration::from_secs)
                    .ok_or_else(|| {
                        ConfigError::InvalidEnvVar(
                            "EZ_SYNC_INTERVAL_SECS".to_string(),
                            "must be a positive number of seconds".to_string(),
                        )
                    })
            })
            .transpose()?;

        let shopify = ShopifyConfig::from_env()?;
        let email = EmailConfig::from_env()?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let tls = TlsConfig::from_env()?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            app_url,
            session_secret,
            cookie_domain,
            magic_link_ttl: chrono::Duration::minutes(magic_link_ttl),
            sync_interval,
            shopify,
            email,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
            tls,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }

    /// Redirect URI registered with Shopify for the OAuth callback.
    #[must_use]
    pub fn shopify_redirect_uri(&self) -> String {
        format!("{}/api/auth/shopify/callback", self.base_url)
    }
}

impl ShopifyConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_version: get_env_or_default("SHOPIFY_API_VERSION", DEFAULT_API_VERSION),
            client_id: get_required_env("SHOPIFY_CLIENT_ID")?,
            client_secret: get_validated_secret("SHOPIFY_CLIENT_SECRET")?,
            scopes: parse_scopes(&get_env_or_default("SHOPIFY_SCOPES", DEFAULT_SCOPES)),
        })
    }
}

impl EmailConfig {
    /// Load SMTP configuration.
    ///
    /// Returns `None` when no SMTP variable is set. A partial block is an error.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let host = get_optional_env("SMTP_HOST");
        let username = get_optional_env("SMTP_USERNAME");
        let password = get_optional_env("SMTP_PASSWORD");
        let from = get_optional_env("SMTP_FROM");

        match (host, username, password, from) {
            (None, None, None, None) => Ok(None),
            (Some(smtp_host), Some(smtp_username), Some(password), Some(from_address)) => {
                let smtp_port = get_env_or_default("SMTP_PORT", "587")
                    .parse::<u16>()
                    .map_err(|e| {
                        ConfigError::InvalidEnvVar("SMTP_PORT".to_string(), e.to_string())
                    })?;
                validate_secret_strength(&password, "SMTP_PASSWORD")?;
                Ok(Some(Self {
                    smtp_host,
                    smtp_port,
                    smtp_username,
                    smtp_password: SecretString::from(password),
                    from_address,
                }))
            }
            _ => Err(ConfigError::InvalidEnvVar(
                "SMTP_*".to_string(),
                "SMTP_HOST, SMTP_USERNAME, SMTP_PASSWORD and SMTP_FROM must be set together"
                    .to_string(),
            )),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Validate an absolute http(s) URL and strip any trailing slash.
fn parse_base_url(var_name: &str, value: &str) -> Result<String, ConfigError> {
    let parsed = url::Url::parse(value)
        .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            "must be an http or https URL".to_string(),
        ));
    }
    Ok(value.trim_end_matches('/').to_string())
}

/// The cookie domain must cover the host of the base URL, otherwise browsers
/// drop the session cookie.
fn validate_cookie_domain(domain: &str, base_url: &str) -> Result<String, ConfigError> {
    let domain = domain.trim().to_lowercase();
    let bare = domain.trim_start_matches('.');
    let host = url::Url::parse(base_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
        .unwrap_or_default();

    if bare.is_empty() || !(host == bare || host.ends_with(&format!(".{bare}"))) {
        return Err(ConfigError::InvalidEnvVar(
            "EZ_COOKIE_DOMAIN".to_string(),
            format!("'{domain}' does not cover base URL host '{host}'"),
        ));
    }
    Ok(domain)
}

/// Split a comma-separated scope list.
fn parse_scopes(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    pub(crate) fn test_config() -> AppConfig {
        AppConfig {
            database_url: SecretString::from("postgres://localhost/ez_apps_test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "https://api.ezapps.io".to_string(),
            app_url: "https://app.ezapps.io".to_string(),
            session_secret: SecretString::from("x".repeat(32)),
            cookie_domain: Some(".ezapps.io".to_string()),
            magic_link_ttl: chrono::Duration::minutes(15),
            sync_interval: None,
            shopify: ShopifyConfig {
                api_version: DEFAULT_API_VERSION.to_string(),
                client_id: "test_client_id".to_string(),
                client_secret: SecretString::from("shpss_test_client_value"),
                scopes: parse_scopes(DEFAULT_SCOPES),
            },
            email: None,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 1.0,
            tls: None,
        }
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-api-key-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_session_secret_too_short() {
        let secret = SecretString::from("short");
        assert!(validate_session_secret(&secret, "TEST_SESSION").is_err());
    }

    #[test]
    fn test_parse_scopes_trims_and_skips_empty() {
        assert_eq!(
            parse_scopes(" read_orders, ,read_products,"),
            vec!["read_orders".to_string(), "read_products".to_string()]
        );
    }

    #[test]
    fn test_parse_base_url_strips_trailing_slash() {
        assert_eq!(
            parse_base_url("X", "https://ezapps.io/").unwrap(),
            "https://ezapps.io"
        );
        assert!(parse_base_url("X", "ftp://ezapps.io").is_err());
        assert!(parse_base_url("X", "not a url").is_err());
    }

    #[test]
    fn test_cookie_domain_must_cover_host() {
        assert_eq!(
            validate_cookie_domain(".EZApps.io", "https://api.ezapps.io").unwrap(),
            ".ezapps.io"
        );
        assert!(validate_cookie_domain("ezapps.io", "https://ezapps.io").is_ok());
        assert!(validate_cookie_domain(".other.io", "https://api.ezapps.io").is_err());
        assert!(validate_cookie_domain("pps.io", "https://api.ezapps.io").is_err());
    }

    #[test]
    fn test_socket_addr_and_redirect_uri() {
        let config = test_config();
        assert_eq!(config.socket_addr().port(), 3000);
        assert!(config.is_secure());
        assert_eq!(
            config.shopify_redirect_uri(),
            "https://api.ezapps.io/api/auth/shopify/callback"
        );
    }

    #[test]
    fn test_shopify_config_debug_redacts_secrets() {
        let config = test_config().shopify;
        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("test_client_id"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("shpss_test_client_value"));
    }

    #[test]
    fn test_email_config_debug_redacts_secrets() {
        let config = EmailConfig {
            smtp_host: "smtp.ezapps.io".to_string(),
            smtp_port: 587,
            smtp_username: "mailer".to_string(),
            smtp_password: SecretString::from("super_secret_smtp_password"),
            from_address: "login@ezapps.io".to_string(),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("smtp.ezapps.io"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_smtp_password"));
    }
}

#[cfg(test)]
pub(crate) use tests::test_config;
