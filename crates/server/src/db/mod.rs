//! Database operations for `PostgreSQL`.
//!
//! ## Tables
//!
//! - `profiles` - Merchant and superadmin accounts
//! - `magic_links` - Hashed one-time login tokens
//! - `stores` - Connected Shopify stores and their access tokens
//! - `plans`, `apps`, `store_apps` - Billing plans and the app catalog
//! - `shopify_orders`, `order_line_items` - Synced orders (composite-key upserts)
//! - `items` - Synced product variants with committed stock
//! - `tower_sessions.session` - Session storage
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p ez-apps-cli -- migrate
//! ```

pub mod apps;
pub mod items;
pub mod magic_links;
pub mod orders;
pub mod plans;
pub mod profiles;
pub mod stores;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use apps::AppRepository;
pub use items::ItemRepository;
pub use magic_links::MagicLinkRepository;
pub use orders::OrderRepository;
pub use plans::PlanRepository;
pub use profiles::ProfileRepository;
pub use stores::StoreRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a unique-constraint violation to `Conflict`, passing other errors through.
    pub(crate) fn from_unique(err: sqlx::Error, message: &str) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                Self::Conflict(message.to_string())
            }
            _ => Self::Database(err),
        }
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Run the embedded migrations.
///
/// # Errors
///
/// Returns `sqlx::migrate::MigrateError` if a migration fails.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Split a stored comma-separated scope string.
pub(crate) fn split_scopes(scope: &str) -> Vec<String> {
    scope
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_scopes() {
        assert_eq!(
            split_scopes("read_orders, read_products,,"),
            vec!["read_orders".to_string(), "read_products".to_string()]
        );
        assert!(split_scopes("").is_empty());
    }

    #[test]
    fn test_from_unique_passes_through_other_errors() {
        let err = RepositoryError::from_unique(sqlx::Error::RowNotFound, "dup");
        assert!(matches!(err, RepositoryError::Database(_)));
    }
}
