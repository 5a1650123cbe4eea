//! Store repository for database operations.
//!
//! Stores are created by the Shopify OAuth callback. Access tokens are kept in
//! plain text columns and wrapped in `SecretString` as soon as they are read.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use sqlx::PgPool;

use ez_apps_core::{ProfileId, StoreId, StoreStatus};

use super::{RepositoryError, split_scopes};
use crate::models::Store;

#[derive(Debug, sqlx::FromRow)]
struct StoreRow {
    id: i32,
    profile_id: i32,
    shop_domain: String,
    name: String,
    access_token: Option<String>,
    scopes: String,
    status: StoreStatus,
    last_synced_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<StoreRow> for Store {
    fn from(row: StoreRow) -> Self {
        Self {
            id: StoreId::new(row.id),
            profile_id: ProfileId::new(row.profile_id),
            shop_domain: row.shop_domain,
            name: row.name,
            access_token: row.access_token.map(SecretString::from),
            scopes: split_scopes(&row.scopes),
            status: row.status,
            last_synced_at: row.last_synced_at,
            created_at: row.created_at,
        }
    }
}

const STORE_COLUMNS: &str = "id, profile_id, shop_domain, name, access_token, scopes, status, \
                             last_synced_at, created_at";

/// Repository for store database operations.
pub struct StoreRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StoreRepository<'a> {
    /// Create a new store repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert or refresh a connected store after a successful OAuth exchange.
    ///
    /// Reconnecting a shop owned by the same profile replaces its token and
    /// scopes. A shop already owned by another profile is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the shop belongs to another profile.
    pub async fn upsert_connected(
        &self,
        profile_id: ProfileId,
        shop_domain: &str,
        name: &str,
        access_token: &str,
        scopes: &[String],
    ) -> Result<Store, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRow>(&format!(
            r"
            INSERT INTO stores (profile_id, shop_domain, name, access_token, scopes, status)
            VALUES ($1, $2, $3, $4, $5, 'connected')
            ON CONFLICT (shop_domain) DO UPDATE SET
                access_token = EXCLUDED.access_token,
                scopes = EXCLUDED.scopes,
                status = 'connected',
                updated_at = now()
            WHERE stores.profile_id = EXCLUDED.profile_id
            RETURNING {STORE_COLUMNS}
            "
        ))
        .bind(profile_id)
        .bind(shop_domain)
        .bind(name)
        .bind(access_token)
        .bind(scopes.join(","))
        .fetch_optional(self.pool)
        .await?;

        row.map(Store::from).ok_or_else(|| {
            RepositoryError::Conflict(format!(
                "{shop_domain} is already connected to another account"
            ))
        })
    }

    /// Get a store by ID regardless of owner.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: StoreId) -> Result<Option<Store>, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRow>(&format!(
            "SELECT {STORE_COLUMNS} FROM stores WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Store::from))
    }

    /// Get a store only if it belongs to the given profile.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_owned(
        &self,
        id: StoreId,
        profile_id: ProfileId,
    ) -> Result<Option<Store>, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRow>(&format!(
            "SELECT {STORE_COLUMNS} FROM stores WHERE id = $1 AND profile_id = $2"
        ))
        .bind(id)
        .bind(profile_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Store::from))
    }

    /// List the stores of a profile.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_profile(
        &self,
        profile_id: ProfileId,
    ) -> Result<Vec<Store>, RepositoryError> {
        let rows = sqlx::query_as::<_, StoreRow>(&format!(
            "SELECT {STORE_COLUMNS} FROM stores WHERE profile_id = $1 ORDER BY created_at"
        ))
        .bind(profile_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Store::from).collect())
    }

    /// List every store (superadmin view).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Store>, RepositoryError> {
        let rows = sqlx::query_as::<_, StoreRow>(&format!(
            "SELECT {STORE_COLUMNS} FROM stores ORDER BY created_at DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Store::from).collect())
    }

    /// List stores that have an access token, for the scheduled sync.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_connected(&self) -> Result<Vec<Store>, RepositoryError> {
        let rows = sqlx::query_as::<_, StoreRow>(&format!(
            "SELECT {STORE_COLUMNS} FROM stores \
             WHERE status = 'connected' AND access_token IS NOT NULL ORDER BY id"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Store::from).collect())
    }

    /// Count the stores of a profile (plan limits).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_for_profile(&self, profile_id: ProfileId) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM stores WHERE profile_id = $1")
            .bind(profile_id)
            .fetch_one(self.pool)
            .await?;

        Ok(count)
    }

    /// Rename a store owned by the given profile.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no owned store matches.
    pub async fn rename(
        &self,
        id: StoreId,
        profile_id: ProfileId,
        name: &str,
    ) -> Result<Store, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRow>(&format!(
            "UPDATE stores SET name = $3, updated_at = now() \
             WHERE id = $1 AND profile_id = $2 RETURNING {STORE_COLUMNS}"
        ))
        .bind(id)
        .bind(profile_id)
        .bind(name)
        .fetch_optional(self.pool)
        .await?;

        row.map(Store::from).ok_or(RepositoryError::NotFound)
    }

    /// Clear the access token and mark the store disconnected.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn disconnect(&self, id: StoreId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE stores SET access_token = NULL, status = 'disconnected', updated_at = now() \
             WHERE id = $1",
        )
        .bind(id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Record a completed sync.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn mark_synced(&self, id: StoreId, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE stores SET last_synced_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(self.pool)
            .await?;

        Ok(())
    }
}
