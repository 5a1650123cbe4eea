//! App catalog and per-store app installation repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use ez_apps_core::{AppId, StoreId};

use super::RepositoryError;
use crate::models::{App, StoreApp};

#[derive(Debug, sqlx::FromRow)]
struct AppRow {
    id: i32,
    slug: String,
    name: String,
    description: String,
    is_active: bool,
}

impl From<AppRow> for App {
    fn from(row: AppRow) -> Self {
        Self {
            id: AppId::new(row.id),
            slug: row.slug,
            name: row.name,
            description: row.description,
            is_active: row.is_active,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct StoreAppRow {
    store_id: i32,
    app_id: i32,
    slug: String,
    name: String,
    settings: serde_json::Value,
    enabled_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<StoreAppRow> for StoreApp {
    fn from(row: StoreAppRow) -> Self {
        Self {
            store_id: StoreId::new(row.store_id),
            app_id: AppId::new(row.app_id),
            slug: row.slug,
            name: row.name,
            settings: row.settings,
            enabled_at: row.enabled_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for the app catalog.
pub struct AppRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AppRepository<'a> {
    /// Create a new app repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List apps merchants can enable.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active(&self) -> Result<Vec<App>, RepositoryError> {
        let rows = sqlx::query_as::<_, AppRow>(
            "SELECT id, slug, name, description, is_active FROM apps WHERE is_active ORDER BY name",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(App::from).collect())
    }

    /// Get an active app by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_active_by_slug(&self, slug: &str) -> Result<Option<App>, RepositoryError> {
        let row = sqlx::query_as::<_, AppRow>(
            "SELECT id, slug, name, description, is_active FROM apps WHERE slug = $1 AND is_active",
        )
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(App::from))
    }

    /// Get an app by slug, active or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<App>, RepositoryError> {
        let row = sqlx::query_as::<_, AppRow>(
            "SELECT id, slug, name, description, is_active FROM apps WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(App::from))
    }

    /// Create or update a catalog entry by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(
        &self,
        slug: &str,
        name: &str,
        description: &str,
        is_active: bool,
    ) -> Result<App, RepositoryError> {
        let row = sqlx::query_as::<_, AppRow>(
            r"
            INSERT INTO apps (slug, name, description, is_active)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (slug) DO UPDATE SET
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                is_active = EXCLUDED.is_active
            RETURNING id, slug, name, description, is_active
            ",
        )
        .bind(slug)
        .bind(name)
        .bind(description)
        .bind(is_active)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// List the apps enabled on a store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_store(&self, store_id: StoreId) -> Result<Vec<StoreApp>, RepositoryError> {
        let rows = sqlx::query_as::<_, StoreAppRow>(
            r"
            SELECT sa.store_id, sa.app_id, a.slug, a.name, sa.settings, sa.enabled_at, sa.updated_at
            FROM store_apps sa
            JOIN apps a ON a.id = sa.app_id
            WHERE sa.store_id = $1
            ORDER BY a.name
            ",
        )
        .bind(store_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(StoreApp::from).collect())
    }

    /// Enable an app on a store, or replace its settings if already enabled.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn enable_for_store(
        &self,
        store_id: StoreId,
        app: &App,
        settings: &serde_json::Value,
    ) -> Result<StoreApp, RepositoryError> {
        let row = sqlx::query_as::<_, StoreAppRow>(
            r"
            WITH upserted AS (
                INSERT INTO store_apps (store_id, app_id, settings)
                VALUES ($1, $2, $3)
                ON CONFLICT (store_id, app_id) DO UPDATE SET
                    settings = EXCLUDED.settings,
                    updated_at = now()
                RETURNING store_id, app_id, settings, enabled_at, updated_at
            )
            SELECT u.store_id, u.app_id, a.slug, a.name, u.settings, u.enabled_at, u.updated_at
            FROM upserted u
            JOIN apps a ON a.id = u.app_id
            ",
        )
        .bind(store_id)
        .bind(app.id)
        .bind(settings)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Disable an app on a store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn disable_for_store(
        &self,
        store_id: StoreId,
        app_id: AppId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM store_apps WHERE store_id = $1 AND app_id = $2")
            .bind(store_id)
            .bind(app_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
