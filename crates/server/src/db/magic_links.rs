//! Magic link repository.
//!
//! Only the SHA-256 hash of a token is stored. Consumption is a single
//! conditional `UPDATE`, so two concurrent verifications of the same link
//! cannot both succeed.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use ez_apps_core::{MagicLinkId, ProfileId};

use super::RepositoryError;

/// Repository for magic link tokens.
pub struct MagicLinkRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> MagicLinkRepository<'a> {
    /// Create a new magic link repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a new hashed token.
    ///
    /// `issued_by` is set when a superadmin generated the link for someone else.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` on a (vanishingly unlikely) hash collision.
    pub async fn create(
        &self,
        profile_id: ProfileId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
        issued_by: Option<ProfileId>,
    ) -> Result<MagicLinkId, RepositoryError> {
        let id = sqlx::query_scalar::<_, i32>(
            r"
            INSERT INTO magic_links (profile_id, token_hash, expires_at, issued_by)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            ",
        )
        .bind(profile_id)
        .bind(token_hash)
        .bind(expires_at)
        .bind(issued_by)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "magic link token already exists"))?;

        Ok(MagicLinkId::new(id))
    }

    /// Mark an unused, unexpired token as used and return its profile.
    ///
    /// Returns `None` for unknown, expired, or already-used tokens.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn consume(&self, token_hash: &str) -> Result<Option<ProfileId>, RepositoryError> {
        let profile_id = sqlx::query_scalar::<_, i32>(
            r"
            UPDATE magic_links
            SET used_at = now()
            WHERE token_hash = $1
              AND used_at IS NULL
              AND expires_at > now()
            RETURNING profile_id
            ",
        )
        .bind(token_hash)
        .fetch_optional(self.pool)
        .await?;

        Ok(profile_id.map(ProfileId::new))
    }

    /// Delete links that expired or were used more than a day ago.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_stale(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r"
            DELETE FROM magic_links
            WHERE expires_at < now() - INTERVAL '1 day'
               OR used_at < now() - INTERVAL '1 day'
            ",
        )
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
