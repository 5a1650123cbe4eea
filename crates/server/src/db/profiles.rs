//! Profile repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use ez_apps_core::{Email, PlanId, ProfileId, SubscriptionStatus, UserRole};

use super::RepositoryError;
use crate::models::Profile;

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    id: i32,
    email: String,
    full_name: String,
    role: UserRole,
    plan_id: Option<i32>,
    subscription_status: SubscriptionStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = RepositoryError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: ProfileId::new(row.id),
            email,
            full_name: row.full_name,
            role: row.role,
            plan_id: row.plan_id.map(PlanId::new),
            subscription_status: row.subscription_status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const PROFILE_COLUMNS: &str = "id, email, full_name, role, plan_id, subscription_status, \
                               created_at, updated_at";

// =============================================================================
// Repository
// =============================================================================

/// Repository for profile database operations.
pub struct ProfileRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProfileRepository<'a> {
    /// Create a new profile repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List all profiles, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Profile>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles ORDER BY created_at DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Get a profile by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ProfileId) -> Result<Option<Profile>, RepositoryError> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get a profile by email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<Profile>, RepositoryError> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Create a profile.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email is already registered.
    pub async fn create(
        &self,
        email: &Email,
        full_name: &str,
        role: UserRole,
    ) -> Result<Profile, RepositoryError> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "INSERT INTO profiles (email, full_name, role) VALUES ($1, $2, $3) \
             RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(email.as_str())
        .bind(full_name)
        .bind(role)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "email already registered"))?;

        row.try_into()
    }

    /// Update the display name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the profile does not exist.
    pub async fn update_name(
        &self,
        id: ProfileId,
        full_name: &str,
    ) -> Result<Profile, RepositoryError> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "UPDATE profiles SET full_name = $2, updated_at = now() WHERE id = $1 \
             RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(id)
        .bind(full_name)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// Change a profile's role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the profile does not exist.
    pub async fn set_role(&self, id: ProfileId, role: UserRole) -> Result<Profile, RepositoryError> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "UPDATE profiles SET role = $2, updated_at = now() WHERE id = $1 \
             RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(id)
        .bind(role)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// Set the billing plan and subscription status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the profile does not exist.
    pub async fn set_subscription(
        &self,
        id: ProfileId,
        plan_id: Option<PlanId>,
        status: SubscriptionStatus,
    ) -> Result<Profile, RepositoryError> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "UPDATE profiles SET plan_id = $2, subscription_status = $3, updated_at = now() \
             WHERE id = $1 RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(id)
        .bind(plan_id)
        .bind(status)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }
}
