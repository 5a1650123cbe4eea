//! Profile (tenant account) domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use ez_apps_core::{Email, PlanId, ProfileId, SubscriptionStatus, UserRole};

/// A merchant or superadmin account.
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    /// Unique profile ID.
    pub id: ProfileId,
    /// Login email address (unique, normalized).
    pub email: Email,
    /// Display name.
    pub full_name: String,
    /// Permission level.
    pub role: UserRole,
    /// Chosen billing plan, if any.
    pub plan_id: Option<PlanId>,
    /// Billing subscription state.
    pub subscription_status: SubscriptionStatus,
    /// When the profile was created.
    pub created_at: DateTime<Utc>,
    /// When the profile was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Returns true if this profile can use the superadmin panel.
    #[must_use]
    pub fn is_superadmin(&self) -> bool {
        self.role == UserRole::Superadmin
    }
}
