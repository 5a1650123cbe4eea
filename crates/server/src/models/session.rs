//! Session-related types for authentication.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

use ez_apps_core::{Email, ProfileId, UserRole};

use super::Profile;

/// Session-stored identity.
///
/// Minimal data stored in the session to identify the logged-in profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Profile database ID.
    pub id: ProfileId,
    /// Login email address.
    pub email: Email,
    /// Display name.
    pub full_name: String,
    /// Permission level.
    pub role: UserRole,
}

impl From<&Profile> for CurrentUser {
    fn from(profile: &Profile) -> Self {
        Self {
            id: profile.id,
            email: profile.email.clone(),
            full_name: profile.full_name.clone(),
            role: profile.role,
        }
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the Shopify OAuth CSRF state.
    pub const SHOPIFY_OAUTH_STATE: &str = "shopify_oauth_state";

    /// Key for the shop domain the OAuth flow was started for.
    pub const SHOPIFY_OAUTH_SHOP: &str = "shopify_oauth_shop";
}
