//! Status enums for profiles, stores and subscriptions.

use serde::{Deserialize, Serialize};

/// Role of a profile.
///
/// Every signed-up merchant is a `Customer`; `Superadmin` unlocks the
/// superadmin panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Regular merchant account.
    #[default]
    Customer,
    /// Platform operator with access to every tenant.
    Superadmin,
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Customer => write!(f, "customer"),
            Self::Superadmin => write!(f, "superadmin"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Self::Customer),
            "superadmin" => Ok(Self::Superadmin),
            _ => Err(format!("invalid user role: {s}")),
        }
    }
}

/// Connection state of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "store_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum StoreStatus {
    /// OAuth completed and an access token is stored.
    Connected,
    /// Token cleared by the merchant or rejected by Shopify.
    Disconnected,
}

/// Billing subscription state of a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "subscription_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// No plan chosen yet.
    #[default]
    None,
    /// Plan chosen and active.
    Active,
    /// Plan canceled by the merchant.
    Canceled,
}

impl SubscriptionStatus {
    /// Whether the profile currently has an active plan.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_role_roundtrip() {
        for role in [UserRole::Customer, UserRole::Superadmin] {
            assert_eq!(role.to_string().parse::<UserRole>(), Ok(role));
        }
        assert!("admin".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_status_serde_names() {
        assert_eq!(
            serde_json::to_string(&StoreStatus::Disconnected).unwrap_or_default(),
            "\"disconnected\""
        );
        assert_eq!(
            serde_json::to_string(&SubscriptionStatus::Canceled).unwrap_or_default(),
            "\"canceled\""
        );
    }

    #[test]
    fn test_subscription_is_active() {
        assert!(SubscriptionStatus::Active.is_active());
        assert!(!SubscriptionStatus::None.is_active());
        assert!(!SubscriptionStatus::Canceled.is_active());
    }
}
