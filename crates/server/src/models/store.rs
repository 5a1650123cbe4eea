//! Connected store domain types.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::Serialize;

use ez_apps_core::{ProfileId, StoreId, StoreStatus};

/// A connected Shopify store.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone)]
pub struct Store {
    /// Unique store ID.
    pub id: StoreId,
    /// Owning profile.
    pub profile_id: ProfileId,
    /// Shop domain (e.g., my-shop.myshopify.com).
    pub shop_domain: String,
    /// Display name chosen by the merchant.
    pub name: String,
    /// Offline access token. `None` once disconnected.
    pub access_token: Option<SecretString>,
    /// Granted scopes.
    pub scopes: Vec<String>,
    /// Connection state.
    pub status: StoreStatus,
    /// When orders were last synced.
    pub last_synced_at: Option<DateTime<Utc>>,
    /// When the store was first connected.
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("id", &self.id)
            .field("profile_id", &self.profile_id)
            .field("shop_domain", &self.shop_domain)
            .field("name", &self.name)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("scopes", &self.scopes)
            .field("status", &self.status)
            .field("last_synced_at", &self.last_synced_at)
            .finish_non_exhaustive()
    }
}

impl Store {
    /// Returns true if the store has a usable access token.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        matches!(self.status, StoreStatus::Connected) && self.access_token.is_some()
    }
}

/// Store as returned by the API. Never carries the access token.
#[derive(Debug, Clone, Serialize)]
pub struct StoreView {
    pub id: StoreId,
    pub profile_id: ProfileId,
    pub shop_domain: String,
    pub name: String,
    pub scopes: Vec<String>,
    pub status: StoreStatus,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&Store> for StoreView {
    fn from(store: &Store) -> Self {
        Self {
            id: store.id,
            profile_id: store.profile_id,
            shop_domain: store.shop_domain.clone(),
            name: store.name.clone(),
            scopes: store.scopes.clone(),
            status: store.status,
            last_synced_at: store.last_synced_at,
            created_at: store.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(token: Option<&str>, status: StoreStatus) -> Store {
        Store {
            id: StoreId::new(1),
            profile_id: ProfileId::new(2),
            shop_domain: "demo.myshopify.com".to_string(),
            name: "Demo".to_string(),
            access_token: token.map(|t| SecretString::from(t.to_string())),
            scopes: vec!["read_orders".to_string()],
            status,
            last_synced_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_debug_redacts_token() {
        let debug_output = format!("{:?}", store(Some("shpat_abc123"), StoreStatus::Connected));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("shpat_abc123"));
    }

    #[test]
    fn test_view_has_no_token() {
        let view = StoreView::from(&store(Some("shpat_abc123"), StoreStatus::Connected));
        let json = serde_json::to_string(&view).unwrap_or_default();
        assert!(json.contains("demo.myshopify.com"));
        assert!(!json.contains("shpat_abc123"));
    }

    #[test]
    fn test_is_connected() {
        assert!(store(Some("t"), StoreStatus::Connected).is_connected());
        assert!(!store(None, StoreStatus::Connected).is_connected());
        assert!(!store(Some("t"), StoreStatus::Disconnected).is_connected());
    }
}
