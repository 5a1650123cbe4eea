//! Billing plan domain types.

use serde::Serialize;

use ez_apps_core::{PlanId, Price};

/// A subscription plan.
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub id: PlanId,
    /// Stable identifier used by the API (e.g., "growth").
    pub slug: String,
    pub name: String,
    /// Monthly price.
    pub price: Price,
    /// Maximum number of stores a profile on this plan may connect.
    pub max_stores: i32,
    pub is_active: bool,
}

impl Plan {
    /// Returns true if a profile owning `store_count` stores fits this plan.
    #[must_use]
    pub fn allows_store_count(&self, store_count: i64) -> bool {
        store_count <= i64::from(self.max_stores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ez_apps_core::CurrencyCode;

    #[test]
    fn test_allows_store_count() {
        let plan = Plan {
            id: PlanId::new(1),
            slug: "starter".to_string(),
            name: "Starter".to_string(),
            price: Price::zero(CurrencyCode::USD),
            max_stores: 1,
            is_active: true,
        };
        assert!(plan.allows_store_count(0));
        assert!(plan.allows_store_count(1));
        assert!(!plan.allows_store_count(2));
    }
}
