//! App catalog domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use ez_apps_core::{AppId, StoreId};

/// An app merchants can enable on their stores.
#[derive(Debug, Clone, Serialize)]
pub struct App {
    pub id: AppId,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub is_active: bool,
}

/// An app enabled on a store, with its per-store settings.
#[derive(Debug, Clone, Serialize)]
pub struct StoreApp {
    pub store_id: StoreId,
    pub app_id: AppId,
    pub slug: String,
    pub name: String,
    pub settings: serde_json::Value,
    pub enabled_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
