//! Synced Shopify order, line item and inventory item types.
//!
//! `New*` types are the upsert inputs produced from Shopify REST payloads;
//! the plain types are what the repositories read back.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use ez_apps_core::{CurrencyCode, ItemId, LineItemId, OrderId, StoreId};

/// A synced order.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub store_id: StoreId,
    pub shopify_order_id: i64,
    /// Shopify's display name, e.g. `#1001`.
    pub order_number: String,
    pub email: Option<String>,
    pub financial_status: Option<String>,
    pub fulfillment_status: Option<String>,
    pub total_price: Decimal,
    pub subtotal_price: Option<Decimal>,
    pub currency: CurrencyCode,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub processed_at: Option<DateTime<Utc>>,
    pub shopify_created_at: DateTime<Utc>,
    pub synced_at: DateTime<Utc>,
}

/// A synced order line item.
#[derive(Debug, Clone, Serialize)]
pub struct LineItem {
    pub id: LineItemId,
    pub order_id: OrderId,
    pub shopify_line_item_id: i64,
    pub shopify_product_id: Option<i64>,
    pub shopify_variant_id: Option<i64>,
    pub sku: Option<String>,
    pub title: String,
    pub variant_title: Option<String>,
    pub quantity: i32,
    pub fulfillable_quantity: i32,
    pub price: Decimal,
}

/// An order together with its line items, as listed by the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct OrderWithLineItems {
    #[serde(flatten)]
    pub order: Order,
    pub line_items: Vec<LineItem>,
}

/// A synced product variant with its committed stock.
#[derive(Debug, Clone, Serialize)]
pub struct Item {
    pub id: ItemId,
    pub store_id: StoreId,
    pub shopify_product_id: i64,
    pub shopify_variant_id: i64,
    pub sku: Option<String>,
    pub title: String,
    pub variant_title: Option<String>,
    pub price: Decimal,
    pub inventory_quantity: i32,
    pub committed_stock: i32,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Units still available after subtracting committed stock.
    #[must_use]
    pub fn available(&self) -> i32 {
        self.inventory_quantity.saturating_sub(self.committed_stock)
    }
}

/// Upsert input for `shopify_orders`, keyed by `(store_id, shopify_order_id)`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub shopify_order_id: i64,
    pub order_number: String,
    pub email: Option<String>,
    pub financial_status: Option<String>,
    pub fulfillment_status: Option<String>,
    pub total_price: Decimal,
    pub subtotal_price: Option<Decimal>,
    pub currency: CurrencyCode,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub processed_at: Option<DateTime<Utc>>,
    pub shopify_created_at: DateTime<Utc>,
    pub shopify_updated_at: Option<DateTime<Utc>>,
}

/// Upsert input for `order_line_items`, keyed by `(store_id, shopify_line_item_id)`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLineItem {
    pub shopify_line_item_id: i64,
    pub shopify_product_id: Option<i64>,
    pub shopify_variant_id: Option<i64>,
    pub sku: Option<String>,
    pub title: String,
    pub variant_title: Option<String>,
    pub quantity: i32,
    pub fulfillable_quantity: i32,
    pub price: Decimal,
}

/// Upsert input for `items`, keyed by `(store_id, shopify_variant_id)`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewItem {
    pub shopify_product_id: i64,
    pub shopify_variant_id: i64,
    pub sku: Option<String>,
    pub title: String,
    pub variant_title: Option<String>,
    pub price: Decimal,
    pub inventory_quantity: i32,
}
