//! REST Admin API payloads and their conversion into upsert rows.
//!
//! Only the fields the sync stores are declared; serde ignores the rest.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use ez_apps_core::CurrencyCode;

use super::ShopifyError;
use crate::models::{NewItem, NewLineItem, NewOrder};

/// Shopify's placeholder title for single-variant products.
const DEFAULT_VARIANT_TITLE: &str = "Default Title";

// Rows stay raw until `decode_rows` so one odd row cannot fail the page.
#[derive(Debug, Deserialize)]
pub(crate) struct OrdersResponse {
    pub orders: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProductsResponse {
    pub products: Vec<serde_json::Value>,
}

/// A row of a fetched page that did not match the expected shape.
#[derive(Debug, Error)]
#[error("row {id:?} could not be decoded: {source}")]
pub struct UndecodedRow {
    /// Shopify ID, when the row carried a numeric `id`.
    pub id: Option<i64>,
    #[source]
    pub source: serde_json::Error,
}

/// One decoded row of a fetched page.
pub type PageRow<T> = Result<T, UndecodedRow>;

/// Decode each raw row on its own.
pub(crate) fn decode_rows<T: DeserializeOwned>(rows: Vec<serde_json::Value>) -> Vec<PageRow<T>> {
    rows.into_iter()
        .map(|row| {
            let id = row.get("id").and_then(serde_json::Value::as_i64);
            serde_json::from_value(row).map_err(|source| UndecodedRow { id, source })
        })
        .collect()
}

/// An order from `orders.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct RestOrder {
    pub id: i64,
    /// Display name, e.g. `#1001`.
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub financial_status: Option<String>,
    #[serde(default)]
    pub fulfillment_status: Option<String>,
    pub total_price: Decimal,
    #[serde(default)]
    pub subtotal_price: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub line_items: Vec<RestLineItem>,
}

/// A line item nested in an order.
#[derive(Debug, Clone, Deserialize)]
pub struct RestLineItem {
    pub id: i64,
    #[serde(default)]
    pub product_id: Option<i64>,
    #[serde(default)]
    pub variant_id: Option<i64>,
    #[serde(default)]
    pub sku: Option<String>,
    pub title: String,
    #[serde(default)]
    pub variant_title: Option<String>,
    pub quantity: i32,
    #[serde(default)]
    pub fulfillable_quantity: Option<i32>,
    pub price: Decimal,
}

/// A product from `products.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct RestProduct {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub variants: Vec<RestVariant>,
}

/// A product variant.
#[derive(Debug, Clone, Deserialize)]
pub struct RestVariant {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub inventory_quantity: i32,
}

/// Treat empty strings as absent.
fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty()).cloned()
}

impl RestOrder {
    /// Build the order upsert row.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::InvalidPayload` if the currency is not an ISO code.
    pub fn to_new_order(&self) -> Result<NewOrder, ShopifyError> {
        let currency = match self.currency.as_deref() {
            Some(code) => CurrencyCode::parse(code)
                .map_err(|e| ShopifyError::InvalidPayload(format!("order {}: {e}", self.id)))?,
            None => CurrencyCode::USD,
        };

        Ok(NewOrder {
            shopify_order_id: self.id,
            order_number: self.name.clone(),
            email: non_empty(self.email.as_ref()),
            financial_status: self.financial_status.clone(),
            fulfillment_status: self.fulfillment_status.clone(),
            total_price: self.total_price,
            subtotal_price: self.subtotal_price,
            currency,
            cancelled_at: self.cancelled_at,
            closed_at: self.closed_at,
            processed_at: self.processed_at,
            shopify_created_at: self.created_at,
            shopify_updated_at: self.updated_at,
        })
    }
}

impl From<&RestLineItem> for NewLineItem {
    fn from(item: &RestLineItem) -> Self {
        Self {
            shopify_line_item_id: item.id,
            shopify_product_id: item.product_id,
            shopify_variant_id: item.variant_id,
            sku: non_empty(item.sku.as_ref()),
            title: item.title.clone(),
            variant_title: non_empty(item.variant_title.as_ref()),
            quantity: item.quantity,
            // Older API versions omit it; an unfulfilled item owes its full quantity.
            fulfillable_quantity: item.fulfillable_quantity.unwrap_or(item.quantity).max(0),
            price: item.price,
        }
    }
}

impl RestProduct {
    /// Build one item upsert row per variant.
    #[must_use]
    pub fn to_new_items(&self) -> Vec<NewItem> {
        self.variants
            .iter()
            .map(|variant| NewItem {
                shopify_product_id: self.id,
                shopify_variant_id: variant.id,
                sku: non_empty(variant.sku.as_ref()),
                title: self.title.clone(),
                variant_title: non_empty(variant.title.as_ref())
                    .filter(|t| t != DEFAULT_VARIANT_TITLE),
                price: variant.price,
                inventory_quantity: variant.inventory_quantity,
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::str::FromStr;

    use super::*;

    const ORDERS_JSON: &str = r##"{
        "orders": [
            {
                "id": 450789469,
                "name": "#1001",
                "email": "bob.norman@example.com",
                "financial_status": "paid",
                "fulfillment_status": null,
                "total_price": "598.94",
                "subtotal_price": "597.00",
                "currency": "usd",
                "cancelled_at": null,
                "closed_at": null,
                "processed_at": "2024-03-13T16:09:54-04:00",
                "created_at": "2024-03-13T16:09:54-04:00",
                "updated_at": "2024-03-13T16:09:54-04:00",
                "tags": "ignored",
                "line_items": [
                    {
                        "id": 466157049,
                        "product_id": 632910392,
                        "variant_id": 39072856,
                        "sku": "IPOD2008GREEN",
                        "title": "IPod Nano - 8gb",
                        "variant_title": "green",
                        "quantity": 1,
                        "fulfillable_quantity": 1,
                        "price": "199.00"
                    },
                    {
                        "id": 518995019,
                        "product_id": null,
                        "variant_id": null,
                        "sku": "",
                        "title": "Custom engraving",
                        "variant_title": null,
                        "quantity": 2,
                        "price": "5.00"
                    }
                ]
            }
        ]
    }"##;

    const PRODUCTS_JSON: &str = r#"{
        "products": [
            {
                "id": 632910392,
                "title": "IPod Nano - 8GB",
                "variants": [
                    {"id": 808950810, "title": "Pink", "sku": "IPOD2008PINK", "price": "199.00", "inventory_quantity": 10},
                    {"id": 49148385, "title": "Red", "sku": "", "price": "199.00", "inventory_quantity": -2}
                ]
            },
            {
                "id": 921728736,
                "title": "IPod Touch 8GB",
                "variants": [
                    {"id": 447654529, "title": "Default Title", "sku": "IPOD2009BLACK", "price": "199.00"}
                ]
            }
        ]
    }"#;

    #[test]
    fn test_order_payload_converts_to_upsert_rows() {
        let response: OrdersResponse = serde_json::from_str(ORDERS_JSON).unwrap();
        let rows: Vec<PageRow<RestOrder>> = decode_rows(response.orders);
        let order = rows[0].as_ref().unwrap();
        let new_order = order.to_new_order().unwrap();

        assert_eq!(new_order.shopify_order_id, 450_789_469);
        assert_eq!(new_order.order_number, "#1001");
        assert_eq!(new_order.total_price, Decimal::from_str("598.94").unwrap());
        assert_eq!(new_order.currency, CurrencyCode::USD);
        assert_eq!(
            new_order.shopify_created_at.to_rfc3339(),
            "2024-03-13T20:09:54+00:00"
        );
        assert!(new_order.fulfillment_status.is_none());

        let items: Vec<NewLineItem> = order.line_items.iter().map(NewLineItem::from).collect();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].shopify_variant_id, Some(39_072_856));
        assert_eq!(items[0].fulfillable_quantity, 1);
        assert_eq!(items[1].sku, None);
        assert_eq!(items[1].shopify_variant_id, None);
        assert_eq!(items[1].fulfillable_quantity, 2);
    }

    #[test]
    fn test_order_with_invalid_currency_is_rejected() {
        let json = r##"{"id": 1, "name": "#1", "total_price": "1.00", "currency": "dollars",
                        "created_at": "2024-01-01T00:00:00Z"}"##;
        let order: RestOrder = serde_json::from_str(json).unwrap();
        assert!(matches!(
            order.to_new_order(),
            Err(ShopifyError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_order_without_currency_defaults_to_usd() {
        let json = r##"{"id": 1, "name": "#1", "total_price": "1.00",
                        "created_at": "2024-01-01T00:00:00Z"}"##;
        let order: RestOrder = serde_json::from_str(json).unwrap();
        assert_eq!(order.to_new_order().unwrap().currency, CurrencyCode::USD);
        assert!(order.line_items.is_empty());
    }

    #[test]
    fn test_product_payload_flattens_variants() {
        let response: ProductsResponse = serde_json::from_str(PRODUCTS_JSON).unwrap();
        let products: Vec<PageRow<RestProduct>> = decode_rows(response.products);
        let items: Vec<NewItem> = products
            .iter()
            .flatten()
            .flat_map(RestProduct::to_new_items)
            .collect();

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].variant_title.as_deref(), Some("Pink"));
        assert_eq!(items[0].inventory_quantity, 10);
        assert_eq!(items[1].sku, None);
        assert_eq!(items[1].inventory_quantity, -2);
        assert_eq!(items[2].variant_title, None);
        assert_eq!(items[2].inventory_quantity, 0);
        assert_eq!(items[2].shopify_product_id, 921_728_736);
    }

    #[test]
    fn test_malformed_row_does_not_sink_the_page() {
        let json = r##"{"orders": [
            {"id": 1, "name": "#1", "total_price": "1.00", "created_at": "2024-01-01T00:00:00Z"},
            {"id": 2, "name": "#2", "total_price": {"amount": "oops"}, "created_at": "2024-01-01T00:00:00Z"},
            {"name": "#3"}
        ]}"##;
        let response: OrdersResponse = serde_json::from_str(json).unwrap();
        let rows: Vec<PageRow<RestOrder>> = decode_rows(response.orders);

        assert_eq!(rows.len(), 3);
        assert!(matches!(&rows[0], Ok(order) if order.id == 1));
        assert!(matches!(&rows[1], Err(e) if e.id == Some(2)));
        assert!(matches!(&rows[2], Err(e) if e.id.is_none()));
    }
}
