//! Synced order and line item repository.
//!
//! All writes are idempotent upserts keyed by the composite unique
//! constraints `(store_id, shopify_order_id)` and
//! `(store_id, shopify_line_item_id)`, so re-syncing the same page is safe.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use ez_apps_core::{CurrencyCode, LineItemId, OrderId, StoreId};

use super::RepositoryError;
use crate::models::{LineItem, NewLineItem, NewOrder, Order, OrderWithLineItems};

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    store_id: i32,
    shopify_order_id: i64,
    order_number: String,
    email: Option<String>,
    financial_status: Option<String>,
    fulfillment_status: Option<String>,
    total_price: Decimal,
    subtotal_price: Option<Decimal>,
    currency: String,
    cancelled_at: Option<DateTime<Utc>>,
    closed_at: Option<DateTime<Utc>>,
    processed_at: Option<DateTime<Utc>>,
    shopify_created_at: DateTime<Utc>,
    synced_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let currency = CurrencyCode::parse(&row.currency).map_err(|e| {
            RepositoryError::DataCorruption(format!("order {}: {e}", row.shopify_order_id))
        })?;

        Ok(Self {
            id: OrderId::new(row.id),
            store_id: StoreId::new(row.store_id),
            shopify_order_id: row.shopify_order_id,
            order_number: row.order_number,
            email: row.email,
            financial_status: row.financial_status,
            fulfillment_status: row.fulfillment_status,
            total_price: row.total_price,
            subtotal_price: row.subtotal_price,
            currency,
            cancelled_at: row.cancelled_at,
            closed_at: row.closed_at,
            processed_at: row.processed_at,
            shopify_created_at: row.shopify_created_at,
            synced_at: row.synced_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LineItemRow {
    id: i32,
    order_id: i32,
    shopify_line_item_id: i64,
    shopify_product_id: Option<i64>,
    shopify_variant_id: Option<i64>,
    sku: Option<String>,
    title: String,
    variant_title: Option<String>,
    quantity: i32,
    fulfillable_quantity: i32,
    price: Decimal,
}

impl From<LineItemRow> for LineItem {
    fn from(row: LineItemRow) -> Self {
        Self {
            id: LineItemId::new(row.id),
            order_id: OrderId::new(row.order_id),
            shopify_line_item_id: row.shopify_line_item_id,
            shopify_product_id: row.shopify_product_id,
            shopify_variant_id: row.shopify_variant_id,
            sku: row.sku,
            title: row.title,
            variant_title: row.variant_title,
            quantity: row.quantity,
            fulfillable_quantity: row.fulfillable_quantity,
            price: row.price,
        }
    }
}

/// Repository for synced orders.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Upsert an order and return its local ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_order(
        &self,
        store_id: StoreId,
        order: &NewOrder,
    ) -> Result<OrderId, RepositoryError> {
        let id = sqlx::query_scalar::<_, i32>(
            r"
            INSERT INTO shopify_orders (
                store_id, shopify_order_id, order_number, email, financial_status,
                fulfillment_status, total_price, subtotal_price, currency, cancelled_at,
                closed_at, processed_at, shopify_created_at, shopify_updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (store_id, shopify_order_id) DO UPDATE SET
                order_number = EXCLUDED.order_number,
                email = EXCLUDED.email,
                financial_status = EXCLUDED.financial_status,
                fulfillment_status = EXCLUDED.fulfillment_status,
                total_price = EXCLUDED.total_price,
                subtotal_price = EXCLUDED.subtotal_price,
                currency = EXCLUDED.currency,
                cancelled_at = EXCLUDED.cancelled_at,
                closed_at = EXCLUDED.closed_at,
                processed_at = EXCLUDED.processed_at,
                shopify_updated_at = EXCLUDED.shopify_updated_at,
                synced_at = now()
            RETURNING id
            ",
        )
        .bind(store_id)
        .bind(order.shopify_order_id)
        .bind(&order.order_number)
        .bind(order.email.as_deref())
        .bind(order.financial_status.as_deref())
        .bind(order.fulfillment_status.as_deref())
        .bind(order.total_price)
        .bind(order.subtotal_price)
        .bind(order.currency.as_str())
        .bind(order.cancelled_at)
        .bind(order.closed_at)
        .bind(order.processed_at)
        .bind(order.shopify_created_at)
        .bind(order.shopify_updated_at)
        .fetch_one(self.pool)
        .await?;

        Ok(OrderId::new(id))
    }

    /// Upsert a line item belonging to an already-upserted order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_line_item(
        &self,
        store_id: StoreId,
        order_id: OrderId,
        item: &NewLineItem,
    ) -> Result<LineItemId, RepositoryError> {
        let id = sqlx::query_scalar::<_, i32>(
            r"
            INSERT INTO order_line_items (
                store_id, order_id, shopify_line_item_id, shopify_product_id,
                shopify_variant_id, sku, title, variant_title, quantity,
                fulfillable_quantity, price
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (store_id, shopify_line_item_id) DO UPDATE SET
                order_id = EXCLUDED.order_id,
                shopify_product_id = EXCLUDED.shopify_product_id,
                shopify_variant_id = EXCLUDED.shopify_variant_id,
                sku = EXCLUDED.sku,
                title = EXCLUDED.title,
                variant_title = EXCLUDED.variant_title,
                quantity = EXCLUDED.quantity,
                fulfillable_quantity = EXCLUDED.fulfillable_quantity,
                price = EXCLUDED.price,
                synced_at = now()
            RETURNING id
            ",
        )
        .bind(store_id)
        .bind(order_id)
        .bind(item.shopify_line_item_id)
        .bind(item.shopify_product_id)
        .bind(item.shopify_variant_id)
        .bind(item.sku.as_deref())
        .bind(&item.title)
        .bind(item.variant_title.as_deref())
        .bind(item.quantity)
        .bind(item.fulfillable_quantity)
        .bind(item.price)
        .fetch_one(self.pool)
        .await?;

        Ok(LineItemId::new(id))
    }

    /// Run the `recalculate_committed_stock` stored procedure for a store.
    ///
    /// Returns the number of item rows the procedure touched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the call fails.
    pub async fn recalculate_committed_stock(
        &self,
        store_id: StoreId,
    ) -> Result<i32, RepositoryError> {
        let touched = sqlx::query_scalar::<_, i32>("SELECT recalculate_committed_stock($1)")
            .bind(store_id)
            .fetch_one(self.pool)
            .await?;

        Ok(touched)
    }

    /// List a page of orders for a store, newest first, with their line items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_store(
        &self,
        store_id: StoreId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<OrderWithLineItems>, RepositoryError> {
        let orders: Vec<Order> = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, store_id, shopify_order_id, order_number, email, financial_status,
                   fulfillment_status, total_price, subtotal_price, currency, cancelled_at,
                   closed_at, processed_at, shopify_created_at, synced_at
            FROM shopify_orders
            WHERE store_id = $1
            ORDER BY shopify_created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            ",
        )
        .bind(store_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .map(TryInto::try_into)
        .collect::<Result<_, _>>()?;

        if orders.is_empty() {
            return Ok(Vec::new());
        }

        let order_ids: Vec<i32> = orders.iter().map(|o| o.id.as_i32()).collect();
        let rows = sqlx::query_as::<_, LineItemRow>(
            r"
            SELECT id, order_id, shopify_line_item_id, shopify_product_id, shopify_variant_id,
                   sku, title, variant_title, quantity, fulfillable_quantity, price
            FROM order_line_items
            WHERE order_id = ANY($1)
            ORDER BY id
            ",
        )
        .bind(&order_ids)
        .fetch_all(self.pool)
        .await?;

        let mut by_order: HashMap<OrderId, Vec<LineItem>> = HashMap::new();
        for row in rows {
            let item = LineItem::from(row);
            by_order.entry(item.order_id).or_default().push(item);
        }

        Ok(orders
            .into_iter()
            .map(|order| {
                let line_items = by_order.remove(&order.id).unwrap_or_default();
                OrderWithLineItems { order, line_items }
            })
            .collect())
    }
}
