//! Inventory item repository (product variants pulled from `products.json`).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use ez_apps_core::{ItemId, StoreId};

use super::RepositoryError;
use crate::models::{Item, NewItem};

#[derive(Debug, sqlx::FromRow)]
struct ItemRow {
    id: i32,
    store_id: i32,
    shopify_product_id: i64,
    shopify_variant_id: i64,
    sku: Option<String>,
    title: String,
    variant_title: Option<String>,
    price: Decimal,
    inventory_quantity: i32,
    committed_stock: i32,
    updated_at: DateTime<Utc>,
}

impl From<ItemRow> for Item {
    fn from(row: ItemRow) -> Self {
        Self {
            id: ItemId::new(row.id),
            store_id: StoreId::new(row.store_id),
            shopify_product_id: row.shopify_product_id,
            shopify_variant_id: row.shopify_variant_id,
            sku: row.sku,
            title: row.title,
            variant_title: row.variant_title,
            price: row.price,
            inventory_quantity: row.inventory_quantity,
            committed_stock: row.committed_stock,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for synced inventory items.
pub struct ItemRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ItemRepository<'a> {
    /// Create a new item repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Upsert a product variant. `committed_stock` is owned by the stored
    /// procedure and never written here.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(&self, store_id: StoreId, item: &NewItem) -> Result<ItemId, RepositoryError> {
        let id = sqlx::query_scalar::<_, i32>(
            r"
            INSERT INTO items (
                store_id, shopify_product_id, shopify_variant_id, sku, title,
                variant_title, price, inventory_quantity
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (store_id, shopify_variant_id) DO UPDATE SET
                shopify_product_id = EXCLUDED.shopify_product_id,
                sku = EXCLUDED.sku,
                title = EXCLUDED.title,
                variant_title = EXCLUDED.variant_title,
                price = EXCLUDED.price,
                inventory_quantity = EXCLUDED.inventory_quantity,
                updated_at = now()
            RETURNING id
            ",
        )
        .bind(store_id)
        .bind(item.shopify_product_id)
        .bind(item.shopify_variant_id)
        .bind(item.sku.as_deref())
        .bind(&item.title)
        .bind(item.variant_title.as_deref())
        .bind(item.price)
        .bind(item.inventory_quantity)
        .fetch_one(self.pool)
        .await?;

        Ok(ItemId::new(id))
    }

    /// List a store's items ordered by title.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_store(&self, store_id: StoreId) -> Result<Vec<Item>, RepositoryError> {
        let rows = sqlx::query_as::<_, ItemRow>(
            r"
            SELECT id, store_id, shopify_product_id, shopify_variant_id, sku, title,
                   variant_title, price, inventory_quantity, committed_stock, updated_at
            FROM items
            WHERE store_id = $1
            ORDER BY title, variant_title NULLS FIRST, id
            ",
        )
        .bind(store_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Item::from).collect())
    }
}
