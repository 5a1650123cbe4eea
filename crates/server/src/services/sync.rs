//! Shopify order and product sync.
//!
//! A sync pulls the first page of a resource and upserts each row on its own.
//! A row that fails is logged and counted; the remaining rows still go
//! through. Committed stock is recalculated once per run, after all writes.
//! A 401/403 from Shopify disconnects the store.

use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::instrument;

use ez_apps_core::StoreId;

use crate::db::{ItemRepository, OrderRepository, RepositoryError, StoreRepository};
use crate::models::{NewLineItem, Store};
use crate::shopify::{PageRow, ShopifyClient, ShopifyError};

/// Errors that abort a whole sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The store has no access token.
    #[error("store {0} is not connected to Shopify")]
    NotConnected(StoreId),

    /// Shopify rejected the stored token; the store is now disconnected.
    #[error("store {0} access was revoked, reconnect it to sync")]
    Revoked(StoreId),

    /// Fetching from Shopify failed.
    #[error("shopify error: {0}")]
    Shopify(#[from] ShopifyError),

    /// A store-level database operation failed.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Result of an order sync.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub fetched: usize,
    pub orders_upserted: usize,
    pub line_items_upserted: usize,
    pub failures: usize,
}

/// Result of a product sync.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProductSyncReport {
    pub fetched: usize,
    pub items_upserted: usize,
    pub failures: usize,
}

/// Outcome for one store in [`SyncService::sync_all`].
#[derive(Debug, Clone, Serialize)]
pub struct StoreSyncOutcome {
    pub store_id: StoreId,
    pub shop_domain: String,
    pub orders: Option<SyncReport>,
    pub products: Option<ProductSyncReport>,
    pub error: Option<String>,
}

/// Service that copies Shopify data into the local tables.
pub struct SyncService<'a> {
    pool: &'a PgPool,
    shopify: &'a ShopifyClient,
}

impl<'a> SyncService<'a> {
    /// Create a new sync service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, shopify: &'a ShopifyClient) -> Self {
        Self { pool, shopify }
    }

    /// Sync the first page of a store's orders and their line items.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::NotConnected` without a token, `SyncError::Revoked`
    /// if Shopify rejects the token, or an error if the fetch, the committed
    /// stock recalculation or the sync timestamp fails.
    /// Individual row failures are counted in the report instead.
    #[instrument(skip(self, store), fields(store_id = %store.id, shop = %store.shop_domain))]
    pub async fn sync_orders(&self, store: &Store) -> Result<SyncReport, SyncError> {
        let token = connected_token(store)?;
        let orders = match self.shopify.fetch_orders(&store.shop_domain, token).await {
            Ok(orders) => orders,
            Err(e) => return Err(self.fetch_failed(store, e).await),
        };

        let repo = OrderRepository::new(self.pool);
        let mut report = SyncReport {
            fetched: orders.len(),
            ..SyncReport::default()
        };

        for row in &orders {
            let Some(order) = decoded(row, "order", &mut report.failures) else {
                continue;
            };
            let new_order = match order.to_new_order() {
                Ok(new_order) => new_order,
                Err(e) => {
                    tracing::warn!(shopify_order_id = order.id, error = %e, "Skipping order");
                    report.failures += 1;
                    continue;
                }
            };

            let order_id = match repo.upsert_order(store.id, &new_order).await {
                Ok(id) => id,
                Err(e) => {
                    tracing::error!(shopify_order_id = order.id, error = %e, "Order upsert failed");
                    report.failures += 1;
                    continue;
                }
            };
            report.orders_upserted += 1;

            for line_item in &order.line_items {
                match repo
                    .upsert_line_item(store.id, order_id, &NewLineItem::from(line_item))
                    .await
                {
                    Ok(_) => report.line_items_upserted += 1,
                    Err(e) => {
                        tracing::error!(
                            shopify_order_id = order.id,
                            shopify_line_item_id = line_item.id,
                            error = %e,
                            "Line item upsert failed"
                        );
                        report.failures += 1;
                    }
                }
            }
        }

        repo.recalculate_committed_stock(store.id).await?;
        StoreRepository::new(self.pool)
            .mark_synced(store.id, Utc::now())
            .await?;

        tracing::info!(
            fetched = report.fetched,
            orders = report.orders_upserted,
            line_items = report.line_items_upserted,
            failures = report.failures,
            "Order sync finished"
        );
        Ok(report)
    }

    /// Sync the first page of a store's products into `items`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::sync_orders`].
    #[instrument(skip(self, store), fields(store_id = %store.id, shop = %store.shop_domain))]
    pub async fn sync_products(&self, store: &Store) -> Result<ProductSyncReport, SyncError> {
        let token = connected_token(store)?;
        let products = match self
            .shopify
            .fetch_products(&store.shop_domain, token)
            .await
        {
            Ok(products) => products,
            Err(e) => return Err(self.fetch_failed(store, e).await),
        };

        let repo = ItemRepository::new(self.pool);
        let mut report = ProductSyncReport {
            fetched: products.len(),
            ..ProductSyncReport::default()
        };

        for row in &products {
            let Some(product) = decoded(row, "product", &mut report.failures) else {
                continue;
            };
            for item in product.to_new_items() {
                match repo.upsert(store.id, &item).await {
                    Ok(_) => report.items_upserted += 1,
                    Err(e) => {
                        tracing::error!(
                            shopify_variant_id = item.shopify_variant_id,
                            error = %e,
                            "Item upsert failed"
                        );
                        report.failures += 1;
                    }
                }
            }
        }

        // New variants start at zero committed stock until recalculated.
        OrderRepository::new(self.pool)
            .recalculate_committed_stock(store.id)
            .await?;

        tracing::info!(
            fetched = report.fetched,
            items = report.items_upserted,
            failures = report.failures,
            "Product sync finished"
        );
        Ok(report)
    }

    /// Sync orders then products for every connected store.
    ///
    /// A failing store is recorded in its outcome and the loop moves on.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store list cannot be loaded.
    pub async fn sync_all(&self) -> Result<Vec<StoreSyncOutcome>, SyncError> {
        let stores = StoreRepository::new(self.pool).list_connected().await?;
        let mut outcomes = Vec::with_capacity(stores.len());

        for store in &stores {
            let mut outcome = StoreSyncOutcome {
                store_id: store.id,
                shop_domain: store.shop_domain.clone(),
                orders: None,
                products: None,
                error: None,
            };

            let result = async {
                outcome.orders = Some(self.sync_orders(store).await?);
                outcome.products = Some(self.sync_products(store).await?);
                Ok::<_, SyncError>(())
            }
            .await;

            if let Err(e) = result {
                tracing::error!(store_id = %store.id, error = %e, "Store sync failed");
                outcome.error = Some(e.to_string());
            }
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    /// Turn a fetch error into a sync error, disconnecting the store when
    /// Shopify no longer accepts its token.
    async fn fetch_failed(&self, store: &Store, error: ShopifyError) -> SyncError {
        let error = classify_fetch_error(store.id, error);
        if matches!(error, SyncError::Revoked(_)) {
            match StoreRepository::new(self.pool).disconnect(store.id).await {
                Ok(_) => tracing::warn!(store_id = %store.id, "Access token rejected, store disconnected"),
                Err(e) => tracing::error!(store_id = %store.id, error = %e, "Failed to disconnect store"),
            }
        }
        error
    }
}

fn classify_fetch_error(store_id: StoreId, error: ShopifyError) -> SyncError {
    match error {
        ShopifyError::Unauthorized(_) => SyncError::Revoked(store_id),
        other => SyncError::Shopify(other),
    }
}

/// Unwrap a decoded page row, counting and logging one that failed.
fn decoded<'r, T>(row: &'r PageRow<T>, kind: &str, failures: &mut usize) -> Option<&'r T> {
    match row {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(kind, shopify_id = ?e.id, error = %e.source, "Skipping undecodable row");
            *failures += 1;
            None
        }
    }
}

fn connected_token(store: &Store) -> Result<&secrecy::SecretString, SyncError> {
    if !store.is_connected() {
        return Err(SyncError::NotConnected(store.id));
    }
    store
        .access_token
        .as_ref()
        .ok_or(SyncError::NotConnected(store.id))
}

/// Spawn the periodic sync of all connected stores.
///
/// The first run happens one full interval after startup. The caller aborts
/// the returned handle on shutdown.
pub fn spawn_scheduler(pool: PgPool, shopify: ShopifyClient, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match SyncService::new(&pool, &shopify).sync_all().await {
                Ok(outcomes) => {
                    let failed = outcomes.iter().filter(|o| o.error.is_some()).count();
                    tracing::info!(stores = outcomes.len(), failed, "Scheduled sync finished");
                }
                Err(e) => tracing::error!(error = %e, "Scheduled sync could not start"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ez_apps_core::{ProfileId, StoreStatus};
    use secrecy::SecretString;

    fn store(token: Option<&str>, status: StoreStatus) -> Store {
        Store {
            id: StoreId::new(7),
            profile_id: ProfileId::new(1),
            shop_domain: "demo.myshopify.com".to_string(),
            name: "Demo".to_string(),
            access_token: token.map(|t| SecretString::from(t.to_string())),
            scopes: Vec::new(),
            status,
            last_synced_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_connected_token_requires_token_and_status() {
        assert!(connected_token(&store(Some("t"), StoreStatus::Connected)).is_ok());
        assert!(matches!(
            connected_token(&store(None, StoreStatus::Connected)),
            Err(SyncError::NotConnected(id)) if id == StoreId::new(7)
        ));
        assert!(matches!(
            connected_token(&store(Some("t"), StoreStatus::Disconnected)),
            Err(SyncError::NotConnected(_))
        ));
    }

    #[test]
    fn test_rejected_token_revokes_store() {
        let id = StoreId::new(7);
        assert!(matches!(
            classify_fetch_error(id, ShopifyError::Unauthorized("revoked".to_string())),
            SyncError::Revoked(revoked) if revoked == id
        ));
        assert!(matches!(
            classify_fetch_error(id, ShopifyError::RateLimited(2)),
            SyncError::Shopify(ShopifyError::RateLimited(2))
        ));
    }

    #[test]
    fn test_undecodable_rows_are_counted() {
        let good: PageRow<i64> = Ok(5);
        let bad: PageRow<i64> = serde_json::from_str::<i64>("\"x\"").map_err(|source| {
            crate::shopify::UndecodedRow {
                id: Some(9),
                source,
            }
        });
        let mut failures = 0;

        assert_eq!(decoded(&good, "order", &mut failures), Some(&5));
        assert_eq!(decoded(&bad, "order", &mut failures), None);
        assert_eq!(failures, 1);
    }

    #[test]
    fn test_report_serializes_counts() {
        let report = SyncReport {
            fetched: 3,
            orders_upserted: 2,
            line_items_upserted: 5,
            failures: 1,
        };
        let json = serde_json::to_value(&report).unwrap_or_default();
        assert_eq!(json["fetched"], 3);
        assert_eq!(json["line_items_upserted"], 5);
        assert_eq!(json["failures"], 1);
    }
}
