//! One-shot Shopify sync commands.
//!
//! # Usage
//!
//! ```bash
//! ez-cli sync --store-id 42
//! ez-cli sync --all
//! ```
//!
//! Reads the same environment as the server (`DATABASE_URL`, `SHOPIFY_*`, ...).

use ez_apps_core::StoreId;
use ez_apps_server::config::AppConfig;
use ez_apps_server::db::StoreRepository;
use ez_apps_server::services::SyncService;
use ez_apps_server::shopify::ShopifyClient;

/// Sync orders and products of one store.
///
/// # Errors
///
/// Returns an error if the store does not exist, is disconnected, or the
/// Shopify fetch fails.
pub async fn store(id: i32) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    let pool = super::connect().await?;
    let shopify = ShopifyClient::new(&config.shopify);

    let store = StoreRepository::new(&pool)
        .get(StoreId::new(id))
        .await?
        .ok_or_else(|| format!("store {id} not found"))?;

    let sync = SyncService::new(&pool, &shopify);
    let orders = sync.sync_orders(&store).await?;
    let products = sync.sync_products(&store).await?;

    tracing::info!(
        "Synced {}: {} orders, {} line items, {} items ({} failures)",
        store.shop_domain,
        orders.orders_upserted,
        orders.line_items_upserted,
        products.items_upserted,
        orders.failures + products.failures
    );
    Ok(())
}

/// Sync every connected store.
///
/// # Errors
///
/// Returns an error if the store list cannot be loaded or any store failed.
pub async fn all() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    let pool = super::connect().await?;
    let shopify = ShopifyClient::new(&config.shopify);

    let outcomes = SyncService::new(&pool, &shopify).sync_all().await?;

    let mut failed = 0_usize;
    for outcome in &outcomes {
        match &outcome.error {
            Some(error) => {
                failed += 1;
                tracing::error!("{} ({}): {}", outcome.shop_domain, outcome.store_id, error);
            }
            None => tracing::info!(
                "{} ({}): {} orders, {} items",
                outcome.shop_domain,
                outcome.store_id,
                outcome.orders.as_ref().map_or(0, |r| r.orders_upserted),
                outcome.products.as_ref().map_or(0, |r| r.items_upserted)
            ),
        }
    }

    tracing::info!("Synced {} stores, {} failed", outcomes.len(), failed);
    if failed > 0 {
        return Err(format!("{failed} store(s) failed to sync").into());
    }
    Ok(())
}
