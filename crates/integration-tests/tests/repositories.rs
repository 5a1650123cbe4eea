//! Repository tests against a migrated database.
//!
//! These tests require:
//! - A running `PostgreSQL` database reachable through `DATABASE_URL`
//!
//! No server is needed; the repositories are called directly.
//!
//! Run with: cargo test -p ez-apps-integration-tests --test repositories -- --ignored

use chrono::{Duration, Utc};
use ez_apps_core::{CurrencyCode, Email, StoreStatus, UserRole};
use ez_apps_integration_tests::{base_url, pool, unique_email};
use ez_apps_server::db::{
    ItemRepository, OrderRepository, ProfileRepository, RepositoryError, StoreRepository, migrate,
};
use ez_apps_server::models::{NewItem, NewLineItem, NewOrder, Profile, Store};
use ez_apps_server::services::{AuthError, AuthService};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use sqlx::PgPool;

async fn migrated_pool() -> PgPool {
    let pool = pool().await.expect("Failed to connect to DATABASE_URL");
    migrate(&pool).await.expect("Failed to run migrations");
    pool
}

async fn create_profile(pool: &PgPool, prefix: &str) -> Profile {
    let email = Email::parse(&unique_email(prefix)).expect("Invalid test email");
    ProfileRepository::new(pool)
        .create(&email, "Repository Test", UserRole::Customer)
        .await
        .expect("Failed to create profile")
}

fn unique_shop() -> String {
    format!("test-{}.myshopify.com", uuid::Uuid::new_v4().simple())
}

async fn connected_store(pool: &PgPool, profile: &Profile) -> Store {
    StoreRepository::new(pool)
        .upsert_connected(
            profile.id,
            &unique_shop(),
            "Test Shop",
            "shpat_initial",
            &["read_orders".to_string()],
        )
        .await
        .expect("Failed to connect store")
}

fn order(shopify_order_id: i64) -> NewOrder {
    NewOrder {
        shopify_order_id,
        order_number: format!("#{shopify_order_id}"),
        email: None,
        financial_status: Some("paid".to_string()),
        fulfillment_status: None,
        total_price: Decimal::new(2000, 2),
        subtotal_price: None,
        currency: CurrencyCode::USD,
        cancelled_at: None,
        closed_at: None,
        processed_at: None,
        shopify_created_at: Utc::now(),
        shopify_updated_at: None,
    }
}

fn line_item(shopify_line_item_id: i64, variant_id: i64, fulfillable_quantity: i32) -> NewLineItem {
    NewLineItem {
        shopify_line_item_id,
        shopify_product_id: Some(100),
        shopify_variant_id: Some(variant_id),
        sku: None,
        title: "Widget".to_string(),
        variant_title: None,
        quantity: fulfillable_quantity,
        fulfillable_quantity,
        price: Decimal::new(1000, 2),
    }
}

fn item(variant_id: i64) -> NewItem {
    NewItem {
        shopify_product_id: 100,
        shopify_variant_id: variant_id,
        sku: None,
        title: "Widget".to_string(),
        variant_title: None,
        price: Decimal::new(1000, 2),
        inventory_quantity: 10,
    }
}

// ============================================================================
// Store Connection Tests
// ============================================================================

#[tokio::test]
#[ignore = "Requires DATABASE_URL"]
async fn test_reconnect_refreshes_token_and_keeps_id() {
    let pool = migrated_pool().await;
    let profile = create_profile(&pool, "reconnect").await;
    let stores = StoreRepository::new(&pool);
    let shop = unique_shop();

    let first = stores
        .upsert_connected(profile.id, &shop, "Shop", "shpat_first", &["read_orders".to_string()])
        .await
        .expect("First connect failed");
    let second = stores
        .upsert_connected(
            profile.id,
            &shop,
            "Shop",
            "shpat_second",
            &["read_orders".to_string(), "read_products".to_string()],
        )
        .await
        .expect("Reconnect failed");

    assert_eq!(first.id, second.id);
    assert_eq!(second.status, StoreStatus::Connected);
    assert_eq!(
        second.access_token.as_ref().map(|t| t.expose_secret().to_string()),
        Some("shpat_second".to_string())
    );
    assert_eq!(second.scopes, vec!["read_orders", "read_products"]);
}

#[tokio::test]
#[ignore = "Requires DATABASE_URL"]
async fn test_shop_owned_by_another_profile_conflicts() {
    let pool = migrated_pool().await;
    let owner = create_profile(&pool, "owner").await;
    let intruder = create_profile(&pool, "intruder").await;
    let stores = StoreRepository::new(&pool);
    let store = connected_store(&pool, &owner).await;

    let result = stores
        .upsert_connected(intruder.id, &store.shop_domain, "Mine", "shpat_other", &[])
        .await;
    assert!(matches!(result, Err(RepositoryError::Conflict(_))));

    let unchanged = stores
        .get(store.id)
        .await
        .expect("Failed to reload store")
        .expect("Store disappeared");
    assert_eq!(unchanged.profile_id, owner.id);
    assert_eq!(
        unchanged.access_token.as_ref().map(|t| t.expose_secret().to_string()),
        Some("shpat_initial".to_string())
    );
}

#[tokio::test]
#[ignore = "Requires DATABASE_URL"]
async fn test_disconnect_clears_token() {
    let pool = migrated_pool().await;
    let profile = create_profile(&pool, "disconnect").await;
    let stores = StoreRepository::new(&pool);
    let store = connected_store(&pool, &profile).await;

    assert!(stores.disconnect(store.id).await.expect("Disconnect failed"));

    let reloaded = stores
        .get(store.id)
        .await
        .expect("Failed to reload store")
        .expect("Store disappeared");
    assert_eq!(reloaded.status, StoreStatus::Disconnected);
    assert!(reloaded.access_token.is_none());
    assert!(
        stores
            .list_connected()
            .await
            .expect("Failed to list connected stores")
            .iter()
            .all(|s| s.id != store.id)
    );
}

// ============================================================================
// Order Sync Tests
// ============================================================================

#[tokio::test]
#[ignore = "Requires DATABASE_URL"]
async fn test_order_upsert_is_idempotent() {
    let pool = migrated_pool().await;
    let profile = create_profile(&pool, "orders").await;
    let store = connected_store(&pool, &profile).await;
    let orders = OrderRepository::new(&pool);

    for _ in 0..2 {
        let order_id = orders
            .upsert_order(store.id, &order(5001))
            .await
            .expect("Order upsert failed");
        orders
            .upsert_line_item(store.id, order_id, &line_item(7001, 9001, 1))
            .await
            .expect("Line item upsert failed");
    }

    let listed = orders
        .list_for_store(store.id, 50, 0)
        .await
        .expect("Failed to list orders");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed.first().map(|o| o.line_items.len()), Some(1));
}

#[tokio::test]
#[ignore = "Requires DATABASE_URL"]
async fn test_committed_stock_counts_open_unfulfilled_lines() {
    let pool = migrated_pool().await;
    let profile = create_profile(&pool, "stock").await;
    let store = connected_store(&pool, &profile).await;
    let orders = OrderRepository::new(&pool);
    let items = ItemRepository::new(&pool);

    items.upsert(store.id, &item(1)).await.expect("Item upsert failed");
    items.upsert(store.id, &item(2)).await.expect("Item upsert failed");

    let open = orders.upsert_order(store.id, &order(1)).await.expect("Order upsert failed");
    orders
        .upsert_line_item(store.id, open, &line_item(11, 1, 2))
        .await
        .expect("Line item upsert failed");

    let closed = orders
        .upsert_order(store.id, &NewOrder { closed_at: Some(Utc::now()), ..order(2) })
        .await
        .expect("Order upsert failed");
    orders
        .upsert_line_item(store.id, closed, &line_item(12, 1, 5))
        .await
        .expect("Line item upsert failed");

    let fulfilled = orders
        .upsert_order(
            store.id,
            &NewOrder { fulfillment_status: Some("fulfilled".to_string()), ..order(3) },
        )
        .await
        .expect("Order upsert failed");
    orders
        .upsert_line_item(store.id, fulfilled, &line_item(13, 2, 3))
        .await
        .expect("Line item upsert failed");

    let cancelled = orders
        .upsert_order(store.id, &NewOrder { cancelled_at: Some(Utc::now()), ..order(4) })
        .await
        .expect("Order upsert failed");
    orders
        .upsert_line_item(store.id, cancelled, &line_item(14, 2, 4))
        .await
        .expect("Line item upsert failed");

    let touched = orders
        .recalculate_committed_stock(store.id)
        .await
        .expect("Recalculation failed");
    assert_eq!(touched, 2);

    let listed = items.list_for_store(store.id).await.expect("Failed to list items");
    let committed = |variant: i64| {
        listed
            .iter()
            .find(|i| i.shopify_variant_id == variant)
            .map(|i| i.committed_stock)
    };
    assert_eq!(committed(1), Some(2));
    assert_eq!(committed(2), Some(0));
}

// ============================================================================
// Magic Link Tests
// ============================================================================

#[tokio::test]
#[ignore = "Requires DATABASE_URL"]
async fn test_magic_link_is_single_use() {
    let pool = migrated_pool().await;
    let base = base_url();
    let auth = AuthService::new(&pool, &base, Duration::minutes(15));
    let email = unique_email("single-use");

    let (profile, link) = auth.signup(&email, "Single Use").await.expect("Signup failed");
    let (_, token) = link.url.split_once("token=").expect("Link has no token");

    let verified = auth.verify(token).await.expect("First verify failed");
    assert_eq!(verified.id, profile.id);

    let second = auth.verify(token).await;
    assert!(matches!(second, Err(AuthError::InvalidToken)));
}
