//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AppConfig;
use crate::services::{AuthService, EmailService, MagicLinkRateLimiter, SyncService};
use crate::shopify::ShopifyClient;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    pool: PgPool,
    shopify: ShopifyClient,
    email: EmailService,
    magic_link_limiter: MagicLinkRateLimiter,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: AppConfig, pool: PgPool, email: EmailService) -> Self {
        let shopify = ShopifyClient::new(&config.shopify);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                shopify,
                email,
                magic_link_limiter: MagicLinkRateLimiter::default(),
            }),
        }
    }

    /// Get a reference to the configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Get a reference to the database pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the Shopify client.
    #[must_use]
    pub fn shopify(&self) -> &ShopifyClient {
        &self.inner.shopify
    }

    /// Get a reference to the email service.
    #[must_use]
    pub fn email(&self) -> &EmailService {
        &self.inner.email
    }

    /// Get a reference to the self-service magic link throttle.
    #[must_use]
    pub fn magic_link_limiter(&self) -> &MagicLinkRateLimiter {
        &self.inner.magic_link_limiter
    }

    /// Auth service bound to this state's pool and link settings.
    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(
            self.pool(),
            &self.inner.config.base_url,
            self.inner.config.magic_link_ttl,
        )
    }

    /// Sync service bound to this state's pool and Shopify client.
    #[must_use]
    pub fn sync(&self) -> SyncService<'_> {
        SyncService::new(self.pool(), self.shopify())
    }
}
