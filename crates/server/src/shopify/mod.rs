//! Shopify REST Admin API client and OAuth helpers.
//!
//! # Architecture
//!
//! - One [`ShopifyClient`] per process, holding the app's client credentials.
//!   Shop domain and access token are passed per call, since every connected
//!   store has its own offline token.
//! - REST endpoints only: `orders.json` and `products.json`, first page.
//! - OAuth callback verification lives in [`oauth`].
//!
//! # Example
//!
//! ```rust,ignore
//! use ez_apps_server::shopify::ShopifyClient;
//!
//! let client = ShopifyClient::new(&config.shopify);
//! let url = client.authorization_url("demo.myshopify.com", &redirect_uri, &state);
//! let token = client.exchange_code("demo.myshopify.com", &code).await?;
//! let orders = client.fetch_orders("demo.myshopify.com", &token.access_token).await?;
//! ```

mod client;
pub mod oauth;
pub mod types;

pub use client::{AccessToken, ShopifyClient};
pub use oauth::{generate_state, normalize_shop_domain, verify_hmac};
pub use types::{PageRow, RestLineItem, RestOrder, RestProduct, RestVariant, UndecodedRow};

use thiserror::Error;

/// Errors that can occur when talking to Shopify.
#[derive(Debug, Error)]
pub enum ShopifyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A payload parsed but contained values we cannot store.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by Shopify.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Authentication/authorization failed.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Any other non-success response.
    #[error("Shopify API error {0}: {1}")]
    Api(u16, String),

    /// OAuth token exchange failed.
    #[error("OAuth error: {0}")]
    OAuth(String),

    /// The shop parameter is not a `*.myshopify.com` domain.
    #[error("Invalid shop domain: {0}")]
    InvalidShopDomain(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shopify_error_display() {
        let err = ShopifyError::NotFound("orders.json".to_string());
        assert_eq!(err.to_string(), "Not found: orders.json");

        let err = ShopifyError::RateLimited(2);
        assert_eq!(err.to_string(), "Rate limited, retry after 2 seconds");

        let err = ShopifyError::Api(500, "boom".to_string());
        assert_eq!(err.to_string(), "Shopify API error 500: boom");
    }
}
