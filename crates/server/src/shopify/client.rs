use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::instrument;

use crate::config::ShopifyConfig;

use super::ShopifyError;
use super::types::{OrdersResponse, PageRow, ProductsResponse, RestOrder, RestProduct, decode_rows};

/// Page size for REST list endpoints.
const PAGE_LIMIT: u32 = 50;

/// Offline access token returned by the OAuth exchange.
#[derive(Clone)]
pub struct AccessToken {
    /// Token for the `X-Shopify-Access-Token` header.
    pub access_token: SecretString,
    /// Granted scopes.
    pub scopes: Vec<String>,
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("access_token", &"[REDACTED]")
            .field("scopes", &self.scopes)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct OAuthTokenResponse {
    access_token: String,
    #[serde(default)]
    scope: String,
}

/// Shopify REST Admin API client.
///
/// Cheap to clone; the HTTP client and credentials live behind an `Arc`.
#[derive(Clone)]
pub struct ShopifyClient {
    inner: Arc<ShopifyClientInner>,
}

struct ShopifyClientInner {
    client: reqwest::Client,
    api_version: String,
    client_id: String,
    client_secret: SecretString,
    scopes: Vec<String>,
}

impl ShopifyClient {
    /// Create a new client from the app configuration.
    #[must_use]
    pub fn new(config: &ShopifyConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            inner: Arc::new(ShopifyClientInner {
                client,
                api_version: config.api_version.clone(),
                client_id: config.client_id.clone(),
                client_secret: config.client_secret.clone(),
                scopes: config.scopes.clone(),
            }),
        }
    }

    /// Get the client secret (for HMAC verification).
    #[must_use]
    pub fn client_secret(&self) -> &SecretString {
        &self.inner.client_secret
    }

    // =========================================================================
    // OAuth Flow
    // =========================================================================

    /// Generate the OAuth authorization URL for a shop.
    #[must_use]
    pub fn authorization_url(&self, shop: &str, redirect_uri: &str, state: &str) -> String {
        let scope = self.inner.scopes.join(",");
        format!(
            "https://{shop}/admin/oauth/authorize?client_id={}&scope={}&redirect_uri={}&state={}",
            urlencoding::encode(&self.inner.client_id),
            urlencoding::encode(&scope),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(state)
        )
    }

    /// Exchange an authorization code for an offline access token.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::OAuth` if Shopify rejects the exchange.
    /// Returns `ShopifyError::Http` if the HTTP request fails.
    #[instrument(skip(self, code))]
    pub async fn exchange_code(&self, shop: &str, code: &str) -> Result<AccessToken, ShopifyError> {
        let url = format!("https://{shop}/admin/oauth/access_token");

        let params = [
            ("client_id", self.inner.client_id.as_str()),
            ("client_secret", self.inner.client_secret.expose_secret()),
            ("code", code),
        ];

        let response = self.inner.client.post(&url).form(&params).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ShopifyError::OAuth(format!(
                "Token exchange failed ({status}): {text}"
            )));
        }

        let token: OAuthTokenResponse = response.json().await?;

        Ok(AccessToken {
            access_token: SecretString::from(token.access_token),
            scopes: crate::db::split_scopes(&token.scope),
        })
    }

    // =========================================================================
    // REST Execution
    // =========================================================================

    fn api_url(&self, shop: &str, resource: &str) -> String {
        format!(
            "https://{shop}/admin/api/{}/{resource}",
            self.inner.api_version
        )
    }

    /// Issue an authenticated GET and decode the JSON body.
    async fn get<T: DeserializeOwned>(
        &self,
        shop: &str,
        access_token: &SecretString,
        resource: &str,
        query: &[(&str, String)],
    ) -> Result<T, ShopifyError> {
        let url = url::Url::parse_with_params(&self.api_url(shop, resource), query)
            .map_err(|_| ShopifyError::InvalidShopDomain(shop.to_string()))?;

        let response = self
            .inner
            .client
            .get(url)
            .header("X-Shopify-Access-Token", access_token.expose_secret())
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.split('.').next()?.parse::<u64>().ok())
                .map_or(2, |secs| secs.max(1));
            return Err(ShopifyError::RateLimited(retry_after));
        }

        let body = response.text().await?;
        check_status(status, resource, body.as_str())?;

        Ok(serde_json::from_str(&body)?)
    }

    /// Fetch the first page of orders (any status) for a shop.
    ///
    /// Each order is decoded on its own; a malformed one comes back as an
    /// `Err` row.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or Shopify answers non-2xx.
    #[instrument(skip(self, access_token))]
    pub async fn fetch_orders(
        &self,
        shop: &str,
        access_token: &SecretString,
    ) -> Result<Vec<PageRow<RestOrder>>, ShopifyError> {
        let response: OrdersResponse = self
            .get(
                shop,
                access_token,
                "orders.json",
                &[
                    ("status", "any".to_string()),
                    ("limit", PAGE_LIMIT.to_string()),
                ],
            )
            .await?;

        Ok(decode_rows(response.orders))
    }

    /// Fetch the first page of products for a shop.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or Shopify answers non-2xx.
    #[instrument(skip(self, access_token))]
    pub async fn fetch_products(
        &self,
        shop: &str,
        access_token: &SecretString,
    ) -> Result<Vec<PageRow<RestProduct>>, ShopifyError> {
        let response: ProductsResponse = self
            .get(
                shop,
                access_token,
                "products.json",
                &[("limit", PAGE_LIMIT.to_string())],
            )
            .await?;

        Ok(decode_rows(response.products))
    }
}

/// Map a non-success status to the matching error.
fn check_status(status: StatusCode, resource: &str, body: &str) -> Result<(), ShopifyError> {
    if status.is_success() {
        return Ok(());
    }

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ShopifyError::Unauthorized("Invalid or revoked access token".to_string())
        }
        StatusCode::NOT_FOUND => ShopifyError::NotFound(resource.to_string()),
        _ => {
            let mut snippet = body.to_string();
            snippet.truncate(500);
            ShopifyError::Api(status.as_u16(), snippet)
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::test_config;

    fn client() -> ShopifyClient {
        ShopifyClient::new(&test_config().shopify)
    }

    #[test]
    fn test_authorization_url_shape() {
        let url = client().authorization_url(
            "demo.myshopify.com",
            "https://api.ezapps.io/api/auth/shopify/callback",
            "abc123",
        );

        let parsed = url::Url::parse(&url).unwrap();
        assert_eq!(parsed.host_str(), Some("demo.myshopify.com"));
        assert_eq!(parsed.path(), "/admin/oauth/authorize");

        let pairs: std::collections::HashMap<_, _> = parsed.query_pairs().into_owned().collect();
        assert_eq!(pairs["client_id"], "test_client_id");
        assert_eq!(pairs["scope"], "read_orders,read_products,read_inventory");
        assert_eq!(
            pairs["redirect_uri"],
            "https://api.ezapps.io/api/auth/shopify/callback"
        );
        assert_eq!(pairs["state"], "abc123");
    }

    #[test]
    fn test_api_url_uses_configured_version() {
        assert_eq!(
            client().api_url("demo.myshopify.com", "orders.json"),
            "https://demo.myshopify.com/admin/api/2024-01/orders.json"
        );
    }

    #[test]
    fn test_check_status_mapping() {
        assert!(check_status(StatusCode::OK, "orders.json", "").is_ok());
        assert!(matches!(
            check_status(StatusCode::UNAUTHORIZED, "orders.json", ""),
            Err(ShopifyError::Unauthorized(_))
        ));
        assert!(matches!(
            check_status(StatusCode::FORBIDDEN, "orders.json", ""),
            Err(ShopifyError::Unauthorized(_))
        ));
        assert!(matches!(
            check_status(StatusCode::NOT_FOUND, "orders.json", ""),
            Err(ShopifyError::NotFound(r)) if r == "orders.json"
        ));
        assert!(matches!(
            check_status(StatusCode::BAD_GATEWAY, "orders.json", "upstream"),
            Err(ShopifyError::Api(502, body)) if body == "upstream"
        ));
    }

    #[test]
    fn test_access_token_debug_redacts() {
        let token = AccessToken {
            access_token: SecretString::from("shpat_live_value"),
            scopes: vec!["read_orders".to_string()],
        };
        let debug_output = format!("{token:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("shpat_live_value"));
    }
}
