//! OAuth callback verification and shop domain handling.

use std::collections::HashMap;

use hmac::{Hmac, Mac};
use rand::Rng;
use rand::distr::Alphanumeric;
use sha2::Sha256;

use super::ShopifyError;

type HmacSha256 = Hmac<Sha256>;

const SHOP_SUFFIX: &str = ".myshopify.com";

/// Verify the `hmac` parameter of a Shopify OAuth callback.
///
/// The message is every query parameter except `hmac` and `signature`,
/// sorted by key and joined as `k=v&k=v`. Comparison is constant-time.
#[must_use]
pub fn verify_hmac(params: &HashMap<String, String>, client_secret: &str) -> bool {
    let Some(provided) = params.get("hmac") else {
        return false;
    };
    let Ok(provided) = hex::decode(provided) else {
        return false;
    };

    let mut pairs: Vec<(&String, &String)> = params
        .iter()
        .filter(|(k, _)| k.as_str() != "hmac" && k.as_str() != "signature")
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));

    let message = pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let Ok(mut mac) = HmacSha256::new_from_slice(client_secret.as_bytes()) else {
        return false;
    };
    mac.update(message.as_bytes());
    mac.verify_slice(&provided).is_ok()
}

/// Normalize user input into a `*.myshopify.com` domain.
///
/// Accepts `my-shop`, `my-shop.myshopify.com`, or a URL such as
/// `https://my-shop.myshopify.com/admin`.
///
/// # Errors
///
/// Returns `ShopifyError::InvalidShopDomain` if the result is not a valid
/// `*.myshopify.com` host.
pub fn normalize_shop_domain(input: &str) -> Result<String, ShopifyError> {
    let lowered = input.trim().to_lowercase();
    let without_scheme = lowered
        .strip_prefix("https://")
        .or_else(|| lowered.strip_prefix("http://"))
        .unwrap_or(&lowered);
    let host = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();

    let domain = if host.ends_with(SHOP_SUFFIX) {
        host.to_string()
    } else if host.contains('.') {
        return Err(ShopifyError::InvalidShopDomain(input.to_string()));
    } else {
        format!("{host}{SHOP_SUFFIX}")
    };

    let name = domain.strip_suffix(SHOP_SUFFIX).unwrap_or_default();
    let valid = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');

    if valid {
        Ok(domain)
    } else {
        Err(ShopifyError::InvalidShopDomain(input.to_string()))
    }
}

/// Generate a random CSRF state value for the OAuth flow.
#[must_use]
pub fn generate_state() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}
