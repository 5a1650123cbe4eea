//! Per-email throttle for self-service magic link requests.

use std::time::Duration;

use moka::future::Cache;

use ez_apps_core::Email;

/// Default window between two self-service links for the same email.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Allows one magic link per email per window.
///
/// Entries expire on their own; the superadmin path never consults it.
#[derive(Clone)]
pub struct MagicLinkRateLimiter {
    recent: Cache<String, ()>,
}

impl MagicLinkRateLimiter {
    /// Create a limiter with the given window.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            recent: Cache::builder()
                .max_capacity(100_000)
                .time_to_live(window)
                .build(),
        }
    }

    /// Record a request and report whether it is allowed.
    ///
    /// Concurrent callers for the same email see exactly one `true`.
    pub async fn try_acquire(&self, email: &Email) -> bool {
        self.recent
            .entry(email.as_str().to_string())
            .or_insert(())
            .await
            .is_fresh()
    }
}

impl Default for MagicLinkRateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_second_request_in_window_is_rejected() {
        let limiter = MagicLinkRateLimiter::default();
        let email = Email::parse("merchant@example.com").unwrap();

        assert!(limiter.try_acquire(&email).await);
        assert!(!limiter.try_acquire(&email).await);
    }

    #[tokio::test]
    async fn test_emails_are_tracked_separately() {
        let limiter = MagicLinkRateLimiter::default();
        let a = Email::parse("a@example.com").unwrap();
        let b = Email::parse("b@example.com").unwrap();

        assert!(limiter.try_acquire(&a).await);
        assert!(limiter.try_acquire(&b).await);
    }

    #[tokio::test]
    async fn test_window_expiry_allows_again() {
        let limiter = MagicLinkRateLimiter::new(Duration::from_millis(50));
        let email = Email::parse("merchant@example.com").unwrap();

        assert!(limiter.try_acquire(&email).await);
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(limiter.try_acquire(&email).await);
    }
}
