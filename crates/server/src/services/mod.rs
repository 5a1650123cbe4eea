//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Magic link sign-up, login and verification
//! - `email` - Email delivery via SMTP (log-only without SMTP)
//! - `sync` - Shopify order and product sync, plus the scheduler

pub mod auth;
pub mod email;
pub mod sync;

pub use auth::{AuthError, AuthService, MagicLink, MagicLinkRateLimiter};
pub use email::{EmailError, EmailService};
pub use sync::{ProductSyncReport, StoreSyncOutcome, SyncError, SyncReport, SyncService};
