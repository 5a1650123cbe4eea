//! HTTP middleware and extractors.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request tracing)
//! 3. Session layer (tower-sessions with `PostgreSQL` store, shared cookie domain)
//! 4. Auth extractors on individual handlers

pub mod auth;
pub mod session;

pub use auth::{AuthRejection, RequireSuperAdmin, RequireUser, clear_session, set_current_user};
pub use session::{SESSION_COOKIE_NAME, create_session_layer};
