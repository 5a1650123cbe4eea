//! Domain models.
//!
//! Validated domain objects returned by the repositories in [`crate::db`].
//! Row types stay private to the repositories.

pub mod app;
pub mod billing;
pub mod order;
pub mod profile;
pub mod session;
pub mod store;

pub use app::{App, StoreApp};
pub use billing::Plan;
pub use order::{Item, LineItem, NewItem, NewLineItem, NewOrder, Order, OrderWithLineItems};
pub use profile::Profile;
pub use session::{CurrentUser, keys as session_keys};
pub use store::{Store, StoreView};
