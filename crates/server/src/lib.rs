//! EZ Apps server library.
//!
//! Multi-tenant dashboard API: magic link sign-in, Shopify OAuth, order and
//! product sync, billing plans, the app catalog and the superadmin panel.
//! The binary in `main.rs` wires these modules into an axum server; the CLI
//! reuses them for migrations and one-shot jobs.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod shopify;
pub mod state;
