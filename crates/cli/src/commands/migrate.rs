//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! ez-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - `PostgreSQL` connection string
//!
//! Migrations live in `crates/server/migrations/` and are embedded at
//! compile time. They also create the `tower_sessions` schema, so the server
//! never migrates on startup.

/// Run all pending migrations.
///
/// # Errors
///
/// Returns an error if the connection or a migration fails.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let pool = super::connect().await?;

    tracing::info!("Running migrations...");
    ez_apps_server::db::migrate(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
