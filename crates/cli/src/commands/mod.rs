//! CLI subcommand implementations.

pub mod admin;
pub mod migrate;
pub mod sync;

use secrecy::SecretString;
use sqlx::PgPool;

/// Connect using `DATABASE_URL` (loaded from `.env` when present).
///
/// # Errors
///
/// Returns an error if the variable is missing or the connection fails.
pub async fn connect() -> Result<PgPool, Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("DATABASE_URL")
        .map(SecretString::from)
        .map_err(|_| "DATABASE_URL not set")?;

    tracing::info!("Connecting to database...");
    Ok(ez_apps_server::db::create_pool(&database_url).await?)
}
