//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! relay-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `RELAY_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! # Migration Files
//!
//! Stored in `crates/server/migrations/` and embedded at compile time.

use secrecy::SecretString;
use thiserror::Error;

use slack_relay_server::db;

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run all pending migrations.
///
/// # Errors
///
/// Returns an error if the database URL is missing, the database is
/// unreachable, or a migration fails.
pub async fn run() -> Result<(), MigrationError> {
    let database_url = database_url()?;

    tracing::info!("Connecting to relay database...");
    let pool = db::create_pool(&database_url).await?;

    tracing::info!("Running relay migrations...");
    sqlx::migrate!("../server/migrations").run(&pool).await?;

    tracing::info!("Relay migrations complete!");
    Ok(())
}

/// `RELAY_DATABASE_URL`, or `DATABASE_URL` as set by Fly.io postgres attach.
///
/// # Errors
///
/// Returns `MigrationError::MissingEnvVar` if neither is set.
pub fn database_url() -> Result<SecretString, MigrationError> {
    dotenvy::dotenv().ok();

    std::env::var("RELAY_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| MigrationError::MissingEnvVar("RELAY_DATABASE_URL"))
}
