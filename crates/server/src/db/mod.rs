//! Database operations for the relay's `PostgreSQL` store.
//!
//! # Schema: `relay`
//!
//! ## Tables
//!
//! - `application` - Slack credential bundles, unique by name
//! - `template` - Message templates, unique per `(application_id, name)`
//! - `actions_block` - Optional button group, one per template, `block_id` globally unique
//! - `button` - Buttons, `action_id` and `text` each unique within a block
//! - `message_timestamp` - `ts` of posted messages on thread-subscribed templates
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p slack-relay-cli -- migrate
//! ```

pub mod actions_blocks;
pub mod applications;
pub mod buttons;
pub mod message_timestamps;
pub mod store;
pub mod templates;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use actions_blocks::ActionsBlockRepository;
pub use applications::ApplicationRepository;
pub use buttons::ButtonRepository;
pub use message_timestamps::MessageTimestampRepository;
pub use store::{MessageStore, PgMessageStore};
pub use templates::{NewTemplate, TemplateRepository};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate button label).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Map a unique violation to `Conflict` with `message`, anything else to `Database`.
pub(crate) fn conflict_or_database(e: sqlx::Error, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(message.to_owned());
    }
    RepositoryError::Database(e)
}

/// Parse a stored callback URL, treating an invalid value as corruption.
pub(crate) fn stored_callback_url(
    value: Option<String>,
) -> Result<Option<slack_relay_core::CallbackUrl>, RepositoryError> {
    value
        .map(|url| {
            slack_relay_core::CallbackUrl::parse(&url).map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid callback url in database: {e}"))
            })
        })
        .transpose()
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
