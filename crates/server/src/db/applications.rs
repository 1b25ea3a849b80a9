//! Application repository.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use sqlx::{PgConnection, PgPool};

use slack_relay_core::ApplicationId;

use super::{RepositoryError, conflict_or_database};
use crate::models::Application;

/// Internal row type for `PostgreSQL` application queries.
#[derive(sqlx::FromRow)]
struct ApplicationRow {
    id: i32,
    name: String,
    signing_secret: String,
    bot_token: String,
    created_at: DateTime<Utc>,
}

impl From<ApplicationRow> for Application {
    fn from(row: ApplicationRow) -> Self {
        Self {
            id: ApplicationId::new(row.id),
            name: row.name,
            signing_secret: SecretString::from(row.signing_secret),
            bot_token: SecretString::from(row.bot_token),
            created_at: row.created_at,
        }
    }
}

/// Repository for application database operations.
pub struct ApplicationRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ApplicationRepository<'a> {
    /// Create a new application repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get an application by its unique name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_name(&self, name: &str) -> Result<Option<Application>, RepositoryError> {
        let row = sqlx::query_as::<_, ApplicationRow>(
            r"
            SELECT id, name, signing_secret, bot_token, created_at
            FROM relay.application
            WHERE name = $1
            ",
        )
        .bind(name)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Register a new application.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name is already taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        name: &str,
        signing_secret: &SecretString,
        bot_token: &SecretString,
    ) -> Result<Application, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        Self::create_in(&mut conn, name, signing_secret, bot_token).await
    }

    /// Register a new application on `conn`, which may be inside a transaction.
    ///
    /// # Errors
    ///
    /// Same as [`Self::create`].
    pub async fn create_in(
        conn: &mut PgConnection,
        name: &str,
        signing_secret: &SecretString,
        bot_token: &SecretString,
    ) -> Result<Application, RepositoryError> {
        let row = sqlx::query_as::<_, ApplicationRow>(
            r"
            INSERT INTO relay.application (name, signing_secret, bot_token)
            VALUES ($1, $2, $3)
            RETURNING id, name, signing_secret, bot_token, created_at
            ",
        )
        .bind(name)
        .bind(signing_secret.expose_secret())
        .bind(bot_token.expose_secret())
        .fetch_one(conn)
        .await
        .map_err(|e| conflict_or_database(e, "application name already exists"))?;

        Ok(row.into())
    }

    /// Delete an application and, by cascade, everything it owns.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no application has this ID.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: ApplicationId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM relay.application WHERE id = $1")
            .bind(id.as_i32())
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}
