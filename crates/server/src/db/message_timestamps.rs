//! Message timestamp repository.
//!
//! Rows are create-only: written once per successful post on a
//! thread-subscribed template, removed only by cascade.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use slack_relay_core::{MessageTimestampId, TemplateId};

use super::RepositoryError;
use crate::models::MessageTimestamp;

/// Internal row type for `PostgreSQL` message timestamp queries.
#[derive(sqlx::FromRow)]
struct MessageTimestampRow {
    id: i32,
    template_id: i32,
    ts: String,
    created_at: DateTime<Utc>,
}

impl From<MessageTimestampRow> for MessageTimestamp {
    fn from(row: MessageTimestampRow) -> Self {
        Self {
            id: MessageTimestampId::new(row.id),
            template_id: TemplateId::new(row.template_id),
            ts: row.ts,
            created_at: row.created_at,
        }
    }
}

/// Repository for message timestamp database operations.
pub struct MessageTimestampRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> MessageTimestampRepository<'a> {
    /// Create a new message timestamp repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record the `ts` Slack assigned to a message posted from `template_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        template_id: TemplateId,
        ts: &str,
    ) -> Result<MessageTimestamp, RepositoryError> {
        let row = sqlx::query_as::<_, MessageTimestampRow>(
            r"
            INSERT INTO relay.message_timestamp (template_id, ts)
            VALUES ($1, $2)
            RETURNING id, template_id, ts, created_at
            ",
        )
        .bind(template_id.as_i32())
        .bind(ts)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// List the recorded timestamps of a template, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_template(
        &self,
        template_id: TemplateId,
    ) -> Result<Vec<MessageTimestamp>, RepositoryError> {
        let rows = sqlx::query_as::<_, MessageTimestampRow>(
            r"
            SELECT id, template_id, ts, created_at
            FROM relay.message_timestamp
            WHERE template_id = $1
            ORDER BY id ASC
            ",
        )
        .bind(template_id.as_i32())
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
