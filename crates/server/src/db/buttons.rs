//! Button repository.
//!
//! `action_id` and `text` are two independent unique constraints within a
//! block; the violated one is reported in the conflict message.

use sqlx::{PgConnection, PgPool};

use slack_relay_core::{ActionsBlockId, ButtonId};

use super::RepositoryError;
use crate::models::Button;

/// Internal row type for `PostgreSQL` button queries.
#[derive(sqlx::FromRow)]
struct ButtonRow {
    id: i32,
    actions_block_id: i32,
    action_id: String,
    text: String,
}

impl From<ButtonRow> for Button {
    fn from(row: ButtonRow) -> Self {
        Self {
            id: ButtonId::new(row.id),
            actions_block_id: ActionsBlockId::new(row.actions_block_id),
            action_id: row.action_id,
            text: row.text,
        }
    }
}

/// Repository for button database operations.
pub struct ButtonRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ButtonRepository<'a> {
    /// Create a new button repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List the buttons of a block in creation order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_block(
        &self,
        actions_block_id: ActionsBlockId,
    ) -> Result<Vec<Button>, RepositoryError> {
        let rows = sqlx::query_as::<_, ButtonRow>(
            r"
            SELECT id, actions_block_id, action_id, text
            FROM relay.button
            WHERE actions_block_id = $1
            ORDER BY id ASC
            ",
        )
        .bind(actions_block_id.as_i32())
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Add a button to a block.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if a sibling button already uses
    /// this `action_id` or this label.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        actions_block_id: ActionsBlockId,
        action_id: &str,
        text: &str,
    ) -> Result<Button, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        Self::create_in(&mut conn, actions_block_id, action_id, text).await
    }

    /// Add a button on `conn`, which may be inside a transaction.
    ///
    /// # Errors
    ///
    /// Same as [`Self::create`].
    pub async fn create_in(
        conn: &mut PgConnection,
        actions_block_id: ActionsBlockId,
        action_id: &str,
        text: &str,
    ) -> Result<Button, RepositoryError> {
        let row = sqlx::query_as::<_, ButtonRow>(
            r"
            INSERT INTO relay.button (actions_block_id, action_id, text)
            VALUES ($1, $2, $3)
            RETURNING id, actions_block_id, action_id, text
            ",
        )
        .bind(actions_block_id.as_i32())
        .bind(action_id)
        .bind(text)
        .fetch_one(conn)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                let message = match db_err.constraint() {
                    Some("button_text_key") => "button text already used in this block",
                    _ => "button action_id already used in this block",
                };
                return RepositoryError::Conflict(message.to_owned());
            }
            RepositoryError::Database(e)
        })?;

        Ok(row.into())
    }
}
