//! Actions block repository.

use sqlx::{PgConnection, PgPool};

use slack_relay_core::{ActionsBlockId, CallbackUrl, Subscription, TemplateId};

use super::templates::RouteTargetRow;
use super::{RepositoryError, conflict_or_database, stored_callback_url};
use crate::models::{ActionsBlock, RouteTarget};

/// Internal row type for `PostgreSQL` actions block queries.
#[derive(sqlx::FromRow)]
struct ActionsBlockRow {
    id: i32,
    template_id: i32,
    block_id: String,
    action_subscription: bool,
    callback_url: Option<String>,
}

impl TryFrom<ActionsBlockRow> for ActionsBlock {
    type Error = RepositoryError;

    fn try_from(row: ActionsBlockRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ActionsBlockId::new(row.id),
            template_id: TemplateId::new(row.template_id),
            block_id: row.block_id,
            action_subscription: row.action_subscription,
            callback_url: stored_callback_url(row.callback_url)?,
        })
    }
}

/// Repository for actions block database operations.
pub struct ActionsBlockRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ActionsBlockRepository<'a> {
    /// Create a new actions block repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get the actions block of a template, if it has one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored callback url is invalid.
    pub async fn get_by_template(
        &self,
        template_id: TemplateId,
    ) -> Result<Option<ActionsBlock>, RepositoryError> {
        let row = sqlx::query_as::<_, ActionsBlockRow>(
            r"
            SELECT id, template_id, block_id, action_subscription, callback_url
            FROM relay.actions_block
            WHERE template_id = $1
            ",
        )
        .bind(template_id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Attach an actions block to a template.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the template already has an
    /// actions block or `block_id` is used anywhere else.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        template_id: TemplateId,
        block_id: &str,
        subscription: &Subscription,
    ) -> Result<ActionsBlock, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        Self::create_in(&mut conn, template_id, block_id, subscription).await
    }

    /// Attach an actions block on `conn`, which may be inside a transaction.
    ///
    /// # Errors
    ///
    /// Same as [`Self::create`].
    pub async fn create_in(
        conn: &mut PgConnection,
        template_id: TemplateId,
        block_id: &str,
        subscription: &Subscription,
    ) -> Result<ActionsBlock, RepositoryError> {
        let row = sqlx::query_as::<_, ActionsBlockRow>(
            r"
            INSERT INTO relay.actions_block (template_id, block_id, action_subscription, callback_url)
            VALUES ($1, $2, $3, $4)
            RETURNING id, template_id, block_id, action_subscription, callback_url
            ",
        )
        .bind(template_id.as_i32())
        .bind(block_id)
        .bind(subscription.is_enabled())
        .bind(subscription.callback_url().map(CallbackUrl::as_str))
        .fetch_one(conn)
        .await
        .map_err(|e| {
            conflict_or_database(e, "block_id already in use or template already has actions")
        })?;

        row.try_into()
    }

    /// Find the action-subscribed block with this Slack `block_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the subscription has no valid url.
    pub async fn find_subscribed(
        &self,
        block_id: &str,
    ) -> Result<Option<RouteTarget>, RepositoryError> {
        let row = sqlx::query_as::<_, RouteTargetRow>(
            r"
            SELECT a.id AS application_id, t.id AS template_id,
                   a.signing_secret, b.callback_url
            FROM relay.actions_block b
            JOIN relay.template t ON t.id = b.template_id
            JOIN relay.application a ON a.id = t.application_id
            WHERE b.block_id = $1 AND b.action_subscription
            ",
        )
        .bind(block_id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }
}
