//! Template repository.
//!
//! Templates are looked up by `(application, name)` when posting and by the
//! `ts` of a previously posted message when routing thread replies.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use sqlx::{PgConnection, PgPool};

use slack_relay_core::{ApplicationId, CallbackUrl, Subscription, TemplateId};

use super::{
    ActionsBlockRepository, ButtonRepository, RepositoryError, conflict_or_database,
    stored_callback_url,
};
use crate::models::{ActionsBlockDetail, RouteTarget, Template, TemplateDetail};

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for `PostgreSQL` template queries.
#[derive(sqlx::FromRow)]
struct TemplateRow {
    id: i32,
    application_id: i32,
    name: String,
    channel_id: String,
    message_text: String,
    fallback_text: String,
    thread_subscription: bool,
    callback_url: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<TemplateRow> for Template {
    type Error = RepositoryError;

    fn try_from(row: TemplateRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: TemplateId::new(row.id),
            application_id: ApplicationId::new(row.application_id),
            name: row.name,
            channel_id: row.channel_id,
            message_text: row.message_text,
            fallback_text: row.fallback_text,
            thread_subscription: row.thread_subscription,
            callback_url: stored_callback_url(row.callback_url)?,
            created_at: row.created_at,
        })
    }
}

/// Row shared by the two routing lookups: a subscribed template or actions
/// block joined with its application's signing secret.
#[derive(sqlx::FromRow)]
pub(super) struct RouteTargetRow {
    application_id: i32,
    template_id: i32,
    signing_secret: String,
    callback_url: Option<String>,
}

impl TryFrom<RouteTargetRow> for RouteTarget {
    type Error = RepositoryError;

    fn try_from(row: RouteTargetRow) -> Result<Self, Self::Error> {
        // Subscriptions are only stored enabled together with a url.
        let callback_url: CallbackUrl = stored_callback_url(row.callback_url)?.ok_or_else(|| {
            RepositoryError::DataCorruption("subscription enabled without callback url".to_owned())
        })?;

        Ok(Self {
            application_id: ApplicationId::new(row.application_id),
            template_id: TemplateId::new(row.template_id),
            signing_secret: SecretString::from(row.signing_secret),
            callback_url,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Fields of a template to create.
#[derive(Debug, Clone)]
pub struct NewTemplate {
    pub application_id: ApplicationId,
    pub name: String,
    pub channel_id: String,
    pub message_text: String,
    pub fallback_text: String,
    /// Thread subscription, already normalized.
    pub subscription: Subscription,
}

/// Repository for template database operations.
pub struct TemplateRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TemplateRepository<'a> {
    /// Create a new template repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a template by name within an application.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored callback url is invalid.
    pub async fn get_by_name(
        &self,
        application_id: ApplicationId,
        name: &str,
    ) -> Result<Option<Template>, RepositoryError> {
        let row = sqlx::query_as::<_, TemplateRow>(
            r"
            SELECT id, application_id, name, channel_id, message_text, fallback_text,
                   thread_subscription, callback_url, created_at
            FROM relay.template
            WHERE application_id = $1 AND name = $2
            ",
        )
        .bind(application_id.as_i32())
        .bind(name)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get a template together with its actions block and buttons.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any query fails.
    /// Returns `RepositoryError::DataCorruption` if stored data is invalid.
    pub async fn get_detail(
        &self,
        application_id: ApplicationId,
        name: &str,
    ) -> Result<Option<TemplateDetail>, RepositoryError> {
        let Some(template) = self.get_by_name(application_id, name).await? else {
            return Ok(None);
        };

        let actions = match ActionsBlockRepository::new(self.pool)
            .get_by_template(template.id)
            .await?
        {
            Some(block) => {
                let buttons = ButtonRepository::new(self.pool)
                    .list_for_block(block.id)
                    .await?;
                Some(ActionsBlockDetail { block, buttons })
            }
            None => None,
        };

        Ok(Some(TemplateDetail { template, actions }))
    }

    /// Create a template.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the application already has a
    /// template with this name.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, new: &NewTemplate) -> Result<Template, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        Self::create_in(&mut conn, new).await
    }

    /// Create a template on `conn`, which may be inside a transaction.
    ///
    /// # Errors
    ///
    /// Same as [`Self::create`].
    pub async fn create_in(
        conn: &mut PgConnection,
        new: &NewTemplate,
    ) -> Result<Template, RepositoryError> {
        let row = sqlx::query_as::<_, TemplateRow>(
            r"
            INSERT INTO relay.template
                (application_id, name, channel_id, message_text, fallback_text,
                 thread_subscription, callback_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, application_id, name, channel_id, message_text, fallback_text,
                      thread_subscription, callback_url, created_at
            ",
        )
        .bind(new.application_id.as_i32())
        .bind(&new.name)
        .bind(&new.channel_id)
        .bind(&new.message_text)
        .bind(&new.fallback_text)
        .bind(new.subscription.is_enabled())
        .bind(new.subscription.callback_url().map(CallbackUrl::as_str))
        .fetch_one(conn)
        .await
        .map_err(|e| conflict_or_database(e, "template name already exists for application"))?;

        row.try_into()
    }

    /// Find the thread-subscribed template that posted the message `thread_ts`.
    ///
    /// Slack `ts` values are only unique per channel; if several templates
    /// posted the same `ts`, the most recently recorded one wins.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the subscription has no valid url.
    pub async fn find_thread_subscribed(
        &self,
        thread_ts: &str,
    ) -> Result<Option<RouteTarget>, RepositoryError> {
        let row = sqlx::query_as::<_, RouteTargetRow>(
            r"
            SELECT a.id AS application_id, t.id AS template_id,
                   a.signing_secret, t.callback_url
            FROM relay.message_timestamp mt
            JOIN relay.template t ON t.id = mt.template_id
            JOIN relay.application a ON a.id = t.application_id
            WHERE mt.ts = $1 AND t.thread_subscription
            ORDER BY mt.id DESC
            LIMIT 1
            ",
        )
        .bind(thread_ts)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }
}
