//! The storage seam used by the dispatcher and webhook routers.
//!
//! Lookups return `Ok(None)` on absence; callers decide whether a miss is a
//! client error (posting) or a silent no-op (routing).

use async_trait::async_trait;
use sqlx::PgPool;

use slack_relay_core::{ApplicationId, TemplateId};

use super::{
    ActionsBlockRepository, ApplicationRepository, MessageTimestampRepository, RepositoryError,
    TemplateRepository,
};
use crate::models::{Application, MessageTimestamp, RouteTarget, TemplateDetail};

/// Reads and writes the relay needs at request time.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Application by its unique name.
    async fn application_by_name(&self, name: &str)
    -> Result<Option<Application>, RepositoryError>;

    /// Template by name within an application, with its actions block and buttons.
    async fn template_detail(
        &self,
        application_id: ApplicationId,
        name: &str,
    ) -> Result<Option<TemplateDetail>, RepositoryError>;

    /// Record the `ts` of a message posted from a thread-subscribed template.
    async fn record_message_timestamp(
        &self,
        template_id: TemplateId,
        ts: &str,
    ) -> Result<MessageTimestamp, RepositoryError>;

    /// Forward target of the action-subscribed block with this `block_id`.
    async fn subscribed_actions_block(
        &self,
        block_id: &str,
    ) -> Result<Option<RouteTarget>, RepositoryError>;

    /// Forward target of the thread-subscribed template that posted `thread_ts`.
    async fn thread_subscribed_template(
        &self,
        thread_ts: &str,
    ) -> Result<Option<RouteTarget>, RepositoryError>;

    /// Check the store is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// [`MessageStore`] backed by `PostgreSQL`.
#[derive(Debug, Clone)]
pub struct PgMessageStore {
    pool: PgPool,
}

impl PgMessageStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl MessageStore for PgMessageStore {
    async fn application_by_name(
        &self,
        name: &str,
    ) -> Result<Option<Application>, RepositoryError> {
        ApplicationRepository::new(&self.pool).get_by_name(name).await
    }

    async fn template_detail(
        &self,
        application_id: ApplicationId,
        name: &str,
    ) -> Result<Option<TemplateDetail>, RepositoryError> {
        TemplateRepository::new(&self.pool)
            .get_detail(application_id, name)
            .await
    }

    async fn record_message_timestamp(
        &self,
        template_id: TemplateId,
        ts: &str,
    ) -> Result<MessageTimestamp, RepositoryError> {
        MessageTimestampRepository::new(&self.pool)
            .create(template_id, ts)
            .await
    }

    async fn subscribed_actions_block(
        &self,
        block_id: &str,
    ) -> Result<Option<RouteTarget>, RepositoryError> {
        ActionsBlockRepository::new(&self.pool)
            .find_subscribed(block_id)
            .await
    }

    async fn thread_subscribed_template(
        &self,
        thread_ts: &str,
    ) -> Result<Option<RouteTarget>, RepositoryError> {
        TemplateRepository::new(&self.pool)
            .find_thread_subscribed(thread_ts)
            .await
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
