//! Name-based message operations.
//!
//! Callers refer to applications and templates by name. Names are resolved
//! before anything is sent; a miss fails fast with a not-found error.

use std::sync::Arc;

use thiserror::Error;
use tracing::instrument;

use crate::db::{MessageStore, RepositoryError};
use crate::models::{Application, TemplateDetail};
use crate::slack::SlackError;

use super::dispatcher::{DispatchResult, MessageDispatcher};

/// Errors from name-based message operations.
#[derive(Debug, Error)]
pub enum MessageError {
    #[error("Application with this name does not exist.")]
    ApplicationNotFound,

    #[error("Template with this name does not exist.")]
    TemplateNotFound,

    #[error(transparent)]
    Store(#[from] RepositoryError),

    #[error(transparent)]
    Slack(#[from] SlackError),
}

/// Resolves names and hands off to the [`MessageDispatcher`].
#[derive(Clone)]
pub struct MessageService {
    store: Arc<dyn MessageStore>,
    dispatcher: MessageDispatcher,
}

impl std::fmt::Debug for MessageService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageService")
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

impl MessageService {
    #[must_use]
    pub fn new(store: Arc<dyn MessageStore>, dispatcher: MessageDispatcher) -> Self {
        Self { store, dispatcher }
    }

    /// Post `template_name` of `app_name`.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if either name is unknown, or the store or
    /// transport error otherwise.
    #[instrument(skip(self, text))]
    pub async fn post(
        &self,
        app_name: &str,
        template_name: &str,
        text: Option<&str>,
    ) -> Result<DispatchResult, MessageError> {
        let (application, detail) = self.resolve(app_name, template_name).await?;
        Ok(self
            .dispatcher
            .post_message(&application, &detail, text)
            .await?)
    }

    /// Update the message at `ts` with `template_name` of `app_name`.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if either name is unknown, or the store or
    /// transport error otherwise.
    #[instrument(skip(self, text))]
    pub async fn update(
        &self,
        app_name: &str,
        template_name: &str,
        text: Option<&str>,
        ts: &str,
    ) -> Result<DispatchResult, MessageError> {
        let (application, detail) = self.resolve(app_name, template_name).await?;
        Ok(self
            .dispatcher
            .update_message(&application, &detail, text, ts)
            .await?)
    }

    /// Delete the message at `ts` in `channel_id` using `app_name`'s token.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if the application is unknown, or the store
    /// or transport error otherwise.
    #[instrument(skip(self))]
    pub async fn delete(
        &self,
        app_name: &str,
        channel_id: &str,
        ts: &str,
    ) -> Result<DispatchResult, MessageError> {
        let application = self.application(app_name).await?;
        Ok(self
            .dispatcher
            .delete_message(&application, channel_id, ts)
            .await?)
    }

    async fn application(&self, app_name: &str) -> Result<Application, MessageError> {
        self.store
            .application_by_name(app_name)
            .await?
            .ok_or(MessageError::ApplicationNotFound)
    }

    async fn resolve(
        &self,
        app_name: &str,
        template_name: &str,
    ) -> Result<(Application, TemplateDetail), MessageError> {
        let application = self.application(app_name).await?;
        let detail = self
            .store
            .template_detail(application.id, template_name)
            .await?
            .ok_or(MessageError::TemplateNotFound)?;

        Ok((application, detail))
    }
}
