//! Message dispatcher: builds payloads, sends them with the application's bot
//! token and records timestamps for thread-subscribed templates.
//!
//! Slack rejecting a call is data, not an error: the response (status and
//! body) is returned unchanged so callers can pass it on. Only transport
//! failures surface as [`SlackError`].

use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use crate::db::MessageStore;
use crate::models::{Application, MessageTimestamp, TemplateDetail};
use crate::slack::{
    ClientRegistry, SlackError, SlackResponse, build_post_payload, build_update_payload,
};

/// Outcome of a post, update or delete.
#[derive(Debug, Clone)]
pub struct DispatchResult {
    /// Slack's response, unchanged.
    pub response: SlackResponse,
    /// Timestamp recorded for thread routing, on successful posts of
    /// thread-subscribed templates.
    pub recorded: Option<MessageTimestamp>,
}

impl DispatchResult {
    const fn unrecorded(response: SlackResponse) -> Self {
        Self {
            response,
            recorded: None,
        }
    }
}

/// Sends template messages to Slack.
#[derive(Clone)]
pub struct MessageDispatcher {
    store: Arc<dyn MessageStore>,
    clients: ClientRegistry,
}

impl std::fmt::Debug for MessageDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageDispatcher")
            .field("clients", &self.clients)
            .finish_non_exhaustive()
    }
}

impl MessageDispatcher {
    /// Create a dispatcher.
    #[must_use]
    pub fn new(store: Arc<dyn MessageStore>, clients: ClientRegistry) -> Self {
        Self { store, clients }
    }

    /// Post a template message, optionally with extra text.
    ///
    /// On success, and only when the template is thread-subscribed, records
    /// the returned `ts` so replies in the thread can be routed back. The
    /// message is sent before anything is recorded; if recording fails the
    /// message still exists, so the failure is logged and the Slack response
    /// returned as usual.
    ///
    /// # Errors
    ///
    /// Returns `SlackError` if Slack could not be reached or answered with
    /// something other than JSON.
    #[instrument(skip(self, application, detail, text), fields(app = %application.name, template = %detail.template.name))]
    pub async fn post_message(
        &self,
        application: &Application,
        detail: &TemplateDetail,
        text: Option<&str>,
    ) -> Result<DispatchResult, SlackError> {
        let payload = build_post_payload(detail, text);
        let client = self.clients.client_for(&application.bot_token).await;
        let response = client.post_message(&payload).await?;

        if !response.is_ok() || !detail.template.thread_subscription {
            return Ok(DispatchResult::unrecorded(response));
        }

        let Some(ts) = response.ts() else {
            warn!("Slack accepted post without a ts; thread replies cannot be routed");
            return Ok(DispatchResult::unrecorded(response));
        };

        let recorded = match self
            .store
            .record_message_timestamp(detail.template.id, ts)
            .await
        {
            Ok(recorded) => {
                info!(ts, "Recorded message timestamp");
                Some(recorded)
            }
            Err(e) => {
                error!(error = %e, ts, "Failed to record message timestamp; thread replies will be missed");
                None
            }
        };

        Ok(DispatchResult { response, recorded })
    }

    /// Replace the content of the message at `ts` with the template.
    ///
    /// # Errors
    ///
    /// Returns `SlackError` if Slack could not be reached or answered with
    /// something other than JSON.
    #[instrument(skip(self, application, detail, text), fields(app = %application.name, template = %detail.template.name))]
    pub async fn update_message(
        &self,
        application: &Application,
        detail: &TemplateDetail,
        text: Option<&str>,
        ts: &str,
    ) -> Result<DispatchResult, SlackError> {
        let payload = build_update_payload(detail, text, ts);
        let client = self.clients.client_for(&application.bot_token).await;
        let response = client.update_message(&payload).await?;

        Ok(DispatchResult::unrecorded(response))
    }

    /// Delete the message at `ts` in `channel_id`.
    ///
    /// # Errors
    ///
    /// Returns `SlackError` if Slack could not be reached or answered with
    /// something other than JSON.
    #[instrument(skip(self, application), fields(app = %application.name))]
    pub async fn delete_message(
        &self,
        application: &Application,
        channel_id: &str,
        ts: &str,
    ) -> Result<DispatchResult, SlackError> {
        let client = self.clients.client_for(&application.bot_token).await;
        let response = client.delete_message(channel_id, ts).await?;

        Ok(DispatchResult::unrecorded(response))
    }
}
