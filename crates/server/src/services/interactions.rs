//! Interactivity routing: button clicks back to their actions block.
//!
//! Slack POSTs interactions as a form with a single `payload` field holding
//! JSON. The first action's `block_id` is the correlation key; if it belongs
//! to an action-subscribed block, the decoded payload JSON is forwarded to
//! the block's callback URL unchanged.

use std::sync::Arc;

use axum::body::Bytes;
use tracing::{debug, error, info, instrument, warn};

use crate::db::MessageStore;
use crate::slack::InteractionPayload;

use super::forwarder::{ForwardJob, ForwardOrigin, ForwardQueue};
use super::webhook::{RouteOutcome, WebhookRequest, signature_valid};

/// Routes interactivity webhooks.
#[derive(Clone)]
pub struct InteractionRouter {
    store: Arc<dyn MessageStore>,
    queue: ForwardQueue,
    verify_signatures: bool,
}

impl std::fmt::Debug for InteractionRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractionRouter")
            .field("verify_signatures", &self.verify_signatures)
            .finish_non_exhaustive()
    }
}

impl InteractionRouter {
    #[must_use]
    pub fn new(store: Arc<dyn MessageStore>, queue: ForwardQueue, verify_signatures: bool) -> Self {
        Self {
            store,
            queue,
            verify_signatures,
        }
    }

    /// Route one interaction. Never fails; the outcome is informational.
    #[instrument(skip_all)]
    pub async fn route(&self, request: &WebhookRequest) -> RouteOutcome {
        let Some(payload) = decode_payload_field(&request.body) else {
            warn!("Interaction body has no payload field");
            return RouteOutcome::Malformed;
        };

        let interaction: InteractionPayload = match serde_json::from_str(&payload) {
            Ok(interaction) => interaction,
            Err(e) => {
                warn!(error = %e, "Interaction payload is not valid JSON");
                return RouteOutcome::Malformed;
            }
        };

        let Some(block_id) = interaction.block_id() else {
            debug!(interaction_type = ?interaction.interaction_type, "Interaction has no block_id");
            return RouteOutcome::NoCorrelationKey;
        };

        let target = match self.store.subscribed_actions_block(block_id).await {
            Ok(Some(target)) => target,
            Ok(None) => {
                debug!(block_id, "No action-subscribed block");
                return RouteOutcome::NotSubscribed;
            }
            Err(e) => {
                error!(error = %e, block_id, "Actions block lookup failed");
                return RouteOutcome::StoreUnavailable;
            }
        };

        if self.verify_signatures && !signature_valid(&target, request) {
            return RouteOutcome::SignatureRejected;
        }

        let job = ForwardJob::new(
            target.callback_url,
            Bytes::from(payload),
            ForwardOrigin::Interaction {
                block_id: block_id.to_owned(),
            },
        );

        match self.queue.enqueue(job) {
            Ok(job_id) => {
                info!(%job_id, block_id, "Queued interaction forward");
                RouteOutcome::Forwarded { job_id }
            }
            Err(e) => {
                error!(error = %e, block_id, "Dropped interaction forward");
                RouteOutcome::Dropped
            }
        }
    }
}

/// The decoded value of the `payload` form field.
fn decode_payload_field(body: &[u8]) -> Option<String> {
    url::form_urlencoded::parse(body)
        .find(|(key, _)| key == "payload")
        .map(|(_, value)| value.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_payload_field() {
        let body = b"payload=%7B%22type%22%3A%22block_actions%22%7D";
        assert_eq!(
            decode_payload_field(body).as_deref(),
            Some(r#"{"type":"block_actions"}"#)
        );
    }

    #[test]
    fn test_decode_payload_field_plus_is_space() {
        let body = b"payload=%7B%22text%22%3A%22a+b%22%7D";
        assert_eq!(
            decode_payload_field(body).as_deref(),
            Some(r#"{"text":"a b"}"#)
        );
    }

    #[test]
    fn test_decode_payload_field_missing() {
        assert_eq!(decode_payload_field(b"token=abc"), None);
        assert_eq!(decode_payload_field(b""), None);
    }
}
