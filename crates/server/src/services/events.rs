//! Events API routing: thread replies back to their template.
//!
//! A message event carrying `thread_ts` is a reply in the thread of the
//! message with that `ts`. If a thread-subscribed template posted it, the raw
//! event body is forwarded to the template's callback URL.

use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use crate::db::MessageStore;
use crate::slack::EventEnvelope;

use super::forwarder::{ForwardJob, ForwardOrigin, ForwardQueue};
use super::webhook::{RouteOutcome, WebhookRequest, signature_valid};

/// Routes Events API webhooks.
#[derive(Clone)]
pub struct EventRouter {
    store: Arc<dyn MessageStore>,
    queue: ForwardQueue,
    verify_signatures: bool,
}

impl std::fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRouter")
            .field("verify_signatures", &self.verify_signatures)
            .finish_non_exhaustive()
    }
}

impl EventRouter {
    #[must_use]
    pub fn new(store: Arc<dyn MessageStore>, queue: ForwardQueue, verify_signatures: bool) -> Self {
        Self {
            store,
            queue,
            verify_signatures,
        }
    }

    /// Route one event. Never fails; the outcome is informational.
    #[instrument(skip_all)]
    pub async fn route(&self, request: &WebhookRequest) -> RouteOutcome {
        let envelope: EventEnvelope = match serde_json::from_slice(&request.body) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "Event body is not valid JSON");
                return RouteOutcome::Malformed;
            }
        };

        let Some(thread_ts) = envelope.thread_ts() else {
            debug!(
                envelope_type = ?envelope.envelope_type,
                event_type = ?envelope.event.as_ref().and_then(|e| e.event_type.as_deref()),
                "Event is not a thread reply"
            );
            return RouteOutcome::NoCorrelationKey;
        };

        let target = match self.store.thread_subscribed_template(thread_ts).await {
            Ok(Some(target)) => target,
            Ok(None) => {
                debug!(thread_ts, "No thread-subscribed template");
                return RouteOutcome::NotSubscribed;
            }
            Err(e) => {
                error!(error = %e, thread_ts, "Thread template lookup failed");
                return RouteOutcome::StoreUnavailable;
            }
        };

        if self.verify_signatures && !signature_valid(&target, request) {
            return RouteOutcome::SignatureRejected;
        }

        let origin = ForwardOrigin::ThreadReply {
            template_id: target.template_id,
            thread_ts: thread_ts.to_owned(),
        };
        let job = ForwardJob::new(target.callback_url, request.body.clone(), origin);

        match self.queue.enqueue(job) {
            Ok(job_id) => {
                info!(%job_id, thread_ts, "Queued thread reply forward");
                RouteOutcome::Forwarded { job_id }
            }
            Err(e) => {
                error!(error = %e, thread_ts, "Dropped thread reply forward");
                RouteOutcome::Dropped
            }
        }
    }
}
