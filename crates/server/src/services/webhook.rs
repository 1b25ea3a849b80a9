//! Shared pieces of the inbound webhook routers.

use axum::body::Bytes;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::RouteTarget;
use crate::slack::verify_signature;

/// An inbound Slack webhook request: the raw body plus signing headers.
#[derive(Debug, Clone)]
pub struct WebhookRequest {
    pub body: Bytes,
    /// `X-Slack-Request-Timestamp`, if sent.
    pub timestamp: Option<String>,
    /// `X-Slack-Signature`, if sent.
    pub signature: Option<String>,
}

impl WebhookRequest {
    /// A request without signing headers.
    #[must_use]
    pub fn unsigned(body: impl Into<Bytes>) -> Self {
        Self {
            body: body.into(),
            timestamp: None,
            signature: None,
        }
    }
}

/// What a router did with a request.
///
/// The HTTP acknowledgment never depends on this; it exists for logging and
/// tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// A forward was queued.
    Forwarded { job_id: Uuid },
    /// The body could not be decoded.
    Malformed,
    /// The request carries no `block_id` / `thread_ts`.
    NoCorrelationKey,
    /// Nothing subscribed matches the correlation key.
    NotSubscribed,
    /// The signature did not verify against the owning application's secret.
    SignatureRejected,
    /// The lookup failed.
    StoreUnavailable,
    /// The forward queue refused the job.
    Dropped,
}

/// Check `request` was signed with the target application's secret.
pub(super) fn signature_valid(target: &RouteTarget, request: &WebhookRequest) -> bool {
    let (Some(timestamp), Some(signature)) = (&request.timestamp, &request.signature) else {
        warn!(application_id = %target.application_id, "Webhook request missing signature headers");
        return false;
    };

    match verify_signature(&target.signing_secret, timestamp, &request.body, signature) {
        Ok(()) => {
            debug!("Webhook signature verified");
            true
        }
        Err(e) => {
            warn!(application_id = %target.application_id, error = %e, "Webhook signature rejected");
            false
        }
    }
}
