//! Slack-related errors.

use thiserror::Error;

/// Errors that can occur when talking to Slack or handling its webhooks.
///
/// Slack rejecting a call (`"ok": false`) is not an error here: it comes back
/// as a [`SlackResponse`](super::SlackResponse) for the caller to pass on.
#[derive(Debug, Error)]
pub enum SlackError {
    /// HTTP request failed before a response arrived.
    #[error("Slack request failed: {0}")]
    Request(String),

    /// Response body could not be read or parsed.
    #[error("Slack response error: {0}")]
    Response(String),

    /// Invalid webhook signature.
    #[error("Invalid Slack signature: {0}")]
    InvalidSignature(String),
}
