//! Slack Block Kit and webhook types.
//!
//! Only the subset of Block Kit that templates render is modelled: a
//! `mrkdwn` section, a divider and an actions block of buttons. Inbound types
//! are deliberately lenient: every field the relay does not route on is
//! optional, and unknown fields are ignored.
//!
//! See: <https://api.slack.com/block-kit>

use serde::{Deserialize, Serialize};

/// Body of `chat.postMessage` and `chat.update`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessagePayload {
    /// Channel ID to post to.
    pub channel: String,
    /// Plain-text fallback (notifications, screen readers).
    pub text: String,
    /// Message blocks.
    pub blocks: Vec<Block>,
    /// Target message, for updates only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ts: Option<String>,
}

/// Body of `chat.delete`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteMessage {
    pub channel: String,
    pub ts: String,
}

/// Block Kit block types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    /// Section block with markdown text.
    Section { text: Text },
    /// Divider block (horizontal line).
    Divider,
    /// Actions block with interactive elements.
    Actions {
        block_id: String,
        elements: Vec<ActionElement>,
    },
}

/// Text object types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Text {
    /// Plain text (no formatting).
    PlainText { text: String },
    /// Markdown text (supports formatting).
    Mrkdwn { text: String },
}

impl Text {
    /// Create a plain text object.
    #[must_use]
    pub fn plain(text: impl Into<String>) -> Self {
        Self::PlainText { text: text.into() }
    }

    /// Create a markdown text object.
    #[must_use]
    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }

    /// The raw text, whatever the formatting.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::PlainText { text } | Self::Mrkdwn { text } => text,
        }
    }
}

/// Action block elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionElement {
    /// Interactive button.
    Button { action_id: String, text: Text },
}

// =============================================================================
// Response Types
// =============================================================================

/// A Web API response, passed back to callers unchanged.
///
/// Slack reports most failures as HTTP 200 with `"ok": false`, so both the
/// status and the body are kept.
#[derive(Debug, Clone, PartialEq)]
pub struct SlackResponse {
    /// HTTP status code returned by Slack.
    pub status: u16,
    /// Parsed JSON body.
    pub body: serde_json::Value,
}

impl SlackResponse {
    /// Whether Slack accepted the call: a 2xx status and `"ok": true`.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
            && self
                .body
                .get("ok")
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(false)
    }

    /// The message timestamp Slack assigned, if present.
    #[must_use]
    pub fn ts(&self) -> Option<&str> {
        self.body.get("ts").and_then(serde_json::Value::as_str)
    }

    /// Slack's error code (`channel_not_found`, `invalid_auth`, ...), if any.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.body.get("error").and_then(serde_json::Value::as_str)
    }
}

// =============================================================================
// Inbound Webhook Types
// =============================================================================

/// Decoded `payload` field of an interactivity request.
///
/// Shortcuts and view submissions carry no `actions`, so the list defaults
/// to empty.
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionPayload {
    /// Type of interaction (`block_actions`, `shortcut`, ...).
    #[serde(rename = "type", default)]
    pub interaction_type: Option<String>,
    /// Actions that were triggered.
    #[serde(default)]
    pub actions: Vec<InteractionAction>,
}

impl InteractionPayload {
    /// `block_id` of the first action, the relay's correlation key.
    #[must_use]
    pub fn block_id(&self) -> Option<&str> {
        self.actions.first().and_then(|a| a.block_id.as_deref())
    }
}

/// Action that was triggered.
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionAction {
    /// Action ID set on the button.
    #[serde(default)]
    pub action_id: Option<String>,
    /// Block ID containing this action.
    #[serde(default)]
    pub block_id: Option<String>,
}

/// Outer envelope of an Events API request.
#[derive(Debug, Clone, Deserialize)]
pub struct EventEnvelope {
    /// `event_callback`, `url_verification`, ...
    #[serde(rename = "type", default)]
    pub envelope_type: Option<String>,
    /// The wrapped event, absent for `url_verification`.
    #[serde(default)]
    pub event: Option<EventBody>,
}

impl EventEnvelope {
    /// `thread_ts` of the wrapped event; present only on thread replies.
    #[must_use]
    pub fn thread_ts(&self) -> Option<&str> {
        self.event.as_ref().and_then(|e| e.thread_ts.as_deref())
    }
}

/// The event inside an [`EventEnvelope`].
///
/// Only the fields routing reads; the shape of the rest (`channel` is an
/// object on `channel_*` events) varies by event type.
#[derive(Debug, Clone, Deserialize)]
pub struct EventBody {
    #[serde(rename = "type", default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub thread_ts: Option<String>,
}
