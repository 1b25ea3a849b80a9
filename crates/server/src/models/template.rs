//! Message templates and everything hanging off them.

use chrono::{DateTime, Utc};
use secrecy::SecretString;

use slack_relay_core::{
    ActionsBlockId, ApplicationId, ButtonId, CallbackUrl, MessageTimestampId, TemplateId,
};

/// A reusable message definition bound to one channel.
#[derive(Debug, Clone)]
pub struct Template {
    /// Unique template ID.
    pub id: TemplateId,
    /// Owning application.
    pub application_id: ApplicationId,
    /// Name, unique within the application.
    pub name: String,
    /// Slack channel ID messages are posted to.
    pub channel_id: String,
    /// Body of the rendered section block.
    pub message_text: String,
    /// Plain-text fallback shown in notifications.
    pub fallback_text: String,
    /// Forward thread replies to `callback_url`.
    pub thread_subscription: bool,
    /// Endpoint for thread replies.
    pub callback_url: Option<CallbackUrl>,
    /// When the template was created.
    pub created_at: DateTime<Utc>,
}

/// The interactive button group attached to a template.
#[derive(Debug, Clone)]
pub struct ActionsBlock {
    /// Unique actions block ID.
    pub id: ActionsBlockId,
    /// Owning template (one-to-one).
    pub template_id: TemplateId,
    /// Slack `block_id`, globally unique; inbound interactions carry it back.
    pub block_id: String,
    /// Forward button clicks to `callback_url`.
    pub action_subscription: bool,
    /// Endpoint for button clicks.
    pub callback_url: Option<CallbackUrl>,
}

/// One clickable element of an actions block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    /// Unique button ID. Ascending IDs are creation order.
    pub id: ButtonId,
    /// Owning actions block.
    pub actions_block_id: ActionsBlockId,
    /// Slack `action_id`, unique within the block.
    pub action_id: String,
    /// Button label, unique within the block.
    pub text: String,
}

/// An actions block together with its buttons, in creation order.
#[derive(Debug, Clone)]
pub struct ActionsBlockDetail {
    pub block: ActionsBlock,
    pub buttons: Vec<Button>,
}

/// A template loaded with its optional actions block.
///
/// This is the input of the payload builders.
#[derive(Debug, Clone)]
pub struct TemplateDetail {
    pub template: Template,
    pub actions: Option<ActionsBlockDetail>,
}

impl TemplateDetail {
    /// A template without interactive elements.
    #[must_use]
    pub const fn plain(template: Template) -> Self {
        Self {
            template,
            actions: None,
        }
    }
}

/// The Slack-assigned `ts` of a message posted from a thread-subscribed template.
#[derive(Debug, Clone)]
pub struct MessageTimestamp {
    pub id: MessageTimestampId,
    pub template_id: TemplateId,
    pub ts: String,
    pub created_at: DateTime<Utc>,
}

/// Where an inbound interaction or thread reply should be forwarded.
///
/// Resolved from a subscribed actions block or template; carries the owning
/// application's signing secret so the request can be verified.
#[derive(Clone)]
pub struct RouteTarget {
    pub application_id: ApplicationId,
    pub template_id: TemplateId,
    pub signing_secret: SecretString,
    pub callback_url: CallbackUrl,
}

impl std::fmt::Debug for RouteTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteTarget")
            .field("application_id", &self.application_id)
            .field("template_id", &self.template_id)
            .field("signing_secret", &"[REDACTED]")
            .field("callback_url", &self.callback_url)
            .finish()
    }
}
