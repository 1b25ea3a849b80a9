//! Slack integration.
//!
//! This module provides:
//! - [`SlackClient`] for posting, updating and deleting messages
//! - [`ClientRegistry`], one shared client per bot token
//! - Block Kit types and the template payload builders
//! - Webhook signature verification
//!
//! # Flow
//!
//! 1. A caller asks for a template to be posted; the payload is built from
//!    the stored template and sent with the application's bot token
//! 2. A user clicks a button or replies in the message thread
//! 3. Slack calls the interactivity or events webhook
//! 4. The request is matched to a subscribed actions block or template
//! 5. The raw payload is queued for delivery to the registered callback

mod client;
mod error;
mod payload;
mod registry;
mod signature;
mod types;

pub use client::{DEFAULT_API_BASE, SlackClient};
pub use error::SlackError;
pub use payload::{build_post_payload, build_update_payload};
pub use registry::ClientRegistry;
pub use signature::{SIGNATURE_HEADER, TIMESTAMP_HEADER, compute_signature, verify_signature};
pub use types::{
    ActionElement, Block, DeleteMessage, EventBody, EventEnvelope, InteractionAction,
    InteractionPayload, MessagePayload, SlackResponse, Text,
};
