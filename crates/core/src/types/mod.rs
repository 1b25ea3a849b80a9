//! Core types for Slack Relay.

pub mod callback;
pub mod id;

pub use callback::{CallbackUrl, CallbackUrlError, Subscription};
pub use id::*;
