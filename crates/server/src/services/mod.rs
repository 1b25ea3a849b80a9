//! Business logic services for the relay.
//!
//! # Services
//!
//! - `dispatcher` - Sends template messages and records thread timestamps
//! - `messages` - Name-based post/update/delete on top of the dispatcher
//! - `interactions` - Routes button clicks to subscribed actions blocks
//! - `events` - Routes thread replies to subscribed templates
//! - `forwarder` - Bounded queue and worker delivering payloads to callbacks

pub mod dispatcher;
pub mod events;
pub mod forwarder;
pub mod interactions;
pub mod messages;
pub mod webhook;

pub use dispatcher::{DispatchResult, MessageDispatcher};
pub use events::EventRouter;
pub use forwarder::{
    DEFAULT_QUEUE_CAPACITY, ForwardError, ForwardJob, ForwardOrigin, ForwardQueue, ForwardWorker,
};
pub use interactions::InteractionRouter;
pub use messages::{MessageError, MessageService};
pub use webhook::{RouteOutcome, WebhookRequest};
