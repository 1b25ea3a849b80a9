//! Domain models for the relay.
//!
//! Row types live next to their repositories in [`crate::db`]; these are the
//! validated shapes the rest of the crate works with.

pub mod application;
pub mod template;

pub use application::Application;
pub use template::{
    ActionsBlock, ActionsBlockDetail, Button, MessageTimestamp, RouteTarget, Template,
    TemplateDetail,
};
