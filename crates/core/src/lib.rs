//! Slack Relay Core - Shared types library.
//!
//! This crate provides common types used across all Slack Relay components:
//! - `server` - Message dispatch and webhook routing service
//! - `cli` - Command-line tools for migrations and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure validation - no I/O, no
//! database access, no HTTP clients.
//!
//! # Modules
//!
//! - [`types`] - Typed entity IDs and callback subscription rules

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
