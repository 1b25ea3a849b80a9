//! Slack relay library.
//!
//! Posts, updates and deletes templated Slack messages on behalf of
//! registered applications, and forwards button clicks and thread replies on
//! those messages to the callback endpoints that subscribed to them.
//!
//! The binary in `main.rs` wires these modules to `PostgreSQL` and serves
//! [`routes::routes`]; tests wire them to in-memory stores and mock servers.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod slack;
pub mod state;
