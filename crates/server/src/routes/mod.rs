//! HTTP route handlers for the relay.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                    - Liveness check
//! GET    /health/ready              - Readiness check (store reachable)
//!
//! # Messages
//! POST   /api/message               - Post a template message
//! PUT    /api/message               - Update a posted message
//! DELETE /api/message               - Delete a posted message
//!
//! # Slack webhooks (always 200)
//! POST   /api/slack/interactivity   - Button clicks
//! POST   /api/slack/events          - Events API (thread replies, url_verification)
//! ```

use axum::{Router, extract::State, http::StatusCode, routing::get};

use crate::state::AppState;

pub mod messages;
pub mod slack;

/// All relay routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(messages::router())
        .merge(slack::router())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
