//! Slack webhook handlers.
//!
//! Slack retries and eventually disables endpoints that fail, so both
//! handlers acknowledge with 200 no matter what routing decided.

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    response::IntoResponse,
    routing::post,
};
use tracing::{debug, instrument};

use crate::services::WebhookRequest;
use crate::slack::{SIGNATURE_HEADER, TIMESTAMP_HEADER};
use crate::state::AppState;

/// Create Slack webhook routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/slack/interactivity", post(handle_interaction))
        .route("/api/slack/events", post(handle_event))
}

/// Handle an interactivity webhook. Responds 200 with an empty body.
#[instrument(skip_all)]
async fn handle_interaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let request = webhook_request(&headers, body);
    let outcome = state.interactions().route(&request).await;
    debug!(?outcome, "Interaction routed");

    StatusCode::OK
}

/// Handle an Events API webhook. Responds 200 echoing the body, which also
/// answers `url_verification` challenges.
#[instrument(skip_all)]
async fn handle_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let request = webhook_request(&headers, body);
    let outcome = state.events().route(&request).await;
    debug!(?outcome, "Event routed");

    (
        StatusCode::OK,
        [(CONTENT_TYPE, "application/json")],
        request.body,
    )
}

fn webhook_request(headers: &HeaderMap, body: Bytes) -> WebhookRequest {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    };

    WebhookRequest {
        body,
        timestamp: header(TIMESTAMP_HEADER),
        signature: header(SIGNATURE_HEADER),
    }
}
