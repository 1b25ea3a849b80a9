//! Integration tests for forwarding button clicks to subscribed callbacks.

use std::time::Duration;

use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use slack_relay_integration_tests::{
    ActionsSpec, SIGNING_SECRET, TemplateSpec, TestRelay, block_action, interaction_body, sign,
};
use slack_relay_server::services::{RouteOutcome, WebhookRequest};
use slack_relay_server::slack::{SIGNATURE_HEADER, TIMESTAMP_HEADER};

const SETTLE: Duration = Duration::from_millis(200);

fn subscribed_block(relay: &TestRelay) {
    let app = relay.store.add_application("deploys");
    relay.store.add_template(
        &app,
        TemplateSpec::new("finished").with_actions(
            ActionsSpec::new("finished_actions")
                .subscribed(&relay.sink.url())
                .button("rollback", "Roll back"),
        ),
    );
}

fn interaction_request(body: String, signed_with: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/slack/interactivity")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");

    if let Some(secret) = signed_with {
        let (timestamp, signature) = sign(secret, body.as_bytes());
        builder = builder
            .header(TIMESTAMP_HEADER, timestamp)
            .header(SIGNATURE_HEADER, signature);
    }

    builder.body(Body::from(body)).expect("request")
}

#[tokio::test]
async fn test_subscribed_click_forwards_payload_json() {
    let relay = TestRelay::start().await;
    subscribed_block(&relay);
    let payload = block_action("finished_actions", "rollback");

    let response = relay
        .router()
        .oneshot(interaction_request(interaction_body(&payload), None))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    assert!(body.is_empty());

    let received = relay.sink.wait_for(1).await;
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].content_type.as_deref(), Some("application/json"));
    let forwarded: Value = serde_json::from_slice(&received[0].body).expect("json forward");
    assert_eq!(forwarded, payload);
}

#[tokio::test]
async fn test_unsubscribed_block_is_acknowledged_without_forwarding() {
    let relay = TestRelay::start().await;
    let app = relay.store.add_application("deploys");
    relay.store.add_template(
        &app,
        TemplateSpec::new("finished").with_actions(
            ActionsSpec::new("finished_actions")
                .callback_only(&relay.sink.url())
                .button("rollback", "Roll back"),
        ),
    );
    let body = interaction_body(&block_action("finished_actions", "rollback"));

    let response = relay
        .router()
        .oneshot(interaction_request(body.clone(), None))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        relay
            .state
            .interactions()
            .route(&WebhookRequest::unsigned(body))
            .await,
        RouteOutcome::NotSubscribed
    );
    assert!(relay.sink.settle(SETTLE).await.is_empty());
}

#[tokio::test]
async fn test_unknown_block_id_is_not_subscribed() {
    let relay = TestRelay::start().await;
    subscribed_block(&relay);
    let body = interaction_body(&block_action("somebody_elses_block", "rollback"));

    let outcome = relay
        .state
        .interactions()
        .route(&WebhookRequest::unsigned(body))
        .await;

    assert_eq!(outcome, RouteOutcome::NotSubscribed);
}

#[tokio::test]
async fn test_payload_without_actions_has_no_correlation_key() {
    let relay = TestRelay::start().await;
    subscribed_block(&relay);
    let body = interaction_body(&json!({"type": "shortcut", "callback_id": "open"}));

    let outcome = relay
        .state
        .interactions()
        .route(&WebhookRequest::unsigned(body))
        .await;

    assert_eq!(outcome, RouteOutcome::NoCorrelationKey);
}

#[tokio::test]
async fn test_malformed_bodies_are_acknowledged() {
    let relay = TestRelay::start().await;
    subscribed_block(&relay);

    for body in ["", "token=abc", "payload=%7Bnot-json"] {
        let response = relay
            .router()
            .oneshot(interaction_request(body.to_string(), None))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK, "{body:?}");

        let outcome = relay
            .state
            .interactions()
            .route(&WebhookRequest::unsigned(body))
            .await;
        assert_eq!(outcome, RouteOutcome::Malformed, "{body:?}");
    }

    assert!(relay.sink.settle(SETTLE).await.is_empty());
}

// =============================================================================
// Signature verification
// =============================================================================

#[tokio::test]
async fn test_signed_click_forwards_when_verification_enabled() {
    let relay = TestRelay::with_verification(true).await;
    subscribed_block(&relay);
    let body = interaction_body(&block_action("finished_actions", "rollback"));

    relay
        .router()
        .oneshot(interaction_request(body, Some(SIGNING_SECRET)))
        .await
        .expect("response");

    assert_eq!(relay.sink.wait_for(1).await.len(), 1);
}

#[tokio::test]
async fn test_bad_signature_is_acknowledged_but_not_forwarded() {
    let relay = TestRelay::with_verification(true).await;
    subscribed_block(&relay);
    let body = interaction_body(&block_action("finished_actions", "rollback"));

    let response = relay
        .router()
        .oneshot(interaction_request(body, Some("wrong-secret")))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert!(relay.sink.settle(SETTLE).await.is_empty());
}

#[tokio::test]
async fn test_unsigned_request_rejected_when_verification_enabled() {
    let relay = TestRelay::with_verification(true).await;
    subscribed_block(&relay);
    let body = interaction_body(&block_action("finished_actions", "rollback"));

    let outcome = relay
        .state
        .interactions()
        .route(&WebhookRequest::unsigned(body))
        .await;

    assert_eq!(outcome, RouteOutcome::SignatureRejected);
}

#[tokio::test]
async fn test_failing_callback_does_not_affect_acknowledgment() {
    let relay = TestRelay::start().await;
    subscribed_block(&relay);
    relay.sink.respond_with(500);
    let body = interaction_body(&block_action("finished_actions", "rollback"));

    let response = relay
        .router()
        .oneshot(interaction_request(body, None))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(relay.sink.wait_for(1).await.len(), 1);
}
