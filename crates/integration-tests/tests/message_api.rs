//! Integration tests for posting, updating and deleting template messages.
//!
//! Runs the relay router against a mock Slack Web API; no database needed.

use axum::{
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
    response::Response,
};
use serde_json::{Value, json};
use tower::ServiceExt;

use slack_relay_integration_tests::{ActionsSpec, POSTED_TS, TemplateSpec, TestRelay};

async fn send(relay: &TestRelay, method: Method, body: &Value) -> Response {
    let request = Request::builder()
        .method(method)
        .uri("/api/message")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request");

    relay.router().oneshot(request).await.expect("response")
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

// =============================================================================
// Post
// =============================================================================

#[tokio::test]
async fn test_post_renders_template_with_buttons() {
    let relay = TestRelay::start().await;
    let app = relay.store.add_application("deploys");
    relay.store.add_template(
        &app,
        TemplateSpec::new("finished").with_actions(
            ActionsSpec::new("finished_actions")
                .button("rollback", "Roll back")
                .button("ack", "Acknowledge"),
        ),
    );

    let response = send(
        &relay,
        Method::POST,
        &json!({"app_name": "deploys", "template_name": "finished", "text": "build #42"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["ts"], POSTED_TS);

    let calls = relay.slack.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].method, "chat.postMessage");
    assert_eq!(calls[0].authorization.as_deref(), Some("Bearer xoxb-deploys"));
    assert_eq!(
        calls[0].body,
        json!({
            "channel": "C0TEST",
            "text": "finished",
            "blocks": [
                {"type": "section", "text": {"type": "mrkdwn", "text": "*finished*\n\nbuild #42"}},
                {"type": "divider"},
                {
                    "type": "actions",
                    "block_id": "finished_actions",
                    "elements": [
                        {"type": "button", "action_id": "rollback", "text": {"type": "plain_text", "text": "Roll back"}},
                        {"type": "button", "action_id": "ack", "text": {"type": "plain_text", "text": "Acknowledge"}}
                    ]
                }
            ]
        })
    );
}

#[tokio::test]
async fn test_post_records_ts_only_for_thread_subscribed_templates() {
    let relay = TestRelay::start().await;
    let app = relay.store.add_application("deploys");
    let plain = relay.store.add_template(&app, TemplateSpec::new("plain"));
    let threaded = relay.store.add_template(
        &app,
        TemplateSpec::new("threaded").thread_subscribed("https://ci.internal/thread"),
    );

    for name in ["plain", "threaded"] {
        let response = send(
            &relay,
            Method::POST,
            &json!({"app_name": "deploys", "template_name": name}),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert!(relay.store.timestamps_for(plain.template.id).is_empty());
    let recorded = relay.store.timestamps_for(threaded.template.id);
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].ts, POSTED_TS);
}

#[tokio::test]
async fn test_callback_url_without_subscription_records_nothing() {
    let relay = TestRelay::start().await;
    let app = relay.store.add_application("deploys");
    let detail = relay.store.add_template(
        &app,
        TemplateSpec::new("quiet").thread_callback_only("https://ci.internal/thread"),
    );

    send(
        &relay,
        Method::POST,
        &json!({"app_name": "deploys", "template_name": "quiet"}),
    )
    .await;

    assert!(relay.store.timestamps_for(detail.template.id).is_empty());
}

#[tokio::test]
async fn test_rejected_post_records_nothing_and_passes_response_through() {
    let relay = TestRelay::start().await;
    let app = relay.store.add_application("deploys");
    relay.store.add_template(
        &app,
        TemplateSpec::new("threaded").thread_subscribed("https://ci.internal/thread"),
    );
    relay
        .slack
        .respond_with(200, json!({"ok": false, "error": "channel_not_found"}));

    let response = send(
        &relay,
        Method::POST,
        &json!({"app_name": "deploys", "template_name": "threaded"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({"ok": false, "error": "channel_not_found"})
    );
    assert!(relay.store.timestamps().is_empty());
}

#[tokio::test]
async fn test_slack_status_code_is_passed_through() {
    let relay = TestRelay::start().await;
    let app = relay.store.add_application("deploys");
    relay.store.add_template(&app, TemplateSpec::new("finished"));
    relay
        .slack
        .respond_with(429, json!({"ok": false, "error": "ratelimited"}));

    let response = send(
        &relay,
        Method::POST,
        &json!({"app_name": "deploys", "template_name": "finished"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json_body(response).await["error"], "ratelimited");
}

#[tokio::test]
async fn test_post_succeeds_when_recording_ts_fails() {
    let relay = TestRelay::start().await;
    let app = relay.store.add_application("deploys");
    relay.store.add_template(
        &app,
        TemplateSpec::new("threaded").thread_subscribed("https://ci.internal/thread"),
    );
    relay.store.fail_timestamp_writes();

    let response = send(
        &relay,
        Method::POST,
        &json!({"app_name": "deploys", "template_name": "threaded"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["ts"], POSTED_TS);
    assert!(relay.store.timestamps().is_empty());
}

// =============================================================================
// Update and delete
// =============================================================================

#[tokio::test]
async fn test_update_sends_ts_and_records_nothing() {
    let relay = TestRelay::start().await;
    let app = relay.store.add_application("deploys");
    relay.store.add_template(
        &app,
        TemplateSpec::new("threaded").thread_subscribed("https://ci.internal/thread"),
    );

    let response = send(
        &relay,
        Method::PUT,
        &json!({
            "app_name": "deploys",
            "template_name": "threaded",
            "text": "rolled back",
            "ts": "1700000000.000900"
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let calls = relay.slack.calls();
    assert_eq!(calls[0].method, "chat.update");
    assert_eq!(calls[0].body["ts"], "1700000000.000900");
    assert_eq!(calls[0].body["channel"], "C0TEST");
    assert_eq!(
        calls[0].body["blocks"][0]["text"]["text"],
        "*threaded*\n\nrolled back"
    );
    assert!(relay.store.timestamps().is_empty());
}

#[tokio::test]
async fn test_delete_needs_no_template() {
    let relay = TestRelay::start().await;
    relay.store.add_application("deploys");

    let response = send(
        &relay,
        Method::DELETE,
        &json!({"app_name": "deploys", "channel_id": "C0OTHER", "ts": "1700000000.000900"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let calls = relay.slack.calls();
    assert_eq!(calls[0].method, "chat.delete");
    assert_eq!(
        calls[0].body,
        json!({"channel": "C0OTHER", "ts": "1700000000.000900"})
    );
}

// =============================================================================
// Lookup and validation errors
// =============================================================================

#[tokio::test]
async fn test_unknown_application_is_404() {
    let relay = TestRelay::start().await;

    let response = send(
        &relay,
        Method::POST,
        &json!({"app_name": "nope", "template_name": "finished"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        json_body(response).await,
        json!({"error": "Application with this name does not exist."})
    );
    assert!(relay.slack.calls().is_empty());
}

#[tokio::test]
async fn test_unknown_template_is_404() {
    let relay = TestRelay::start().await;
    relay.store.add_application("deploys");

    let response = send(
        &relay,
        Method::PUT,
        &json!({"app_name": "deploys", "template_name": "nope", "ts": "1.0"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        json_body(response).await,
        json!({"error": "Template with this name does not exist."})
    );
}

#[tokio::test]
async fn test_template_of_another_application_is_not_found() {
    let relay = TestRelay::start().await;
    let owner = relay.store.add_application("deploys");
    relay.store.add_application("billing");
    relay.store.add_template(&owner, TemplateSpec::new("finished"));

    let response = send(
        &relay,
        Method::POST,
        &json!({"app_name": "billing", "template_name": "finished"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_field_is_400() {
    let relay = TestRelay::start().await;

    let response = send(&relay, Method::POST, &json!({"app_name": "deploys"})).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["error"].is_string());
}

#[tokio::test]
async fn test_blank_field_is_400() {
    let relay = TestRelay::start().await;

    let response = send(
        &relay,
        Method::DELETE,
        &json!({"app_name": "deploys", "channel_id": "C1", "ts": " "}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        json!({"error": "Bad request: ts may not be blank"})
    );
}

#[tokio::test]
async fn test_health_endpoints() {
    let relay = TestRelay::start().await;

    for uri in ["/health", "/health/ready"] {
        let request = Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request");
        let response = relay.router().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
    }
}
