//! Integration test support for the Slack relay.
//!
//! # Running Tests
//!
//! ```bash
//! # Everything that needs no database
//! cargo test -p slack-relay-integration-tests
//!
//! # Store constraint tests against a scratch database
//! TEST_DATABASE_URL=postgres://localhost/relay_test \
//!     cargo test -p slack-relay-integration-tests -- --ignored
//! ```
//!
//! # Test Support
//!
//! - [`InMemoryStore`] - `MessageStore` over plain vectors
//! - [`MockSlack`] - Local server standing in for the Slack Web API
//! - [`CallbackSink`] - Local server recording forwarded payloads
//! - [`TestRelay`] - All of the above wired into an `AppState`

#![allow(clippy::missing_panics_doc)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU16, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    routing::post,
};
use chrono::Utc;
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::sync::Notify;

use slack_relay_core::{
    ActionsBlockId, ApplicationId, ButtonId, CallbackUrl, MessageTimestampId, Subscription,
    TemplateId,
};
use slack_relay_server::db::{MessageStore, RepositoryError};
use slack_relay_server::models::{
    ActionsBlock, ActionsBlockDetail, Application, Button, MessageTimestamp, RouteTarget, Template,
    TemplateDetail,
};
use slack_relay_server::routes;
use slack_relay_server::services::ForwardQueue;
use slack_relay_server::slack::{ClientRegistry, compute_signature};
use slack_relay_server::state::AppState;

/// `ts` the mock Slack API assigns to posted messages by default.
pub const POSTED_TS: &str = "1700000000.000100";

/// Signing secret of applications created with [`InMemoryStore::add_application`].
pub const SIGNING_SECRET: &str = "e1b5c0a8d2f94b7a9c3e6f1d8a2b4c7e";

// =============================================================================
// In-memory store
// =============================================================================

/// A [`MessageStore`] backed by vectors, with the same lookup rules as the
/// `PostgreSQL` store.
#[derive(Default)]
pub struct InMemoryStore {
    data: Mutex<StoreData>,
    next_id: AtomicI32,
    fail_timestamp_writes: AtomicBool,
}

#[derive(Default)]
struct StoreData {
    applications: Vec<Application>,
    templates: Vec<TemplateDetail>,
    timestamps: Vec<MessageTimestamp>,
}

/// Template to add to an [`InMemoryStore`].
#[derive(Debug, Clone)]
pub struct TemplateSpec {
    pub name: String,
    pub channel_id: String,
    pub message_text: String,
    pub fallback_text: String,
    pub thread_subscription: bool,
    pub callback_url: Option<String>,
    pub actions: Option<ActionsSpec>,
}

impl TemplateSpec {
    /// A plain template posting to `C0TEST`.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            channel_id: "C0TEST".to_string(),
            message_text: format!("*{name}*"),
            fallback_text: name.to_string(),
            thread_subscription: false,
            callback_url: None,
            actions: None,
        }
    }

    /// Forward thread replies to `url`.
    #[must_use]
    pub fn thread_subscribed(mut self, url: &str) -> Self {
        self.thread_subscription = true;
        self.callback_url = Some(url.to_string());
        self
    }

    /// Store `url` without subscribing.
    #[must_use]
    pub fn thread_callback_only(mut self, url: &str) -> Self {
        self.thread_subscription = false;
        self.callback_url = Some(url.to_string());
        self
    }

    #[must_use]
    pub fn with_actions(mut self, actions: ActionsSpec) -> Self {
        self.actions = Some(actions);
        self
    }
}

/// Actions block to attach to a [`TemplateSpec`].
#[derive(Debug, Clone)]
pub struct ActionsSpec {
    pub block_id: String,
    pub action_subscription: bool,
    pub callback_url: Option<String>,
    pub buttons: Vec<(String, String)>,
}

impl ActionsSpec {
    #[must_use]
    pub fn new(block_id: &str) -> Self {
        Self {
            block_id: block_id.to_string(),
            action_subscription: false,
            callback_url: None,
            buttons: Vec::new(),
        }
    }

    /// Forward button clicks to `url`.
    #[must_use]
    pub fn subscribed(mut self, url: &str) -> Self {
        self.action_subscription = true;
        self.callback_url = Some(url.to_string());
        self
    }

    /// Store `url` without subscribing.
    #[must_use]
    pub fn callback_only(mut self, url: &str) -> Self {
        self.action_subscription = false;
        self.callback_url = Some(url.to_string());
        self
    }

    #[must_use]
    pub fn button(mut self, action_id: &str, text: &str) -> Self {
        self.buttons.push((action_id.to_string(), text.to_string()));
        self
    }
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> i32 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn data(&self) -> std::sync::MutexGuard<'_, StoreData> {
        self.data.lock().expect("store lock poisoned")
    }

    /// Register an application signed with [`SIGNING_SECRET`] and bot token
    /// `xoxb-{name}`.
    pub fn add_application(&self, name: &str) -> Application {
        let application = Application {
            id: ApplicationId::new(self.next_id()),
            name: name.to_string(),
            signing_secret: SecretString::from(SIGNING_SECRET),
            bot_token: SecretString::from(format!("xoxb-{name}")),
            created_at: Utc::now(),
        };
        self.data().applications.push(application.clone());
        application
    }

    /// Add a template, applying the write-time subscription rules.
    pub fn add_template(&self, application: &Application, fixture: TemplateSpec) -> TemplateDetail {
        let subscription =
            Subscription::normalize(fixture.thread_subscription, fixture.callback_url.as_deref())
                .expect("valid template callback url");

        let template = Template {
            id: TemplateId::new(self.next_id()),
            application_id: application.id,
            name: fixture.name,
            channel_id: fixture.channel_id,
            message_text: fixture.message_text,
            fallback_text: fixture.fallback_text,
            thread_subscription: subscription.is_enabled(),
            callback_url: subscription.callback_url().cloned(),
            created_at: Utc::now(),
        };

        let actions = fixture.actions.map(|actions| {
            let subscription =
                Subscription::normalize(actions.action_subscription, actions.callback_url.as_deref())
                    .expect("valid actions callback url");
            let block = ActionsBlock {
                id: ActionsBlockId::new(self.next_id()),
                template_id: template.id,
                block_id: actions.block_id,
                action_subscription: subscription.is_enabled(),
                callback_url: subscription.callback_url().cloned(),
            };
            let buttons = actions
                .buttons
                .into_iter()
                .map(|(action_id, text)| Button {
                    id: ButtonId::new(self.next_id()),
                    actions_block_id: block.id,
                    action_id,
                    text,
                })
                .collect();
            ActionsBlockDetail { block, buttons }
        });

        let detail = TemplateDetail { template, actions };
        self.data().templates.push(detail.clone());
        detail
    }

    /// Record a timestamp directly, as if a post had succeeded earlier.
    pub fn add_timestamp(&self, template_id: TemplateId, ts: &str) {
        let timestamp = MessageTimestamp {
            id: MessageTimestampId::new(self.next_id()),
            template_id,
            ts: ts.to_string(),
            created_at: Utc::now(),
        };
        self.data().timestamps.push(timestamp);
    }

    /// Make every subsequent timestamp write fail.
    pub fn fail_timestamp_writes(&self) {
        self.fail_timestamp_writes.store(true, Ordering::SeqCst);
    }

    /// All recorded timestamps, oldest first.
    #[must_use]
    pub fn timestamps(&self) -> Vec<MessageTimestamp> {
        self.data().timestamps.clone()
    }

    /// Recorded timestamps of one template.
    #[must_use]
    pub fn timestamps_for(&self, template_id: TemplateId) -> Vec<MessageTimestamp> {
        self.timestamps()
            .into_iter()
            .filter(|t| t.template_id == template_id)
            .collect()
    }

    fn route_target(
        data: &StoreData,
        template: &Template,
        callback_url: Option<&CallbackUrl>,
    ) -> Option<RouteTarget> {
        let application = data
            .applications
            .iter()
            .find(|a| a.id == template.application_id)?;

        Some(RouteTarget {
            application_id: application.id,
            template_id: template.id,
            signing_secret: application.signing_secret.clone(),
            callback_url: callback_url?.clone(),
        })
    }
}

#[async_trait]
impl MessageStore for InMemoryStore {
    async fn application_by_name(
        &self,
        name: &str,
    ) -> Result<Option<Application>, RepositoryError> {
        Ok(self
            .data()
            .applications
            .iter()
            .find(|a| a.name == name)
            .cloned())
    }

    async fn template_detail(
        &self,
        application_id: ApplicationId,
        name: &str,
    ) -> Result<Option<TemplateDetail>, RepositoryError> {
        Ok(self
            .data()
            .templates
            .iter()
            .find(|d| d.template.application_id == application_id && d.template.name == name)
            .cloned())
    }

    async fn record_message_timestamp(
        &self,
        template_id: TemplateId,
        ts: &str,
    ) -> Result<MessageTimestamp, RepositoryError> {
        if self.fail_timestamp_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }

        let timestamp = MessageTimestamp {
            id: MessageTimestampId::new(self.next_id()),
            template_id,
            ts: ts.to_string(),
            created_at: Utc::now(),
        };
        self.data().timestamps.push(timestamp.clone());
        Ok(timestamp)
    }

    async fn subscribed_actions_block(
        &self,
        block_id: &str,
    ) -> Result<Option<RouteTarget>, RepositoryError> {
        let data = self.data();
        let found = data.templates.iter().find_map(|detail| {
            let actions = detail.actions.as_ref()?;
            (actions.block.block_id == block_id && actions.block.action_subscription)
                .then_some((&detail.template, actions.block.callback_url.as_ref()))
        });

        Ok(found.and_then(|(template, url)| Self::route_target(&data, template, url)))
    }

    async fn thread_subscribed_template(
        &self,
        thread_ts: &str,
    ) -> Result<Option<RouteTarget>, RepositoryError> {
        let data = self.data();
        let found = data
            .timestamps
            .iter()
            .rev()
            .filter(|t| t.ts == thread_ts)
            .find_map(|t| {
                data.templates
                    .iter()
                    .map(|d| &d.template)
                    .find(|tpl| tpl.id == t.template_id && tpl.thread_subscription)
            });

        Ok(found.and_then(|template| {
            Self::route_target(&data, template, template.callback_url.as_ref())
        }))
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

// =============================================================================
// Local servers
// =============================================================================

/// Serve `app` on an ephemeral local port.
async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("test listener address");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server failed");
    });

    addr
}

/// One call received by [`MockSlack`].
#[derive(Debug, Clone)]
pub struct SlackCall {
    /// Web API method, e.g. `chat.postMessage`.
    pub method: String,
    pub authorization: Option<String>,
    pub body: Value,
}

/// Stand-in for the Slack Web API.
///
/// Answers every call with the configured response; by default
/// `200 {"ok": true, "ts": POSTED_TS}`.
#[derive(Clone)]
pub struct MockSlack {
    addr: SocketAddr,
    state: Arc<MockSlackState>,
}

struct MockSlackState {
    calls: Mutex<Vec<SlackCall>>,
    response: Mutex<(u16, Value)>,
}

impl MockSlack {
    pub async fn start() -> Self {
        let state = Arc::new(MockSlackState {
            calls: Mutex::default(),
            response: Mutex::new((200, json!({"ok": true, "ts": POSTED_TS}))),
        });

        let app = Router::new()
            .route("/api/{method}", post(mock_slack_method))
            .with_state(Arc::clone(&state));

        Self {
            addr: serve(app).await,
            state,
        }
    }

    /// Base URL to configure the client registry with.
    #[must_use]
    pub fn api_base(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    /// Answer subsequent calls with `status` and `body`.
    pub fn respond_with(&self, status: u16, body: Value) {
        *self.state.response.lock().expect("mock lock poisoned") = (status, body);
    }

    /// Calls received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<SlackCall> {
        self.state.calls.lock().expect("mock lock poisoned").clone()
    }
}

async fn mock_slack_method(
    State(state): State<Arc<MockSlackState>>,
    Path(method): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let call = SlackCall {
        method,
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    };
    state.calls.lock().expect("mock lock poisoned").push(call);

    let (status, body) = state.response.lock().expect("mock lock poisoned").clone();
    (
        StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(body),
    )
}

/// A payload delivered to [`CallbackSink`].
#[derive(Debug, Clone)]
pub struct ReceivedForward {
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// Callback endpoint recording every forward it receives.
#[derive(Clone)]
pub struct CallbackSink {
    addr: SocketAddr,
    state: Arc<SinkState>,
}

struct SinkState {
    received: Mutex<Vec<ReceivedForward>>,
    arrived: Notify,
    status: AtomicU16,
}

impl CallbackSink {
    pub async fn start() -> Self {
        let state = Arc::new(SinkState {
            received: Mutex::default(),
            arrived: Notify::new(),
            status: AtomicU16::new(200),
        });

        let app = Router::new()
            .route("/hook", post(sink_receive))
            .with_state(Arc::clone(&state));

        Self {
            addr: serve(app).await,
            state,
        }
    }

    /// URL to register as a callback.
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}/hook", self.addr)
    }

    /// Answer subsequent forwards with `status`.
    pub fn respond_with(&self, status: u16) {
        self.state.status.store(status, Ordering::SeqCst);
    }

    /// Forwards received so far.
    #[must_use]
    pub fn received(&self) -> Vec<ReceivedForward> {
        self.state.received.lock().expect("sink lock poisoned").clone()
    }

    /// Wait up to five seconds for at least `count` forwards.
    pub async fn wait_for(&self, count: usize) -> Vec<ReceivedForward> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);

        loop {
            let received = self.received();
            if received.len() >= count {
                return received;
            }
            if tokio::time::timeout_at(deadline, self.state.arrived.notified())
                .await
                .is_err()
            {
                return self.received();
            }
        }
    }

    /// Give in-flight forwards `wait` to land, then return what arrived.
    pub async fn settle(&self, wait: Duration) -> Vec<ReceivedForward> {
        tokio::time::sleep(wait).await;
        self.received()
    }
}

async fn sink_receive(
    State(state): State<Arc<SinkState>>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let forward = ReceivedForward {
        content_type: headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned),
        body,
    };
    state.received.lock().expect("sink lock poisoned").push(forward);
    state.arrived.notify_one();

    StatusCode::from_u16(state.status.load(Ordering::SeqCst)).unwrap_or(StatusCode::OK)
}

// =============================================================================
// Relay harness
// =============================================================================

/// A relay wired to an in-memory store, mock Slack and a callback sink, with
/// its forward worker running.
pub struct TestRelay {
    pub store: Arc<InMemoryStore>,
    pub slack: MockSlack,
    pub sink: CallbackSink,
    pub state: AppState,
}

impl TestRelay {
    /// Relay without signature verification.
    pub async fn start() -> Self {
        Self::with_verification(false).await
    }

    pub async fn with_verification(verify_signatures: bool) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let slack = MockSlack::start().await;
        let sink = CallbackSink::start().await;

        let (queue, worker) = ForwardQueue::channel(64);
        tokio::spawn(worker.run());

        let state = AppState::new(
            Arc::clone(&store) as Arc<dyn MessageStore>,
            ClientRegistry::new(&slack.api_base()),
            queue,
            verify_signatures,
        );

        Self {
            store,
            slack,
            sink,
            state,
        }
    }

    /// The HTTP surface, ready for `tower::ServiceExt::oneshot`.
    #[must_use]
    pub fn router(&self) -> Router {
        routes::routes().with_state(self.state.clone())
    }
}

// =============================================================================
// Request helpers
// =============================================================================

/// Form-encode an interaction payload the way Slack sends it.
#[must_use]
pub fn interaction_body(payload: &Value) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .append_pair("payload", &payload.to_string())
        .finish()
}

/// A `block_actions` payload clicking `action_id` in `block_id`.
#[must_use]
pub fn block_action(block_id: &str, action_id: &str) -> Value {
    json!({
        "type": "block_actions",
        "user": {"id": "U0USER", "username": "ana"},
        "container": {"type": "message", "message_ts": POSTED_TS},
        "actions": [
            {"type": "button", "block_id": block_id, "action_id": action_id, "value": "x"}
        ]
    })
}

/// An `event_callback` for a message posted in the thread of `thread_ts`.
#[must_use]
pub fn thread_reply(thread_ts: &str) -> Value {
    json!({
        "type": "event_callback",
        "team_id": "T0TEAM",
        "event": {
            "type": "message",
            "channel": "C0TEST",
            "user": "U0USER",
            "text": "on it",
            "ts": "1700000100.000200",
            "thread_ts": thread_ts
        }
    })
}

/// `(timestamp, signature)` headers for `body` signed now with `secret`.
#[must_use]
pub fn sign(secret: &str, body: &[u8]) -> (String, String) {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system time before epoch")
        .as_secs()
        .to_string();
    let signature = compute_signature(&SecretString::from(secret), &timestamp, body)
        .expect("hmac accepts any key");
    (timestamp, signature)
}
