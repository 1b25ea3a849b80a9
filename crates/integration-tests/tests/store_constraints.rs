//! Integration tests for the `PostgreSQL` store.
//!
//! These run against a real database and are ignored by default:
//!
//! ```bash
//! TEST_DATABASE_URL=postgres://localhost/relay_test \
//!     cargo test -p slack-relay-integration-tests --test store_constraints -- --ignored
//! ```
//!
//! Every test creates its own uniquely named rows, so runs do not interfere.

use secrecy::SecretString;
use sqlx::PgPool;
use uuid::Uuid;

use slack_relay_core::Subscription;
use slack_relay_server::db::{
    self, ActionsBlockRepository, ApplicationRepository, ButtonRepository, MessageStore,
    MessageTimestampRepository, NewTemplate, PgMessageStore, RepositoryError, TemplateRepository,
};
use slack_relay_server::models::{Application, Template};

async fn pool() -> PgPool {
    let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set");
    let pool = db::create_pool(&SecretString::from(url))
        .await
        .expect("connect to test database");
    sqlx::migrate!("../server/migrations")
        .run(&pool)
        .await
        .expect("run migrations");
    pool
}

fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", &Uuid::new_v4().simple().to_string()[..12])
}

async fn application(pool: &PgPool) -> Application {
    ApplicationRepository::new(pool)
        .create(
            &unique("app"),
            &SecretString::from("signing"),
            &SecretString::from("xoxb-test"),
        )
        .await
        .expect("create application")
}

async fn template(pool: &PgPool, app: &Application, subscription: Subscription) -> Template {
    TemplateRepository::new(pool)
        .create(&NewTemplate {
            application_id: app.id,
            name: unique("tpl"),
            channel_id: "C0TEST".to_string(),
            message_text: "*hello*".to_string(),
            fallback_text: "hello".to_string(),
            subscription,
        })
        .await
        .expect("create template")
}

fn subscribed(url: &str) -> Subscription {
    Subscription::normalize(true, Some(url)).expect("valid url")
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_duplicate_application_name_is_conflict() {
    let pool = pool().await;
    let app = application(&pool).await;

    let err = ApplicationRepository::new(&pool)
        .create(
            &app.name,
            &SecretString::from("s"),
            &SecretString::from("t"),
        )
        .await
        .expect_err("duplicate name");

    assert!(matches!(err, RepositoryError::Conflict(_)), "{err:?}");
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_button_conflicts_name_the_violated_rule() {
    let pool = pool().await;
    let app = application(&pool).await;
    let tpl = template(&pool, &app, Subscription::disabled()).await;
    let block = ActionsBlockRepository::new(&pool)
        .create(tpl.id, &unique("block"), &Subscription::disabled())
        .await
        .expect("create block");
    let buttons = ButtonRepository::new(&pool);

    buttons
        .create(block.id, "approve", "Approve")
        .await
        .expect("first button");

    let same_action = buttons
        .create(block.id, "approve", "Looks good")
        .await
        .expect_err("duplicate action_id");
    assert!(
        matches!(&same_action, RepositoryError::Conflict(m) if m.contains("action_id")),
        "{same_action:?}"
    );

    let same_text = buttons
        .create(block.id, "approve_again", "Approve")
        .await
        .expect_err("duplicate text");
    assert!(
        matches!(&same_text, RepositoryError::Conflict(m) if m.contains("text")),
        "{same_text:?}"
    );

    let listed = buttons.list_for_block(block.id).await.expect("list");
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_block_id_is_globally_unique() {
    let pool = pool().await;
    let app = application(&pool).await;
    let first = template(&pool, &app, Subscription::disabled()).await;
    let second = template(&pool, &app, Subscription::disabled()).await;
    let block_id = unique("block");
    let blocks = ActionsBlockRepository::new(&pool);

    blocks
        .create(first.id, &block_id, &Subscription::disabled())
        .await
        .expect("first block");
    let err = blocks
        .create(second.id, &block_id, &Subscription::disabled())
        .await
        .expect_err("duplicate block_id");

    assert!(matches!(err, RepositoryError::Conflict(_)), "{err:?}");
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_template_has_at_most_one_actions_block() {
    let pool = pool().await;
    let app = application(&pool).await;
    let tpl = template(&pool, &app, Subscription::disabled()).await;
    let blocks = ActionsBlockRepository::new(&pool);

    blocks
        .create(tpl.id, &unique("block"), &Subscription::disabled())
        .await
        .expect("first block");
    let err = blocks
        .create(tpl.id, &unique("block"), &Subscription::disabled())
        .await
        .expect_err("second block");

    assert!(matches!(err, RepositoryError::Conflict(_)), "{err:?}");
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_deleting_application_cascades() {
    let pool = pool().await;
    let app = application(&pool).await;
    let tpl = template(&pool, &app, subscribed("https://ci.internal/thread")).await;
    let timestamps = MessageTimestampRepository::new(&pool);
    timestamps
        .create(tpl.id, "1700000000.000100")
        .await
        .expect("record ts");

    ApplicationRepository::new(&pool)
        .delete(app.id)
        .await
        .expect("delete application");

    assert!(
        TemplateRepository::new(&pool)
            .get_by_name(app.id, &tpl.name)
            .await
            .expect("lookup")
            .is_none()
    );
    assert!(
        timestamps
            .list_for_template(tpl.id)
            .await
            .expect("list")
            .is_empty()
    );

    let err = ApplicationRepository::new(&pool)
        .delete(app.id)
        .await
        .expect_err("already deleted");
    assert!(matches!(err, RepositoryError::NotFound), "{err:?}");
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_subscription_lookups_ignore_unsubscribed_rows() {
    let pool = pool().await;
    let store = PgMessageStore::new(pool.clone());
    let app = application(&pool).await;

    let quiet = template(
        &pool,
        &app,
        Subscription::normalize(false, Some("https://ci.internal/thread")).expect("valid"),
    )
    .await;
    let quiet_block = unique("block");
    ActionsBlockRepository::new(&pool)
        .create(
            quiet.id,
            &quiet_block,
            &Subscription::normalize(false, Some("https://ci.internal/actions")).expect("valid"),
        )
        .await
        .expect("create block");
    let ts = format!("1700000000.{}", &Uuid::new_v4().simple().to_string()[..6]);
    store
        .record_message_timestamp(quiet.id, &ts)
        .await
        .expect("record ts");

    assert!(
        store
            .subscribed_actions_block(&quiet_block)
            .await
            .expect("lookup")
            .is_none()
    );
    assert!(
        store
            .thread_subscribed_template(&ts)
            .await
            .expect("lookup")
            .is_none()
    );
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_thread_lookup_resolves_owning_template() {
    let pool = pool().await;
    let store = PgMessageStore::new(pool.clone());
    let app = application(&pool).await;
    let tpl = template(&pool, &app, subscribed("https://ci.internal/thread")).await;
    let ts = format!("1700000000.{}", &Uuid::new_v4().simple().to_string()[..6]);

    store
        .record_message_timestamp(tpl.id, &ts)
        .await
        .expect("record ts");
    let target = store
        .thread_subscribed_template(&ts)
        .await
        .expect("lookup")
        .expect("subscribed template");

    assert_eq!(target.template_id, tpl.id);
    assert_eq!(target.application_id, app.id);
    assert_eq!(target.callback_url.as_str(), "https://ci.internal/thread");

    let detail = store
        .template_detail(app.id, &tpl.name)
        .await
        .expect("detail")
        .expect("template exists");
    assert!(detail.actions.is_none());

    store.ping().await.expect("ping");
}
