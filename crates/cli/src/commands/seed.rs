//! Seed the relay database from a YAML file.
//!
//! The file is parsed and validated in full before connecting, and all rows
//! are written in a single transaction, so neither a bad file nor a conflict
//! with existing rows leaves a half-seeded database behind. Subscriptions go
//! through the same write-time rules as every other write: a missing callback
//! URL turns the subscription off, a malformed one is an error.
//!
//! ```yaml
//! applications:
//!   - name: deploys
//!     signing_secret: 8f742231b10e8888abcd99yyyzzz85a5
//!     bot_token: xoxb-...
//!     templates:
//!       - name: finished
//!         channel_id: C0DEPLOY
//!         message_text: "*Deploy finished*"
//!         fallback_text: Deploy finished
//!         thread_subscription: true
//!         callback_url: https://ci.internal/slack/thread
//!         actions:
//!           block_id: deploy_finished_actions
//!           action_subscription: true
//!           callback_url: https://ci.internal/slack/actions
//!           buttons:
//!             - { action_id: rollback, text: Roll back }
//! ```

use std::collections::HashSet;
use std::path::Path;

use secrecy::SecretString;
use serde::Deserialize;
use tracing::{error, info};

use slack_relay_core::Subscription;
use slack_relay_server::db::{
    self, ActionsBlockRepository, ApplicationRepository, ButtonRepository, NewTemplate,
    TemplateRepository,
};

const MAX_FALLBACK_TEXT_LENGTH: usize = 255;
const MAX_BUTTON_TEXT_LENGTH: usize = 75;

/// Top level of a seed file.
#[derive(Debug, Deserialize)]
pub struct SeedFile {
    pub applications: Vec<SeedApplication>,
}

#[derive(Debug, Deserialize)]
pub struct SeedApplication {
    pub name: String,
    pub signing_secret: String,
    pub bot_token: String,
    #[serde(default)]
    pub templates: Vec<SeedTemplate>,
}

#[derive(Debug, Deserialize)]
pub struct SeedTemplate {
    pub name: String,
    pub channel_id: String,
    pub message_text: String,
    pub fallback_text: String,
    #[serde(default)]
    pub thread_subscription: bool,
    #[serde(default)]
    pub callback_url: Option<String>,
    #[serde(default)]
    pub actions: Option<SeedActions>,
}

#[derive(Debug, Deserialize)]
pub struct SeedActions {
    pub block_id: String,
    #[serde(default)]
    pub action_subscription: bool,
    #[serde(default)]
    pub callback_url: Option<String>,
    #[serde(default)]
    pub buttons: Vec<SeedButton>,
}

#[derive(Debug, Deserialize)]
pub struct SeedButton {
    pub action_id: String,
    pub text: String,
}

/// Load a seed file and, unless `check_only`, write it to the database.
///
/// # Errors
///
/// Returns an error if the file cannot be read or fails validation, or if a
/// database write fails (including uniqueness conflicts with existing rows).
pub async fn run(file_path: &str, check_only: bool) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading seed file");
    let content = tokio::fs::read_to_string(path).await?;
    let seed: SeedFile = serde_yaml::from_str(&content)?;

    let errors = validate(&seed);
    if !errors.is_empty() {
        error!("Seed file validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    info!(applications = seed.applications.len(), "Seed file validated");
    if check_only {
        return Ok(());
    }

    let database_url = super::migrate::database_url()?;
    let pool = db::create_pool(&database_url).await?;
    info!("Connected to database");

    let summary = apply(&pool, &seed).await?;

    info!("Seeding complete!");
    info!("  Applications: {}", summary.applications);
    info!("  Templates: {}", summary.templates);
    info!("  Actions blocks: {}", summary.actions_blocks);
    info!("  Buttons: {}", summary.buttons);

    Ok(())
}

/// Counts of created rows.
#[derive(Debug, Default)]
struct SeedSummary {
    applications: usize,
    templates: usize,
    actions_blocks: usize,
    buttons: usize,
}

/// Write every row of `seed` in one transaction.
///
/// Any failure, such as a name already taken by an existing row, rolls
/// back everything written so far.
async fn apply(
    pool: &sqlx::PgPool,
    seed: &SeedFile,
) -> Result<SeedSummary, Box<dyn std::error::Error>> {
    let mut summary = SeedSummary::default();
    let mut tx = pool.begin().await?;

    for app in &seed.applications {
        let application = ApplicationRepository::create_in(
            &mut tx,
            &app.name,
            &SecretString::from(app.signing_secret.clone()),
            &SecretString::from(app.bot_token.clone()),
        )
        .await?;
        summary.applications += 1;
        info!(app = %application.name, id = %application.id, "Created application");

        for tpl in &app.templates {
            let template = TemplateRepository::create_in(
                &mut tx,
                &NewTemplate {
                    application_id: application.id,
                    name: tpl.name.clone(),
                    channel_id: tpl.channel_id.clone(),
                    message_text: tpl.message_text.clone(),
                    fallback_text: tpl.fallback_text.clone(),
                    subscription: Subscription::normalize(
                        tpl.thread_subscription,
                        tpl.callback_url.as_deref(),
                    )?,
                },
            )
            .await?;
            summary.templates += 1;

            let Some(actions) = &tpl.actions else {
                continue;
            };

            let subscription =
                Subscription::normalize(actions.action_subscription, actions.callback_url.as_deref())?;
            let block =
                ActionsBlockRepository::create_in(&mut tx, template.id, &actions.block_id, &subscription)
                    .await?;
            summary.actions_blocks += 1;

            for button in &actions.buttons {
                ButtonRepository::create_in(&mut tx, block.id, &button.action_id, &button.text)
                    .await?;
                summary.buttons += 1;
            }
        }
    }

    tx.commit().await?;
    Ok(summary)
}

/// Check a seed file against the store's constraints.
///
/// Returns every problem found rather than stopping at the first.
fn validate(seed: &SeedFile) -> Vec<String> {
    let mut errors = Vec::new();
    let mut app_names = HashSet::new();
    let mut block_ids = HashSet::new();

    for app in &seed.applications {
        if app.name.trim().is_empty() {
            errors.push("application with blank name".to_string());
        }
        if !app_names.insert(app.name.as_str()) {
            errors.push(format!("duplicate application '{}'", app.name));
        }

        let mut template_names = HashSet::new();
        for tpl in &app.templates {
            let at = format!("{}/{}", app.name, tpl.name);

            if !template_names.insert(tpl.name.as_str()) {
                errors.push(format!("{at}: duplicate template name"));
            }
            if tpl.fallback_text.chars().count() > MAX_FALLBACK_TEXT_LENGTH {
                errors.push(format!(
                    "{at}: fallback_text longer than {MAX_FALLBACK_TEXT_LENGTH} characters"
                ));
            }
            if let Err(e) =
                Subscription::normalize(tpl.thread_subscription, tpl.callback_url.as_deref())
            {
                errors.push(format!("{at}: {e}"));
            }

            let Some(actions) = &tpl.actions else {
                continue;
            };

            if !block_ids.insert(actions.block_id.as_str()) {
                errors.push(format!("{at}: block_id '{}' already used", actions.block_id));
            }
            if let Err(e) =
                Subscription::normalize(actions.action_subscription, actions.callback_url.as_deref())
            {
                errors.push(format!("{at} actions: {e}"));
            }

            let mut action_ids = HashSet::new();
            let mut labels = HashSet::new();
            for button in &actions.buttons {
                if !action_ids.insert(button.action_id.as_str()) {
                    errors.push(format!("{at}: duplicate button action_id '{}'", button.action_id));
                }
                if !labels.insert(button.text.as_str()) {
                    errors.push(format!("{at}: duplicate button text '{}'", button.text));
                }
                if button.text.chars().count() > MAX_BUTTON_TEXT_LENGTH {
                    errors.push(format!(
                        "{at}: button text longer than {MAX_BUTTON_TEXT_LENGTH} characters"
                    ));
                }
            }
        }
    }

    errors
}
