//! Message payload builders.
//!
//! Turns a stored template plus optional caller text into the body of a
//! `chat.postMessage` or `chat.update` call. Pure functions: no I/O, and no
//! error paths (a missing actions block or caller text is a normal input).
//!
//! Every payload has the same shape:
//! - `text`: the template's fallback text
//! - a `mrkdwn` section with the template message, followed by the caller
//!   text after a blank line when one is supplied
//! - a divider
//! - an actions block with one button per stored button, only when the
//!   template has an actions block with at least one button

use crate::models::{ActionsBlockDetail, TemplateDetail};

use super::types::{ActionElement, Block, MessagePayload, Text};

/// Build the body of a `chat.postMessage` call.
#[must_use]
pub fn build_post_payload(detail: &TemplateDetail, text: Option<&str>) -> MessagePayload {
    let template = &detail.template;

    let mut blocks = vec![
        Block::Section {
            text: Text::mrkdwn(compose_message(&template.message_text, text)),
        },
        Block::Divider,
    ];

    if let Some(actions) = detail.actions.as_ref().and_then(actions_block) {
        blocks.push(actions);
    }

    MessagePayload {
        channel: template.channel_id.clone(),
        text: template.fallback_text.clone(),
        blocks,
        ts: None,
    }
}

/// Build the body of a `chat.update` call for the message at `ts`.
///
/// Identical to [`build_post_payload`] apart from the `ts` field.
#[must_use]
pub fn build_update_payload(
    detail: &TemplateDetail,
    text: Option<&str>,
    ts: &str,
) -> MessagePayload {
    MessagePayload {
        ts: Some(ts.to_string()),
        ..build_post_payload(detail, text)
    }
}

/// Template text, then caller text after a blank line.
///
/// An empty caller string is treated as no text at all.
fn compose_message(message_text: &str, text: Option<&str>) -> String {
    match text.filter(|t| !t.is_empty()) {
        Some(extra) => format!("{message_text}\n\n{extra}"),
        None => message_text.to_string(),
    }
}

/// Render an actions block; `None` when it has no buttons.
fn actions_block(detail: &ActionsBlockDetail) -> Option<Block> {
    if detail.buttons.is_empty() {
        return None;
    }

    let elements = detail
        .buttons
        .iter()
        .map(|button| ActionElement::Button {
            action_id: button.action_id.clone(),
            text: Text::plain(&button.text),
        })
        .collect();

    Some(Block::Actions {
        block_id: detail.block.block_id.clone(),
        elements,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use slack_relay_core::{ActionsBlockId, ApplicationId, ButtonId, TemplateId};

    use super::*;
    use crate::models::{ActionsBlock, Button, Template};

    fn template() -> Template {
        Template {
            id: TemplateId::new(1),
            application_id: ApplicationId::new(1),
            name: "deploy".to_string(),
            channel_id: "C0DEPLOY".to_string(),
            message_text: "*Deploy finished*".to_string(),
            fallback_text: "Deploy finished".to_string(),
            thread_subscription: false,
            callback_url: None,
            created_at: Utc::now(),
        }
    }

    fn with_buttons(labels: &[(&str, &str)]) -> TemplateDetail {
        let block = ActionsBlock {
            id: ActionsBlockId::new(3),
            template_id: TemplateId::new(1),
            block_id: "deploy_actions".to_string(),
            action_subscription: false,
            callback_url: None,
        };
        let buttons = labels
            .iter()
            .zip(1..)
            .map(|((action_id, text), id)| Button {
                id: ButtonId::new(id),
                actions_block_id: block.id,
                action_id: (*action_id).to_string(),
                text: (*text).to_string(),
            })
            .collect();

        TemplateDetail {
            template: template(),
            actions: Some(ActionsBlockDetail { block, buttons }),
        }
    }

    #[test]
    fn test_section_is_message_text_without_caller_text() {
        let payload = build_post_payload(&TemplateDetail::plain(template()), None);

        match payload.blocks.first() {
            Some(Block::Section { text }) => assert_eq!(text.as_str(), "*Deploy finished*"),
            other => panic!("Expected section block, got {other:?}"),
        }
    }

    #[test]
    fn test_caller_text_follows_blank_line() {
        let payload = build_post_payload(&TemplateDetail::plain(template()), Some("build #42"));

        match payload.blocks.first() {
            Some(Block::Section { text }) => {
                assert_eq!(text.as_str(), "*Deploy finished*\n\nbuild #42");
            }
            other => panic!("Expected section block, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_caller_text_is_ignored() {
        let payload = build_post_payload(&TemplateDetail::plain(template()), Some(""));

        match payload.blocks.first() {
            Some(Block::Section { text }) => assert_eq!(text.as_str(), "*Deploy finished*"),
            other => panic!("Expected section block, got {other:?}"),
        }
    }

    #[test]
    fn test_fallback_and_channel_come_from_template() {
        let payload = build_post_payload(&TemplateDetail::plain(template()), Some("x"));
        assert_eq!(payload.channel, "C0DEPLOY");
        assert_eq!(payload.text, "Deploy finished");
        assert_eq!(payload.ts, None);
    }

    #[test]
    fn test_plain_template_has_section_and_divider_only() {
        let payload = build_post_payload(&TemplateDetail::plain(template()), None);
        assert_eq!(payload.blocks.len(), 2);
        assert_eq!(payload.blocks.get(1), Some(&Block::Divider));
    }

    #[test]
    fn test_actions_block_without_buttons_is_omitted() {
        let payload = build_post_payload(&with_buttons(&[]), None);
        assert_eq!(payload.blocks.len(), 2);
        assert!(
            !payload
                .blocks
                .iter()
                .any(|b| matches!(b, Block::Actions { .. }))
        );
    }

    #[test]
    fn test_buttons_rendered_in_order() {
        let detail = with_buttons(&[("approve", "Approve"), ("reject", "Reject")]);
        let payload = build_post_payload(&detail, None);

        match payload.blocks.get(2) {
            Some(Block::Actions { block_id, elements }) => {
                assert_eq!(block_id, "deploy_actions");
                let ids: Vec<&str> = elements
                    .iter()
                    .map(|ActionElement::Button { action_id, .. }| action_id.as_str())
                    .collect();
                assert_eq!(ids, ["approve", "reject"]);
            }
            other => panic!("Expected actions block, got {other:?}"),
        }
    }

    #[test]
    fn test_update_payload_adds_ts_only() {
        let detail = with_buttons(&[("ack", "Acknowledge")]);
        let post = build_post_payload(&detail, Some("note"));
        let update = build_update_payload(&detail, Some("note"), "1700000000.000200");

        assert_eq!(update.ts.as_deref(), Some("1700000000.000200"));
        assert_eq!(
            MessagePayload {
                ts: None,
                ..update
            },
            post
        );
    }
}
