//! Slack notification integration
//!
//! One channel gets an actionable message per inbound call; the button's
//! value carries the call SID back through the interactive webhook.

use serde_json::{json, Value};

use crate::config::SlackConfig;
use crate::domain::gateway::Notifier;
use crate::domain::pending_call::MessageRef;
use crate::domain::shared::error::{GatewayError, Result};

const API_BASE: &str = "https://slack.com/api";

/// Action id of the "take the call" button, matched by the interactive
/// webhook handler.
pub const TAKE_CALL_ACTION: &str = "take_call";

pub struct SlackNotifier {
    http: reqwest::Client,
    token: String,
    channel: String,
    api_base: String,
}

impl SlackNotifier {
    pub fn new(config: &SlackConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            token: config.bot_token.clone(),
            channel: config.channel_id.clone(),
            api_base: API_BASE.to_string(),
        }
    }

    async fn call(&self, method: &str, payload: Value) -> Result<Value> {
        let response = self
            .http
            .post(format!("{}/{method}", self.api_base))
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        // Slack reports failures in-band with `ok: false`.
        if !body["ok"].as_bool().unwrap_or(false) {
            let detail = body["error"].as_str().unwrap_or("unknown").to_string();
            return Err(GatewayError::Api("slack", detail));
        }
        Ok(body)
    }

    async fn post_text(&self, text: &str) -> Result<()> {
        self.call(
            "chat.postMessage",
            json!({ "channel": self.channel, "text": text }),
        )
        .await?;
        Ok(())
    }
}

/// Blocks for the initial announcement: the caller plus the single accept
/// control, whose value round-trips the call SID.
fn announce_blocks(call_sid: &str, caller: &str) -> Value {
    json!([
        {
            "type": "section",
            "text": {
                "type": "mrkdwn",
                "text": format!(":telephone_receiver: *{caller}* is calling the studio line")
            }
        },
        {
            "type": "actions",
            "elements": [{
                "type": "button",
                "style": "primary",
                "text": { "type": "plain_text", "text": "Take the call" },
                "action_id": TAKE_CALL_ACTION,
                "value": call_sid
            }]
        }
    ])
}

/// Normalize a free-text profile phone field into something dialable.
fn normalize_phone(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect()
}

#[async_trait::async_trait]
impl Notifier for SlackNotifier {
    async fn announce_call(&self, call_sid: &str, caller: &str) -> Result<MessageRef> {
        let body = self
            .call(
                "chat.postMessage",
                json!({
                    "channel": self.channel,
                    "text": format!("{caller} is calling the studio line"),
                    "blocks": announce_blocks(call_sid, caller),
                }),
            )
            .await?;
        Ok(MessageRef {
            channel: body["channel"].as_str().unwrap_or(&self.channel).to_string(),
            ts: body["ts"].as_str().unwrap_or_default().to_string(),
        })
    }

    async fn mark_answered(&self, msg: &MessageRef, caller: &str, responder: &str) -> Result<()> {
        let text = format!(":white_check_mark: *{caller}*: answered by <@{responder}>");
        self.call(
            "chat.update",
            json!({
                "channel": msg.channel,
                "ts": msg.ts,
                "text": text,
                "blocks": [{
                    "type": "section",
                    "text": { "type": "mrkdwn", "text": text }
                }],
            }),
        )
        .await?;
        Ok(())
    }

    async fn mark_missed(&self, msg: &MessageRef, caller: &str) -> Result<()> {
        let text = format!(":no_bell: *{caller}*: no answer, sent to voicemail");
        self.call(
            "chat.update",
            json!({
                "channel": msg.channel,
                "ts": msg.ts,
                "text": text,
                "blocks": [{
                    "type": "section",
                    "text": { "type": "mrkdwn", "text": text }
                }],
            }),
        )
        .await?;
        Ok(())
    }

    async fn post_recording(&self, caller: &str, recording_url: &str) -> Result<()> {
        self.post_text(&format!(
            ":studio_microphone: Voicemail from *{caller}*: <{recording_url}|listen>"
        ))
        .await
    }

    async fn post_transcript(&self, text: &str) -> Result<()> {
        self.post_text(&format!("Transcript: _{text}_")).await
    }

    async fn contact_address(&self, responder: &str) -> Result<String> {
        let response = self
            .http
            .get(format!("{}/users.profile.get", self.api_base))
            .bearer_auth(&self.token)
            .query(&[("user", responder)])
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        if !body["ok"].as_bool().unwrap_or(false) {
            let detail = body["error"].as_str().unwrap_or("unknown").to_string();
            return Err(GatewayError::Api("slack", detail));
        }

        let phone = normalize_phone(body["profile"]["phone"].as_str().unwrap_or(""));
        if phone.is_empty() {
            return Err(GatewayError::NoContact(responder.to_string()));
        }
        Ok(phone)
    }
}
