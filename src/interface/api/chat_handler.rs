//! Chat platform interactive webhook
//!
//! Slack expects an acknowledgement within a few seconds, so the handler
//! returns 200 immediately and runs the accept flow on its own task.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Form;
use serde::Deserialize;
use tracing::debug;

use super::router::AppState;
use crate::infrastructure::notify::TAKE_CALL_ACTION;

#[derive(Debug, Deserialize)]
pub struct InteractiveForm {
    payload: String,
}

pub async fn chat_interactive(
    State(state): State<AppState>,
    Form(form): Form<InteractiveForm>,
) -> StatusCode {
    match parse_accept_action(&form.payload) {
        Some(action) => {
            let dispatcher = state.dispatcher.clone();
            tokio::spawn(async move {
                dispatcher
                    .handle_responder_accept(&action.call_sid, &action.responder)
                    .await;
            });
        }
        None => debug!("ignoring interactive payload without a take-call action"),
    }
    StatusCode::OK
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct AcceptAction {
    pub call_sid: String,
    pub responder: String,
}

/// Pull the accept action out of an interactive payload. Anything else
/// (malformed JSON, other action ids, missing fields) is `None`.
pub(crate) fn parse_accept_action(raw: &str) -> Option<AcceptAction> {
    let payload: serde_json::Value = serde_json::from_str(raw).ok()?;
    let action = payload["actions"]
        .as_array()?
        .iter()
        .find(|a| a["action_id"] == TAKE_CALL_ACTION)?;
    Some(AcceptAction {
        call_sid: action["value"].as_str()?.to_string(),
        responder: payload["user"]["id"].as_str()?.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(action_id: &str, value: &str, user: &str) -> String {
        serde_json::json!({
            "type": "block_actions",
            "user": { "id": user, "name": "jake" },
            "actions": [{ "action_id": action_id, "value": value }]
        })
        .to_string()
    }

    #[test]
    fn accept_action_is_extracted() {
        let parsed = parse_accept_action(&payload(TAKE_CALL_ACTION, "CA123", "U042"));
        assert_eq!(
            parsed,
            Some(AcceptAction {
                call_sid: "CA123".to_string(),
                responder: "U042".to_string(),
            })
        );
    }

    #[test]
    fn other_actions_are_ignored() {
        assert!(parse_accept_action(&payload("snooze", "CA123", "U042")).is_none());
    }

    #[test]
    fn malformed_payloads_are_ignored() {
        assert!(parse_accept_action("not json at all").is_none());
        assert!(parse_accept_action("{}").is_none());
        assert!(parse_accept_action(r#"{"actions": "not-a-list"}"#).is_none());
    }
}
