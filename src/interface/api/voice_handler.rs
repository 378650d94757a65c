//! Carrier webhook handlers
//!
//! Every endpoint here is called by the carrier, not by humans. Responses
//! on the call-control paths are XML documents; callback acknowledgements
//! are plain 200s regardless of what the notification layer did with the
//! event, since the carrier retries non-2xx responses.

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Form;
use serde::Deserialize;

use super::router::AppState;
use crate::infrastructure::telephony::twiml;

pub async fn health() -> &'static str {
    "switchboard relay is up"
}

#[derive(Debug, Deserialize)]
pub struct VoiceForm {
    #[serde(rename = "CallSid")]
    call_sid: String,
    #[serde(rename = "From")]
    from: Option<String>,
}

/// Inbound call: register it with the dispatcher, then answer with the
/// greeting and the hold-audio media socket.
pub async fn inbound_voice(
    State(state): State<AppState>,
    Form(form): Form<VoiceForm>,
) -> impl IntoResponse {
    let caller = form.from.as_deref().unwrap_or("unknown caller");
    state
        .dispatcher
        .handle_inbound_call(&form.call_sid, caller)
        .await;

    let ws_url = format!("wss://{}/media", state.config.public_host);
    xml(twiml::answer(state.config.greeting_url.as_deref(), &ws_url))
}

#[derive(Debug, Deserialize)]
pub struct JoinQuery {
    room: String,
}

/// The responder's outbound leg answered: drop it into the conference.
pub async fn join_conference(Query(query): Query<JoinQuery>) -> impl IntoResponse {
    xml(twiml::conference(&query.room))
}

#[derive(Debug, Deserialize)]
pub struct CallSidQuery {
    #[serde(rename = "callSid")]
    call_sid: String,
}

/// The unanswered caller leg arrives here after the deadline redirect.
pub async fn voicemail_prompt(
    State(state): State<AppState>,
    Query(query): Query<CallSidQuery>,
) -> impl IntoResponse {
    let base = format!("https://{}", state.config.public_host);
    xml(twiml::voicemail(
        &format!("{base}/voicemail-recording?callSid={}", query.call_sid),
        &format!("{base}/voicemail-complete?callSid={}", query.call_sid),
    ))
}

#[derive(Debug, Deserialize)]
pub struct RecordingForm {
    #[serde(rename = "RecordingUrl")]
    recording_url: Option<String>,
    #[serde(rename = "From")]
    from: Option<String>,
}

pub async fn voicemail_recording(
    State(state): State<AppState>,
    Query(query): Query<CallSidQuery>,
    Form(form): Form<RecordingForm>,
) -> StatusCode {
    if let Some(url) = form.recording_url {
        let caller = form.from.as_deref().unwrap_or("unknown caller");
        state
            .dispatcher
            .handle_recording_ready(&query.call_sid, caller, &url)
            .await;
    }
    StatusCode::OK
}

#[derive(Debug, Deserialize)]
pub struct TranscriptionForm {
    #[serde(rename = "TranscriptionText")]
    transcription_text: Option<String>,
}

pub async fn voicemail_complete(
    State(state): State<AppState>,
    Query(query): Query<CallSidQuery>,
    Form(form): Form<TranscriptionForm>,
) -> StatusCode {
    state
        .dispatcher
        .handle_transcription_ready(
            &query.call_sid,
            form.transcription_text.as_deref().unwrap_or(""),
        )
        .await;
    StatusCode::OK
}

fn xml(document: String) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/xml")], document)
}
