//! HTTP interface integration tests
//!
//! Drives the real router with fake platform gateways, so the webhook
//! contract can be exercised without a carrier or chat workspace.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use tower::ServiceExt; // for `oneshot`

use switchboard::config::{Config, SlackConfig, TwilioConfig};
use switchboard::domain::dispatcher::{CallDispatcher, DispatcherConfig};
use switchboard::domain::gateway::{Notifier, Telephony};
use switchboard::domain::pending_call::MessageRef;
use switchboard::interface::api::{build_router, AppState};
use switchboard::Result;

#[derive(Default)]
struct FakeTelephony {
    sms_sent: AtomicUsize,
    calls_placed: Mutex<Vec<(String, String)>>,
    redirects: Mutex<Vec<(String, String)>>,
    inline_redirects: Mutex<Vec<(String, String)>>,
}

#[async_trait::async_trait]
impl Telephony for FakeTelephony {
    async fn send_sms(&self, _to: &str, _body: &str) -> Result<()> {
        self.sms_sent.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn place_call(&self, to: &str, url: &str) -> Result<String> {
        self.calls_placed
            .lock()
            .unwrap()
            .push((to.to_string(), url.to_string()));
        Ok("CA-responder-leg".to_string())
    }

    async fn redirect_call(&self, call_sid: &str, url: &str) -> Result<()> {
        self.redirects
            .lock()
            .unwrap()
            .push((call_sid.to_string(), url.to_string()));
        Ok(())
    }

    async fn redirect_call_inline(&self, call_sid: &str, document: &str) -> Result<()> {
        self.inline_redirects
            .lock()
            .unwrap()
            .push((call_sid.to_string(), document.to_string()));
        Ok(())
    }
}

#[derive(Default)]
struct FakeNotifier {
    announcements: AtomicUsize,
    recordings: Mutex<Vec<String>>,
    transcripts: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl Notifier for FakeNotifier {
    async fn announce_call(&self, _call_sid: &str, _caller: &str) -> Result<MessageRef> {
        self.announcements.fetch_add(1, Ordering::SeqCst);
        Ok(MessageRef {
            channel: "C042".to_string(),
            ts: "1712.0001".to_string(),
        })
    }

    async fn mark_answered(&self, _msg: &MessageRef, _caller: &str, _responder: &str) -> Result<()> {
        Ok(())
    }

    async fn mark_missed(&self, _msg: &MessageRef, _caller: &str) -> Result<()> {
        Ok(())
    }

    async fn post_recording(&self, _caller: &str, recording_url: &str) -> Result<()> {
        self.recordings.lock().unwrap().push(recording_url.to_string());
        Ok(())
    }

    async fn post_transcript(&self, text: &str) -> Result<()> {
        self.transcripts.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn contact_address(&self, _responder: &str) -> Result<String> {
        Ok("+15557654321".to_string())
    }
}

fn test_config() -> Config {
    Config {
        stream_url: "https://stream.example.org/live".to_string(),
        twilio: TwilioConfig {
            account_sid: "AC123".to_string(),
            auth_token: "secret".to_string(),
            number: "+15550009999".to_string(),
        },
        slack: SlackConfig {
            bot_token: "xoxb-test".to_string(),
            channel_id: "C042".to_string(),
        },
        public_host: "relay.example.org".to_string(),
        alert_sms_to: None,
        greeting_url: Some("https://cdn.example.org/answer.mp3".to_string()),
        port: 0,
        response_deadline: Duration::from_secs(180),
    }
}

fn setup() -> (Router, Arc<FakeTelephony>, Arc<FakeNotifier>, CallDispatcher) {
    let telephony = Arc::new(FakeTelephony::default());
    let notifier = Arc::new(FakeNotifier::default());
    let config = Arc::new(test_config());
    let dispatcher = CallDispatcher::new(
        DispatcherConfig::from(config.as_ref()),
        telephony.clone(),
        notifier.clone(),
    );
    let app = build_router(AppState {
        dispatcher: dispatcher.clone(),
        config,
    });
    (app, telephony, notifier, dispatcher)
}

fn form_request(uri: &str, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

/// Percent-encode a form value.
fn urlencode(value: &str) -> String {
    let mut encoded = String::new();
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }
    encoded
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn health_check_responds() {
    let (app, _, _, _) = setup();
    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("up"));
}

#[tokio::test]
async fn inbound_call_is_answered_and_registered() {
    let (app, _, notifier, dispatcher) = setup();

    let body = format!("CallSid=CA100&From={}", urlencode("+15550001111"));
    let response = app.oneshot(form_request("/voice", body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE].to_str().unwrap(),
        "text/xml"
    );
    let xml = body_text(response).await;
    assert!(xml.contains("<Play>https://cdn.example.org/answer.mp3</Play>"));
    assert!(xml.contains("wss://relay.example.org/media"));

    assert!(dispatcher.is_pending("CA100"));
    assert_eq!(notifier.announcements.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn join_conference_names_the_requested_room() {
    let (app, _, _, _) = setup();
    let response = app
        .oneshot(form_request(
            "/join-conference?room=conf-CA100",
            String::new(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let xml = body_text(response).await;
    assert!(xml.contains(">conf-CA100</Conference>"));
}

#[tokio::test]
async fn voicemail_prompt_carries_the_call_sid_in_callbacks() {
    let (app, _, _, _) = setup();
    let response = app
        .oneshot(form_request("/voicemail?callSid=CA9", String::new()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let xml = body_text(response).await;
    assert!(xml.contains("<Record "));
    assert!(xml.contains("/voicemail-recording?callSid=CA9"));
    assert!(xml.contains("/voicemail-complete?callSid=CA9"));
}

#[tokio::test]
async fn recording_callback_posts_a_notification() {
    let (app, _, notifier, _) = setup();

    let body = format!(
        "RecordingUrl={}&From={}",
        urlencode("https://api.twilio.com/recordings/RE1"),
        urlencode("+15550001111"),
    );
    let response = app
        .clone()
        .oneshot(form_request("/voicemail-recording?callSid=CA9", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(notifier.recordings.lock().unwrap().len(), 1);

    // A callback without a recording URL still acks, posts nothing.
    let response = app
        .oneshot(form_request(
            "/voicemail-recording?callSid=CA9",
            String::new(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(notifier.recordings.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn empty_transcriptions_are_dropped() {
    let (app, _, notifier, _) = setup();

    let response = app
        .clone()
        .oneshot(form_request(
            "/voicemail-complete?callSid=CA9",
            "TranscriptionText=".to_string(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(notifier.transcripts.lock().unwrap().is_empty());

    let body = format!("TranscriptionText={}", urlencode("call me back"));
    let response = app
        .oneshot(form_request("/voicemail-complete?callSid=CA9", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        notifier.transcripts.lock().unwrap().as_slice(),
        ["call me back"]
    );
}

#[tokio::test]
async fn malformed_interactive_payload_is_acked_and_ignored() {
    let (app, telephony, _, _) = setup();
    let body = format!("payload={}", urlencode("{ not json"));
    let response = app
        .oneshot(form_request("/chat/interactive", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(telephony.calls_placed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn accept_click_bridges_both_legs_into_one_room() {
    let (app, telephony, _, dispatcher) = setup();

    let body = format!("CallSid=CA200&From={}", urlencode("+15550001111"));
    app.clone()
        .oneshot(form_request("/voice", body))
        .await
        .unwrap();
    assert!(dispatcher.is_pending("CA200"));

    let payload = serde_json::json!({
        "type": "block_actions",
        "user": { "id": "U042" },
        "actions": [{ "action_id": "take_call", "value": "CA200" }]
    })
    .to_string();
    let response = app
        .oneshot(form_request(
            "/chat/interactive",
            format!("payload={}", urlencode(&payload)),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The accept runs on its own task after the immediate ack.
    let mut waited = Duration::ZERO;
    while dispatcher.is_pending("CA200") && waited < Duration::from_secs(2) {
        tokio::time::sleep(Duration::from_millis(10)).await;
        waited += Duration::from_millis(10);
    }
    assert!(!dispatcher.is_pending("CA200"));

    let placed = telephony.calls_placed.lock().unwrap();
    assert_eq!(placed.len(), 1);
    assert_eq!(placed[0].0, "+15557654321");
    assert!(placed[0].1.contains("/join-conference?room=conf-CA200"));

    let redirected = telephony.inline_redirects.lock().unwrap();
    assert_eq!(redirected.len(), 1);
    assert_eq!(redirected[0].0, "CA200");
    assert!(redirected[0].1.contains("conf-CA200"));
}
