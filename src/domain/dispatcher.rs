//! Call lifecycle dispatcher
//!
//! The orchestrating state machine. Each inbound call moves through:
//! ringing -> awaiting responder (record in the store, deadline armed) ->
//! connected | voicemail. A responder accept and the deadline race for the
//! record; [`crate::domain::pending_call::CallStore::take`] decides the
//! winner, the timer's own cancellation is advisory only.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::AbortHandle;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::domain::gateway::{Notifier, Telephony};
use crate::domain::pending_call::{room_for, CallStore, PendingCall};
use crate::infrastructure::telephony::twiml;

/// Settings the dispatcher needs from the runtime configuration.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Public hostname used to build callback URLs.
    pub public_host: String,
    /// Optional SMS alert destination; `None` disables SMS alerts.
    pub alert_sms_to: Option<String>,
    /// How long a call waits for a responder before voicemail.
    pub response_deadline: Duration,
}

impl From<&Config> for DispatcherConfig {
    fn from(config: &Config) -> Self {
        Self {
            public_host: config.public_host.clone(),
            alert_sms_to: config.alert_sms_to.clone(),
            response_deadline: config.response_deadline,
        }
    }
}

/// Call lifecycle controller. Cheap to clone; all state is shared.
#[derive(Clone)]
pub struct CallDispatcher {
    store: Arc<CallStore>,
    telephony: Arc<dyn Telephony>,
    notifier: Arc<dyn Notifier>,
    config: Arc<DispatcherConfig>,
}

impl CallDispatcher {
    pub fn new(
        config: DispatcherConfig,
        telephony: Arc<dyn Telephony>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store: Arc::new(CallStore::new()),
            telephony,
            notifier,
            config: Arc::new(config),
        }
    }

    /// Register an inbound call: alert the team, arm the voicemail deadline,
    /// insert the pending record.
    ///
    /// The HTTP layer answers the call with the greeting/stream document in
    /// the same webhook exchange; nothing here blocks that. Alert failures
    /// are logged and the call proceeds unannounced.
    pub async fn handle_inbound_call(&self, call_sid: &str, caller: &str) {
        info!(call_sid, caller, "inbound call");

        if let Some(to) = &self.config.alert_sms_to {
            let body = format!("{caller} is calling the studio line");
            if let Err(e) = self.telephony.send_sms(to, &body).await {
                warn!(call_sid, error = %e, "alert SMS failed");
            }
        }

        let notification = match self.notifier.announce_call(call_sid, caller).await {
            Ok(msg) => Some(msg),
            Err(e) => {
                warn!(call_sid, error = %e, "chat announcement failed, call proceeds unannounced");
                None
            }
        };

        let deadline = self.arm_deadline(call_sid);
        let replaced = self.store.insert(PendingCall {
            call_sid: call_sid.to_string(),
            caller: caller.to_string(),
            room: room_for(call_sid),
            notification,
            deadline,
        });
        if let Some(stale) = replaced {
            // Carrier SIDs are unique, so this means a duplicate webhook.
            stale.deadline.abort();
            warn!(call_sid, "replaced stale pending record");
        }
    }

    /// A responder clicked "take the call". No-op when the call was already
    /// resolved (timed out, or a second click).
    pub async fn handle_responder_accept(&self, call_sid: &str, responder: &str) {
        let Some(pending) = self.store.take(call_sid) else {
            debug!(call_sid, responder, "accept for already-resolved call, ignoring");
            return;
        };
        pending.deadline.abort();
        info!(call_sid, responder, "responder accepted");

        if let Some(msg) = &pending.notification {
            if let Err(e) = self.notifier.mark_answered(msg, &pending.caller, responder).await {
                warn!(call_sid, error = %e, "notification update failed");
            }
        }

        let to = match self.notifier.contact_address(responder).await {
            Ok(number) => number,
            Err(e) => {
                // Documented gap: with the record gone the deadline cannot
                // fire either, so the caller stays on hold.
                error!(
                    call_sid,
                    responder,
                    error = %e,
                    "cannot reach responder, caller remains on hold"
                );
                return;
            }
        };

        let join_url = format!(
            "https://{}/join-conference?room={}",
            self.config.public_host, pending.room
        );
        match self.telephony.place_call(&to, &join_url).await {
            Ok(leg_sid) => info!(call_sid, responder_leg = %leg_sid, "responder leg placed"),
            Err(e) => {
                error!(call_sid, error = %e, "placing responder call failed, caller remains on hold");
                return;
            }
        }

        let document = twiml::conference(&pending.room);
        if let Err(e) = self.telephony.redirect_call_inline(call_sid, &document).await {
            error!(call_sid, error = %e, "redirecting caller into conference failed");
        }
    }

    /// Deadline expiry: send the caller to voicemail. No-op when a responder
    /// already took the record.
    pub async fn redirect_to_voicemail(&self, call_sid: &str) {
        let Some(pending) = self.store.take(call_sid) else {
            debug!(call_sid, "deadline fired for already-resolved call, ignoring");
            return;
        };
        // No deadline.abort() here: the armed task is (normally) the one
        // running this method, and the record's absence is already what
        // keeps any late resolution inert.
        info!(call_sid, "no responder before deadline, redirecting to voicemail");

        if let Some(msg) = &pending.notification {
            if let Err(e) = self.notifier.mark_missed(msg, &pending.caller).await {
                warn!(call_sid, error = %e, "notification update failed");
            }
        }

        let url = format!(
            "https://{}/voicemail?callSid={}",
            self.config.public_host, call_sid
        );
        if let Err(e) = self.telephony.redirect_call(call_sid, &url).await {
            error!(call_sid, error = %e, "voicemail redirect failed");
        }
    }

    /// A voicemail recording finished uploading. Independent of the pending
    /// record, which is long gone by the time the carrier calls back.
    pub async fn handle_recording_ready(&self, call_sid: &str, caller: &str, recording_url: &str) {
        info!(call_sid, "voicemail recording ready");
        if let Err(e) = self.notifier.post_recording(caller, recording_url).await {
            warn!(call_sid, error = %e, "recording notification failed");
        }
    }

    /// A voicemail transcription arrived. Empty or whitespace-only text is
    /// dropped silently.
    pub async fn handle_transcription_ready(&self, call_sid: &str, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            debug!(call_sid, "empty transcription, dropping");
            return;
        }
        if let Err(e) = self.notifier.post_transcript(text).await {
            warn!(call_sid, error = %e, "transcript notification failed");
        }
    }

    /// Whether a call is still awaiting resolution.
    pub fn is_pending(&self, call_sid: &str) -> bool {
        self.store.contains(call_sid)
    }

    /// Number of calls awaiting resolution.
    pub fn pending_count(&self) -> usize {
        self.store.len()
    }

    fn arm_deadline(&self, call_sid: &str) -> AbortHandle {
        let dispatcher = self.clone();
        let call_sid = call_sid.to_string();
        let wait = self.config.response_deadline;
        tokio::spawn(async move {
            tokio::time::sleep(wait).await;
            dispatcher.redirect_to_voicemail(&call_sid).await;
        })
        .abort_handle()
    }
}
