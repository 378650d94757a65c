//! Gateway traits - ports to the telephony carrier and the chat platform

use crate::domain::pending_call::MessageRef;
use crate::domain::shared::error::Result;

/// Outbound control surface of the telephony carrier.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Telephony: Send + Sync {
    /// Send a plain SMS.
    async fn send_sms(&self, to: &str, body: &str) -> Result<()>;

    /// Place an outbound call. The carrier fetches call instructions from
    /// `url` once the callee answers. Returns the new leg's call SID.
    async fn place_call(&self, to: &str, url: &str) -> Result<String>;

    /// Point an in-progress call at a new instruction URL.
    async fn redirect_call(&self, call_sid: &str, url: &str) -> Result<()>;

    /// Hand an in-progress call an inline instruction document.
    async fn redirect_call_inline(&self, call_sid: &str, document: &str) -> Result<()>;
}

/// Notification surface of the chat platform.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Post the actionable "incoming call" message. Returns the handle
    /// needed to update the message in place later.
    async fn announce_call(&self, call_sid: &str, caller: &str) -> Result<MessageRef>;

    /// Rewrite the announcement after a responder took the call.
    async fn mark_answered(&self, msg: &MessageRef, caller: &str, responder: &str) -> Result<()>;

    /// Rewrite the announcement after the deadline passed unanswered.
    async fn mark_missed(&self, msg: &MessageRef, caller: &str) -> Result<()>;

    /// Post a link to a finished voicemail recording.
    async fn post_recording(&self, caller: &str, recording_url: &str) -> Result<()>;

    /// Post a voicemail transcription.
    async fn post_transcript(&self, text: &str) -> Result<()>;

    /// Resolve a responder's phone number from their chat profile.
    async fn contact_address(&self, responder: &str) -> Result<String>;
}
