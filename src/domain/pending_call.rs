//! Pending-call registry
//!
//! One record per inbound call that has been answered but not yet resolved.
//! Resolution (a responder accepting, or the voicemail deadline firing) goes
//! through [`CallStore::take`], an atomic check-and-remove: whichever side
//! takes the record first wins, the other observes absence and does nothing.

use std::collections::HashMap;
use std::sync::Mutex;
use tokio::task::AbortHandle;

/// Handle to a posted chat message, enough to update it in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRef {
    pub channel: String,
    pub ts: String,
}

/// An inbound call awaiting either a responder or the voicemail deadline.
#[derive(Debug)]
pub struct PendingCall {
    /// Carrier-assigned call SID, the unique key.
    pub call_sid: String,
    /// Caller's number, display only.
    pub caller: String,
    /// Conference room both legs will join if a responder accepts.
    pub room: String,
    /// Chat announcement handle; `None` when the post failed, in which
    /// case later updates are skipped.
    pub notification: Option<MessageRef>,
    /// Abort handle of the armed escalation task.
    pub deadline: AbortHandle,
}

/// Conference room name for a call.
///
/// Derived from the call SID so the accept path and the caller-redirect
/// path arrive at the same room without coordination.
pub fn room_for(call_sid: &str) -> String {
    format!("conf-{call_sid}")
}

/// In-memory registry of pending calls keyed by call SID.
///
/// The lock is held only across map operations, never across an await, so
/// lookup-and-remove is a single step and cannot race a concurrent
/// resolution.
#[derive(Debug, Default)]
pub struct CallStore {
    calls: Mutex<HashMap<String, PendingCall>>,
}

impl CallStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pending call. Returns the record it replaced if a stale
    /// one was still present under the same SID.
    pub fn insert(&self, call: PendingCall) -> Option<PendingCall> {
        let mut calls = self.calls.lock().unwrap();
        calls.insert(call.call_sid.clone(), call)
    }

    /// Atomically remove and return the record, if still pending.
    pub fn take(&self, call_sid: &str) -> Option<PendingCall> {
        let mut calls = self.calls.lock().unwrap();
        calls.remove(call_sid)
    }

    /// Whether a call is still unresolved.
    pub fn contains(&self, call_sid: &str) -> bool {
        self.calls.lock().unwrap().contains_key(call_sid)
    }

    /// Number of unresolved calls.
    pub fn len(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
