//! Domain layer - call lifecycle logic
//!
//! This layer contains:
//! - The pending-call registry (the single source of truth for resolution)
//! - The call dispatcher (inbound / accept / voicemail escalation)
//! - Gateway traits: ports to the telephony carrier and the chat platform

pub mod dispatcher;
pub mod gateway;
pub mod pending_call;
pub mod shared;
