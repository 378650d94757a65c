//! switchboard - a call-routing relay for a small team
//!
//! Answers inbound phone calls, alerts the team in chat with an actionable
//! message, connects the first responder who accepts into a conference with
//! the caller, falls back to voicemail after a deadline, and pipes a live
//! broadcast stream into waiting calls as hold audio.

pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interface;

// Re-export commonly used types
pub use domain::shared::error::{GatewayError, Result};
