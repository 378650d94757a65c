//! Interface layer - the HTTP/WebSocket surface
//!
//! This layer handles:
//! - Carrier webhooks (inbound call, conference join, voicemail callbacks)
//! - The chat platform's interactive webhook
//! - The per-call media WebSocket

pub mod api;
