//! API router configuration

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use super::chat_handler::chat_interactive;
use super::media_ws::media_ws_handler;
use super::voice_handler::{
    health, inbound_voice, join_conference, voicemail_complete, voicemail_prompt,
    voicemail_recording,
};
use crate::config::Config;
use crate::domain::dispatcher::CallDispatcher;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: CallDispatcher,
    pub config: Arc<Config>,
}

/// Build the HTTP router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/voice", post(inbound_voice))
        .route("/join-conference", post(join_conference))
        .route("/voicemail", post(voicemail_prompt))
        .route("/voicemail-recording", post(voicemail_recording))
        .route("/voicemail-complete", post(voicemail_complete))
        .route("/chat/interactive", post(chat_interactive))
        .route("/media", get(media_ws_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
