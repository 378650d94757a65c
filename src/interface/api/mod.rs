//! HTTP interface implementations

pub mod chat_handler;
pub mod media_ws;
pub mod router;
pub mod voice_handler;

pub use router::{build_router, AppState};
