//! Errors shared across the integration seams

use thiserror::Error;

/// Result type for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Failure of an outbound platform integration.
///
/// These are never fatal to a call, let alone the process: handlers log
/// them and continue in a degraded state.
#[derive(Error, Debug, Clone)]
pub enum GatewayError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("{0} API error: {1}")]
    Api(&'static str, String),

    #[error("no contact address on file for {0}")]
    NoContact(String),
}
