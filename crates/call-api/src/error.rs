//! Client error taxonomy.
//!
//! Validation refusals are not errors: they are reported as
//! [`ValidationOutcome`](crate::validator::ValidationOutcome) values and never
//! escalate. Everything here is fatal for the current call attempt.

use std::time::Duration;
use thiserror::Error;

/// Transport-level failures
#[derive(Debug, Error)]
pub enum TransportError {
    /// The peer or the local side already closed the channel
    #[error("Transport closed")]
    Closed,

    /// WebSocket protocol or IO failure
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Errors surfaced to the caller of the lift-call client
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connect, write or read failure on the gateway channel
    #[error("Transport failure: {0}")]
    Transport(#[from] TransportError),

    /// Credentials rejected locally or by the token endpoint
    #[error("Credential failure: {0}")]
    Credential(String),

    /// Token endpoint could not be reached
    #[error("Token request failed: {0}")]
    TokenRequest(#[from] reqwest::Error),

    /// Outbound payload could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Candidate payload does not describe a call
    #[error("Invalid call payload: {0}")]
    Schema(String),

    /// No session id arrived within the configured bound
    #[error("No session id received within {0:?}")]
    SessionIdTimeout(Duration),

    /// Configuration problem detected at startup
    #[error("Configuration error: {0}")]
    Config(#[from] liftcall_core::ConfigError),
}
