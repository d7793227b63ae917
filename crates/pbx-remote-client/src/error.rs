//! Session and transport errors.

use pbx_remote_core::ListenerError;
use thiserror::Error;

/// Transport error.
///
/// Request failures never surface from [`crate::Session::invoke`]; they are
/// turned into a synthetic error event instead.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP client setup failed: {0}")]
    Build(String),
    #[error("Request failed: {0}")]
    Request(String),
}

/// Session error.
///
/// Covers precondition and validation failures. Protocol-level errors are
/// reported through return values and [`crate::Session::last_error`].
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No connection credentials have been configured")]
    MissingCredentials,
    #[error("Invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Listener(#[from] ListenerError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}
