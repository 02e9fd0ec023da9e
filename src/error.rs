//! # Error Types
//!
//! Custom error types for SimMap Bridge using `thiserror`.

use thiserror::Error;

/// Main error type for SimMap Bridge
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Connect was attempted with a null window handle
    #[error("Invalid window handle")]
    InvalidHandle,

    /// Simulator not running, version mismatch or resource exhaustion
    #[error("Simulator transport unavailable: {0}")]
    TransportUnavailable(String),

    /// Malformed or unexpected simulator message
    #[error("Failed to decode simulator message: {0}")]
    DecodeFailure(String),

    /// Network send failure (never propagated past the forwarder)
    #[error("Failed to forward datagram: {0}")]
    Forward(#[source] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Connection failure classification carried by state notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    InvalidHandle,
    TransportUnavailable,
    DecodeFailure,
}

impl BridgeError {
    /// Classify this error for the connection state machine.
    ///
    /// Errors that never reach the state machine (forwarding, config, plain
    /// I/O at connect time) are reported as the transport being unavailable.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            BridgeError::InvalidHandle => FailureKind::InvalidHandle,
            BridgeError::DecodeFailure(_) => FailureKind::DecodeFailure,
            _ => FailureKind::TransportUnavailable,
        }
    }
}

/// Result type alias for SimMap Bridge
pub type Result<T> = std::result::Result<T, BridgeError>;
