//! Error types for chat-relay.

use thiserror::Error;

/// Main error type for chat-relay operations.
///
/// Only transport and internal faults are errors. Rejected chat input is
/// answered with a notice and never surfaces here.
#[derive(Error, Debug)]
pub enum ChatRelayError {
    /// The outbound channel of a session is closed.
    #[error("channel closed")]
    ChannelClosed,

    /// Reading from the WebSocket failed.
    #[error("websocket error: {0}")]
    WebSocket(String),

    /// Internal lock was poisoned.
    #[error("internal lock poisoned")]
    LockPoisoned,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type for chat-relay operations.
pub type Result<T> = std::result::Result<T, ChatRelayError>;
