//! Error types for chatwire
//!
//! A single `Error` enum covers both crates. Transport-level failures carry
//! the underlying error message as a string, the same way the WebSocket
//! layer reports them, so the enum stays `Clone` and can be fanned out to
//! multiple pending operations.
//!
//! Note that inbound protocol problems (a payload that fails to parse as an
//! envelope) are deliberately *not* represented here: malformed payloads are
//! recovered locally by the fallback parse in [`crate::Message`] and never
//! surface as errors.

use thiserror::Error;

/// Result type used throughout the chatwire crates
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the chatwire client and codec
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// WebSocket transport layer error
    ///
    /// Covers connection setup failures, protocol violations, or frame
    /// processing errors below the chat protocol.
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Serialization or deserialization error for outbound frames
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Payload bytes were not valid UTF-8 text
    #[error("Invalid UTF-8 payload: {0}")]
    InvalidUtf8(String),

    /// Client configuration rejected at construction time
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The connection is not open
    ///
    /// Returned when an operation needs a live transport and the client is
    /// disconnected. Callers that want fail-closed boolean semantics map
    /// this to `false`.
    #[error("Connection closed")]
    ConnectionClosed,
}
