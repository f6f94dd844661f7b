//! Connection status
//!
//! Exactly one status holds at any time and all gating logic keys off it:
//! `publish` and `subscribe` refuse to act unless the client is
//! `Connected`. A reconnect cycle re-enters `Connecting` rather than
//! introducing a separate state.

use std::fmt;

/// Lifecycle state of the broker connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// No transport open
    Disconnected,
    /// Dial or reconnect attempt in flight
    Connecting,
    /// Transport open and usable
    Connected,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
        };
        write!(f, "{}", label)
    }
}
