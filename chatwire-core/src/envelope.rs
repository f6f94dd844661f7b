//! The message envelope transmitted on publish
//!
//! An envelope is the self-describing JSON payload that wraps chat content
//! with sender metadata. It is what actually travels inside a publish
//! frame's `data` field:
//!
//! ```json
//! {"name":"alice","message":"hello","timestamp":"2026-08-30T12:00:00Z","userId":"user-ab12cd34"}
//! ```
//!
//! Foreign publishers are not required to send envelopes; a subscriber that
//! receives plain text falls back to the opaque-content parse in
//! [`crate::Message::parse`].

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Structured payload carrying sender identity alongside message content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Display name of the sender
    pub name: String,
    /// The message text
    pub message: String,
    /// ISO-8601 send timestamp, stamped by the sender
    pub timestamp: String,
    /// Stable sender id, absent for anonymous publishers
    #[serde(rename = "userId", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl Envelope {
    /// Build an envelope for outgoing content, stamped with the current time
    pub fn build(
        username: impl Into<String>,
        content: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            name: username.into(),
            message: content.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            user_id: Some(user_id.into()),
        }
    }

    /// Serialize the envelope to its wire representation
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Attempt a structured parse of a raw payload
    ///
    /// Returns `None` for anything that is not a well-formed envelope;
    /// callers fall back to treating the payload as opaque content.
    pub fn parse(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }
}
