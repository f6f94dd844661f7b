//! The decoded chat message model
//!
//! A [`Message`] is what subscribers receive through `on_message` handlers.
//! It is constructed client-side at decode time: the `id` is only locally
//! distinguishing (not globally unique) and the `timestamp` is the receipt
//! time at this client, not an authoritative send time. Once constructed a
//! message is never mutated.

use crate::envelope::Envelope;
use rand::distributions::Alphanumeric;
use rand::Rng;

/// Sender name used when a payload carries no parseable identity
pub const UNKNOWN_SENDER: &str = "Unknown";

/// A chat message as delivered to registered handlers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Locally distinguishing id, generated at decode time
    pub id: String,
    /// Sender id, `"unknown-user"` when the payload carried none
    pub user_id: String,
    /// Sender display name, [`UNKNOWN_SENDER`] when not identifiable
    pub username: String,
    /// The message text
    pub content: String,
    /// Topic the message arrived on
    pub topic: String,
    /// Receipt time at this client, in milliseconds since the epoch
    pub timestamp: i64,
}

impl Message {
    /// Decode a raw payload received on `topic` into a message
    ///
    /// Tries the structured [`Envelope`] parse first; any payload that is
    /// not a well-formed envelope (invalid JSON, wrong shape, empty string)
    /// is treated as opaque content from an unknown sender. This function
    /// never fails: every input yields a well-formed message.
    pub fn parse(raw: &str, topic: impl Into<String>) -> Self {
        let (username, content, user_id) = match Envelope::parse(raw) {
            Some(envelope) => {
                let name = if envelope.name.is_empty() {
                    UNKNOWN_SENDER.to_string()
                } else {
                    envelope.name
                };
                (name, envelope.message, envelope.user_id)
            }
            None => (UNKNOWN_SENDER.to_string(), raw.to_string(), None),
        };

        Self {
            id: message_id(),
            user_id: user_id.unwrap_or_else(|| "unknown-user".to_string()),
            username,
            content,
            topic: topic.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Generate a locally distinguishing message id: `msg-<millis>-<suffix>`
pub fn message_id() -> String {
    format!(
        "msg-{}-{}",
        chrono::Utc::now().timestamp_millis(),
        random_suffix(7)
    )
}

/// Generate a process-lifetime user id: `user-<suffix>`
pub fn generate_user_id() -> String {
    format!("user-{}", random_suffix(8))
}

/// Generate a default display name: `User-<suffix>`
pub fn generate_username() -> String {
    format!("User-{}", random_suffix(3))
}

fn random_suffix(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect::<String>()
        .to_lowercase()
}
