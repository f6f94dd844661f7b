//! Wire frames and inbound frame classification
//!
//! The chat protocol exchanges JSON frames tagged by a `type` field over a
//! WebSocket text transport. This module defines the frame shapes and the
//! classifier that separates protocol control traffic from payload frames
//! before anything reaches the application layer.
//!
//! # Frame shapes
//!
//! - `{"type":"publish","topic":T,"data":D}` — outbound publish, `data` is
//!   the serialized [`crate::Envelope`]
//! - `{"type":"subscribe"|"unsubscribe","topic":T}` — topic control
//! - `{"type":"auth",...}` — credential handshake, sent once after open
//! - `{"type":"ping"}` / `{"type":"pong"}` — heartbeat
//! - `{"type":"message","topic":T,"data":D}` — inbound delivery
//! - `{"type":"error","message":M}` / `{"type":"info"}` — broker control
//!
//! Bare text control lines (`PING`, `PONG`, `INFO ...`, `-ERR ...`) are
//! also recognized so the client interoperates with brokers that speak the
//! line-oriented dialect for keep-alive and errors.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// A discrete protocol frame exchanged over the transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Frame {
    /// Publish a payload to a topic
    Publish { topic: String, data: String },
    /// Begin receiving messages for a topic
    Subscribe { topic: String },
    /// Stop receiving messages for a topic
    Unsubscribe { topic: String },
    /// Credential handshake
    Auth {
        #[serde(skip_serializing_if = "Option::is_none")]
        username: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        password: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        token: Option<String>,
    },
    /// Keep-alive probe
    Ping,
    /// Keep-alive reply
    Pong,
    /// Inbound delivery of a payload published to a subscribed topic
    Message { topic: String, data: String },
    /// Broker-reported error
    Error { message: String },
    /// Broker banner / status frame, swallowed by the client
    Info,
}

impl Frame {
    /// Serialize the frame to its wire text
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Parse wire text as a frame
    pub fn decode(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::Serialization(e.to_string()))
    }
}

/// Protocol-level control traffic, consumed internally and never delivered
/// to the application layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlFrame {
    /// Broker probe; must be answered with a pong immediately
    Ping,
    /// Reply to one of our probes
    Pong,
    /// Broker banner or status line
    Info,
    /// Broker error report with its message text
    Error(String),
}

/// Classification of one inbound text frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Handled internally by the connection manager
    Control(ControlFrame),
    /// Handed to the codec and dispatched to subscribers
    Payload { topic: String, data: String },
}

/// Classify an inbound text frame
///
/// This is a total function: every input maps to either a control frame or
/// a payload. Text that parses as neither a control line nor a known JSON
/// frame is treated as an opaque payload with an empty topic, so a
/// misbehaving broker can never wedge the receive loop.
pub fn classify(text: &str) -> Inbound {
    let trimmed = text.trim();

    // Line-oriented control markers take precedence over JSON parsing.
    if trimmed.eq_ignore_ascii_case("PING") {
        return Inbound::Control(ControlFrame::Ping);
    }
    if trimmed.eq_ignore_ascii_case("PONG") {
        return Inbound::Control(ControlFrame::Pong);
    }
    if trimmed.starts_with("INFO") {
        return Inbound::Control(ControlFrame::Info);
    }
    if let Some(rest) = trimmed.strip_prefix("-ERR") {
        let reason = rest.trim().trim_matches('\'').to_string();
        return Inbound::Control(ControlFrame::Error(reason));
    }

    match Frame::decode(trimmed) {
        Ok(Frame::Ping) => Inbound::Control(ControlFrame::Ping),
        Ok(Frame::Pong) => Inbound::Control(ControlFrame::Pong),
        Ok(Frame::Info) => Inbound::Control(ControlFrame::Info),
        Ok(Frame::Error { message }) => Inbound::Control(ControlFrame::Error(message)),
        Ok(Frame::Message { topic, data }) | Ok(Frame::Publish { topic, data }) => {
            Inbound::Payload { topic, data }
        }
        Ok(other) => {
            // Client-to-broker frames echoed back at us carry no payload.
            tracing::debug!(frame = ?other, "Ignoring unexpected inbound control frame");
            Inbound::Control(ControlFrame::Info)
        }
        Err(_) => Inbound::Payload {
            topic: String::new(),
            data: text.to_string(),
        },
    }
}

/// Whether a broker error message signals an authentication or
/// authorization failure
///
/// Such errors are terminal for the current credential set: the connection
/// closes with the normal-closure code and no reconnect is scheduled.
pub fn is_auth_error(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("authorization") || lower.contains("authentication")
}
