//! Core wire types for the chatwire pub/sub client
//!
//! This crate holds everything the client needs to talk the chat wire
//! protocol without owning a connection:
//!
//! - **Message model**: the decoded [`Message`] delivered to subscribers
//! - **Envelope**: the JSON payload wrapping content with sender metadata
//! - **Frames**: the tagged JSON frame shapes and the inbound classifier
//!   that separates control traffic from payloads
//! - **Codec**: lossless text/byte conversion for the transport
//! - **Errors**: the shared [`Error`]/[`Result`] types
//!
//! The connection manager and client facade live in `chatwire-client`.

pub mod codec;
mod envelope;
mod error;
mod frame;
mod message;

pub use envelope::Envelope;
pub use error::{Error, Result};
pub use frame::{classify, is_auth_error, ControlFrame, Frame, Inbound};
pub use message::{generate_user_id, generate_username, message_id, Message, UNKNOWN_SENDER};
