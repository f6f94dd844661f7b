//! Text codec for the WebSocket transport
//!
//! The transport carries UTF-8 text; these helpers convert between the
//! in-memory string representation and the transport's byte representation
//! without loss: `decode(&encode(s)) == s` for every valid string.

use crate::error::{Error, Result};

/// Encode payload text to transport bytes
pub fn encode(payload: &str) -> Vec<u8> {
    payload.as_bytes().to_vec()
}

/// Decode transport bytes back to payload text
///
/// Fails only when the bytes are not valid UTF-8; the chat protocol never
/// produces such frames itself.
pub fn decode(bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec()).map_err(|e| Error::InvalidUtf8(e.to_string()))
}
