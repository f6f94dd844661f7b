//! chatwire - pub/sub chat client over WebSocket
//!
//! This is the main convenience crate that re-exports the chatwire
//! sub-crates. Use it if you want a single dependency providing the wire
//! types and the client.
//!
//! # Architecture
//!
//! chatwire is organized into modular crates:
//!
//! - **chatwire-core**: message model, envelope, frames, codec, errors
//! - **chatwire-client**: connection manager, subscription registry,
//!   reconnection, and the `ChatClient` facade
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use chatwire::{ChatClient, ClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ChatClient::new(ClientConfig::default())?;
//!
//!     client.on_message(|msg| {
//!         println!("[{}] {}: {}", msg.topic, msg.username, msg.content);
//!     });
//!
//!     if client.connect("ws://localhost:4222", None, None).await? {
//!         client.subscribe("general").await;
//!         client.publish("general", "hello from chatwire").await;
//!     }
//!
//!     client.disconnect().await;
//!     Ok(())
//! }
//! ```

// Re-export the sub-crates under stable module names
pub use chatwire_client as client;
pub use chatwire_core as core;

// Convenience re-exports of the most commonly used types
pub use chatwire_client::{ChatClient, ClientConfig, ConnectionStatus, Subscription};
pub use chatwire_core::{Envelope, Message};
