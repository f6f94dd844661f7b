//! WebSocket pub/sub chat client with automatic reconnection
//!
//! This crate provides the connection-owning half of chatwire: a client
//! that multiplexes topic subscriptions over a single WebSocket session to
//! a message broker, handles the credential handshake and keep-alive
//! heartbeat, and recovers from unexpected disconnects with capped
//! exponential backoff and full resubscription.
//!
//! # Components
//!
//! - [`ChatClient`]: the facade UI code talks to — connect, publish,
//!   subscribe, message handlers, identity
//! - [`ConnectionManager`]: transport lifecycle and inbound frame routing
//! - [`SubscriptionRegistry`]: topic bookkeeping and handler fan-out
//! - [`ClientConfig`]: explicit, validated connection options
//! - [`BackoffStrategy`]: reconnect delay policies
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use chatwire_client::{ChatClient, ClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> chatwire_core::Result<()> {
//!     let client = ChatClient::new(ClientConfig::default())?;
//!
//!     client.on_message(|msg| {
//!         println!("{}: {}", msg.username, msg.content);
//!     });
//!
//!     if client.connect("ws://localhost:4222", Some("alice"), Some("s3cret")).await? {
//!         let _sub = client.subscribe("general").await;
//!         client.publish("general", "hi all").await;
//!     }
//!     Ok(())
//! }
//! ```

mod backoff;
mod client;
mod config;
mod connection;
mod registry;
mod status;

pub use backoff::{BackoffStrategy, ExponentialBackoff};
pub use client::ChatClient;
pub use config::{Auth, ClientConfig};
pub use connection::ConnectionManager;
pub use registry::{HandlerId, MessageFn, Subscription, SubscriptionRegistry};
pub use status::ConnectionStatus;
