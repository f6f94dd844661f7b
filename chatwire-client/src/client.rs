//! The chat client facade
//!
//! `ChatClient` is the public surface consumed by UI collaborators. It
//! composes the connection manager, the subscription registry, and the
//! client identity; session control (`connect`/`disconnect`) is delegated
//! to the connection manager, topic bookkeeping to the registry.
//!
//! The client is constructed explicitly and owned by whoever composes the
//! application — there is no module-level singleton. It is cheaply
//! cloneable; all clones share the same connection, registry, and identity.
//!
//! # Example
//!
//! ```rust,no_run
//! use chatwire_client::{ChatClient, ClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> chatwire_core::Result<()> {
//!     let client = ChatClient::new(ClientConfig::default())?;
//!     client.set_username("alice");
//!
//!     let handler = client.on_message(|msg| {
//!         println!("[{}] {}: {}", msg.topic, msg.username, msg.content);
//!     });
//!
//!     if client.connect("ws://localhost:4222", None, None).await? {
//!         client.subscribe("general").await;
//!         client.publish("general", "hello").await;
//!     }
//!
//!     client.disconnect().await;
//!     client.remove_message_handler(handler);
//!     Ok(())
//! }
//! ```

use crate::config::ClientConfig;
use crate::connection::ConnectionManager;
use crate::registry::{HandlerId, Subscription, SubscriptionRegistry};
use crate::status::ConnectionStatus;
use chatwire_core::{generate_user_id, generate_username, Envelope, Frame, Message, Result};
use std::sync::{Arc, RwLock};

struct Identity {
    /// Generated once at construction, stable for the process lifetime
    user_id: String,
    /// Mutable display name, stamped into every outgoing envelope
    username: RwLock<String>,
}

/// Pub/sub chat client over a WebSocket broker connection
#[derive(Clone)]
pub struct ChatClient {
    conn: ConnectionManager,
    registry: SubscriptionRegistry,
    identity: Arc<Identity>,
}

impl ChatClient {
    /// Create a client with the given configuration
    ///
    /// Validates the configuration up front and generates a random user id
    /// and default username.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            conn: ConnectionManager::new(Arc::new(config)),
            registry: SubscriptionRegistry::new(),
            identity: Arc::new(Identity {
                user_id: generate_user_id(),
                username: RwLock::new(generate_username()),
            }),
        })
    }

    /// Connect to a broker endpoint
    ///
    /// Resolves `true` on a successful open (or when already connected),
    /// `false` on transport failure. Credentials, when supplied, are sent
    /// in an auth frame after the transport opens and are retained for
    /// automatic reconnection.
    pub async fn connect(
        &self,
        url: &str,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<bool> {
        self.conn
            .connect(
                url,
                username.map(str::to_string),
                password.map(str::to_string),
                &self.registry,
            )
            .await
    }

    /// Close the connection and cancel all background activity
    pub async fn disconnect(&self) {
        self.conn.disconnect().await;
    }

    /// Publish message content to a topic
    ///
    /// Fails closed: returns `false` without sending anything when the
    /// client is not connected or the send fails.
    pub async fn publish(&self, topic: &str, content: &str) -> bool {
        if self.status() != ConnectionStatus::Connected {
            tracing::debug!(topic = %topic, "publish while not connected");
            return false;
        }

        let envelope = Envelope::build(self.username(), content, &self.identity.user_id);
        let data = match envelope.to_json() {
            Ok(data) => data,
            Err(e) => {
                tracing::error!(error = %e, "Envelope serialization failed");
                return false;
            }
        };

        let frame = Frame::Publish {
            topic: topic.to_string(),
            data,
        };
        match self.conn.send_frame(&frame).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(topic = %topic, error = %e, "Publish failed");
                false
            }
        }
    }

    /// Subscribe to a topic
    ///
    /// Returns `None` when not connected. Idempotent: subscribing to an
    /// already-subscribed topic returns the existing handle and sends no
    /// second subscribe frame.
    pub async fn subscribe(&self, topic: &str) -> Option<Subscription> {
        if self.status() != ConnectionStatus::Connected {
            tracing::debug!(topic = %topic, "subscribe while not connected");
            return None;
        }

        if self.registry.has_subscription(topic) {
            return Some(Subscription::new(
                topic,
                self.registry.clone(),
                self.conn.clone(),
            ));
        }

        let frame = Frame::Subscribe {
            topic: topic.to_string(),
        };
        if let Err(e) = self.conn.send_frame(&frame).await {
            tracing::warn!(topic = %topic, error = %e, "Subscribe failed");
            return None;
        }

        self.registry.add_subscription(topic);
        Some(Subscription::new(
            topic,
            self.registry.clone(),
            self.conn.clone(),
        ))
    }

    /// Unsubscribe from a topic
    pub async fn unsubscribe(&self, topic: &str) {
        self.registry.remove_subscription(topic, &self.conn).await;
    }

    /// Register a handler invoked for every decoded inbound message,
    /// regardless of topic
    ///
    /// Multiple handlers may be registered; treat the fan-out as unordered.
    pub fn on_message<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(Message) + Send + Sync + 'static,
    {
        self.registry.add_message_handler(handler)
    }

    /// Deregister a previously registered message handler
    pub fn remove_message_handler(&self, id: HandlerId) -> bool {
        self.registry.remove_message_handler(id)
    }

    /// Current connection status
    pub fn status(&self) -> ConnectionStatus {
        self.conn.status()
    }

    /// Whether the broker rejected the last credential set
    pub fn auth_failed(&self) -> bool {
        self.conn.auth_failed()
    }

    /// Clear the auth-failed flag before retrying with new credentials
    pub fn reset_auth_status(&self) {
        self.conn.reset_auth_status();
    }

    /// Topics with an active subscription
    pub fn subscriptions(&self) -> Vec<String> {
        self.registry.topics()
    }

    /// The stable client user id
    pub fn user_id(&self) -> &str {
        &self.identity.user_id
    }

    /// Current display name
    pub fn username(&self) -> String {
        self.identity
            .username
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Change the display name used for outgoing messages
    pub fn set_username(&self, username: impl Into<String>) {
        *self
            .identity
            .username
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = username.into();
    }
}
