//! Subscription registry
//!
//! Single source of truth for "what are we listening to": the set of
//! subscribed topics plus the fan-out list of message handlers. Topic
//! entries are keyed by topic string, one subscription per topic; handlers
//! receive every decoded inbound message regardless of topic (topic
//! filtering is the caller's business).
//!
//! Handlers run synchronously on the receive loop, so dispatch is always
//! serialized. The handler list is snapshotted before invocation, which
//! makes it safe for a handler to subscribe, unsubscribe, or register
//! another handler while a message is being delivered.

use crate::connection::ConnectionManager;
use chatwire_core::{Frame, Message};
use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Callback invoked for every decoded inbound message
pub type MessageFn = Arc<dyn Fn(Message) + Send + Sync>;

/// Token returned by handler registration, used to deregister
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

/// Handle to an active topic subscription
///
/// The topic string is the subscription's identity: subscribing twice to
/// the same topic yields equal handles. Cancelling goes through the
/// registry so the transport-level unsubscribe is sent before the entry is
/// dropped.
#[derive(Clone)]
pub struct Subscription {
    topic: String,
    registry: SubscriptionRegistry,
    conn: ConnectionManager,
}

impl Subscription {
    pub(crate) fn new(
        topic: impl Into<String>,
        registry: SubscriptionRegistry,
        conn: ConnectionManager,
    ) -> Self {
        Self {
            topic: topic.into(),
            registry,
            conn,
        }
    }

    /// The topic this subscription listens on
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Cancel the subscription, sending the unsubscribe frame
    pub async fn cancel(self) {
        self.registry
            .remove_subscription(&self.topic, &self.conn)
            .await;
    }
}

impl PartialEq for Subscription {
    fn eq(&self, other: &Self) -> bool {
        self.topic == other.topic
    }
}

impl Eq for Subscription {}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("topic", &self.topic)
            .finish()
    }
}

/// Tracks active topic subscriptions and registered message handlers
#[derive(Clone, Default)]
pub struct SubscriptionRegistry {
    topics: Arc<Mutex<HashSet<String>>>,
    handlers: Arc<Mutex<Vec<(HandlerId, MessageFn)>>>,
    next_handler_id: Arc<AtomicU64>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a subscription for a topic
    ///
    /// Returns false if the topic was already present.
    pub fn add_subscription(&self, topic: impl Into<String>) -> bool {
        lock(&self.topics).insert(topic.into())
    }

    /// Whether a subscription exists for the topic
    pub fn has_subscription(&self, topic: &str) -> bool {
        lock(&self.topics).contains(topic)
    }

    /// Drop the subscription for a topic, sending the transport-level
    /// unsubscribe first
    ///
    /// The frame send is best effort: a dead transport still drops the
    /// entry so the registry never disagrees with the caller's intent.
    /// Returns false if no such subscription existed.
    pub async fn remove_subscription(&self, topic: &str, conn: &ConnectionManager) -> bool {
        if !lock(&self.topics).contains(topic) {
            return false;
        }
        if let Err(e) = conn
            .send_frame(&Frame::Unsubscribe {
                topic: topic.to_string(),
            })
            .await
        {
            tracing::debug!(topic = %topic, error = %e, "Unsubscribe frame not sent");
        }
        lock(&self.topics).remove(topic)
    }

    /// Current subscription topics
    pub fn topics(&self) -> Vec<String> {
        lock(&self.topics).iter().cloned().collect()
    }

    /// Clear all topic entries and return them, for reconnect replay
    pub(crate) fn drain_topics(&self) -> Vec<String> {
        lock(&self.topics).drain().collect()
    }

    /// Register a message handler; returns the token to deregister it
    pub fn add_message_handler<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(Message) + Send + Sync + 'static,
    {
        let id = HandlerId(self.next_handler_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.handlers).push((id, Arc::new(handler)));
        id
    }

    /// Deregister a handler; returns false if the token was unknown
    pub fn remove_message_handler(&self, id: HandlerId) -> bool {
        let mut handlers = lock(&self.handlers);
        let before = handlers.len();
        handlers.retain(|(hid, _)| *hid != id);
        handlers.len() != before
    }

    /// Number of registered handlers
    pub fn handler_count(&self) -> usize {
        lock(&self.handlers).len()
    }

    /// Deliver a message to every registered handler
    ///
    /// Handlers are invoked in insertion order, but callers must treat the
    /// fan-out as unordered. A panicking handler is caught and logged; the
    /// remaining handlers still receive the message.
    pub fn notify_handlers(&self, message: &Message) {
        let snapshot: Vec<MessageFn> = lock(&self.handlers)
            .iter()
            .map(|(_, f)| Arc::clone(f))
            .collect();

        for handler in snapshot {
            let msg = message.clone();
            if catch_unwind(AssertUnwindSafe(|| handler(msg))).is_err() {
                tracing::error!(topic = %message.topic, "Message handler panicked");
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
