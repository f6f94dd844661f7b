//! Connection lifecycle management
//!
//! The [`ConnectionManager`] exclusively owns the WebSocket transport:
//! dialing, the credential handshake, the keep-alive heartbeat, close, and
//! reconnection with capped exponential backoff. Every inbound frame is
//! classified before dispatch — control traffic (ping/pong/info/error) is
//! handled here and never reaches the application layer; payload frames are
//! decoded and fanned out through the [`SubscriptionRegistry`].
//!
//! # Tasks
//!
//! A live connection runs exactly two background tasks, a receive loop and
//! a heartbeat, both tracked as `JoinHandle`s and cancelled on every
//! transition to disconnected so no orphaned timer can fire against a dead
//! session. A third, short-lived reconnector task exists only while an
//! unexpected close is being recovered.
//!
//! # Close semantics
//!
//! A normal-closure close means an intentional disconnect or a fatal
//! authentication failure; neither schedules a reconnect. Any other close
//! enters the backoff cycle, re-dialing with the stored credentials and
//! replaying every registered topic through the normal subscribe path.

use crate::backoff::{BackoffStrategy, ExponentialBackoff};
use crate::config::{validate_url, Auth, ClientConfig};
use crate::registry::SubscriptionRegistry;
use crate::status::ConnectionStatus;
use chatwire_core::{classify, is_auth_error, ControlFrame, Error, Frame, Inbound, Message, Result};
use futures::future::BoxFuture;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex as StdMutex, RwLock};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, WsMessage>;
type WsSource = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Credentials held only to support reconnection, never persisted
#[derive(Debug, Clone, Default)]
struct Credentials {
    username: Option<String>,
    password: Option<String>,
}

impl Credentials {
    /// Resolve the credential pair into an auth mode
    ///
    /// A long username with no password is taken as a bearer token, the
    /// same heuristic the broker's own clients apply.
    fn to_auth(&self) -> Option<Auth> {
        let username = self.username.as_deref()?;
        match self.password.as_deref() {
            None if username.len() > 20 => Some(Auth::Token(username.to_string())),
            password => Some(Auth::UserPass {
                user: username.to_string(),
                pass: password.unwrap_or_default().to_string(),
            }),
        }
    }
}

struct Shared {
    status: RwLock<ConnectionStatus>,
    /// Sticky flag set by a broker auth rejection; suppresses reconnect
    /// until explicitly reset
    auth_failed: AtomicBool,
    /// Set by `disconnect()`; turns the resulting close into a no-reconnect
    /// close and fails a racing dial
    closing: AtomicBool,
    /// Reconnect attempt counter, zeroed on every successful open
    attempts: AtomicU32,
    /// Pings sent without a pong reply
    pings_outstanding: AtomicU32,
    credentials: StdMutex<Credentials>,
    url: StdMutex<Option<String>>,
    sink: Mutex<Option<WsSink>>,
    reader: Mutex<Option<JoinHandle<()>>>,
    heartbeat: Mutex<Option<JoinHandle<()>>>,
    reconnector: Mutex<Option<JoinHandle<()>>>,
}

/// Owns the transport socket lifecycle: connect, authenticate, heartbeat,
/// close, reconnect-with-backoff
///
/// Cheaply cloneable; all clones share the same connection state.
#[derive(Clone)]
pub struct ConnectionManager {
    shared: Arc<Shared>,
    config: Arc<ClientConfig>,
}

impl ConnectionManager {
    pub(crate) fn new(config: Arc<ClientConfig>) -> Self {
        Self {
            shared: Arc::new(Shared {
                status: RwLock::new(ConnectionStatus::Disconnected),
                auth_failed: AtomicBool::new(false),
                closing: AtomicBool::new(false),
                attempts: AtomicU32::new(0),
                pings_outstanding: AtomicU32::new(0),
                credentials: StdMutex::new(Credentials::default()),
                url: StdMutex::new(None),
                sink: Mutex::new(None),
                reader: Mutex::new(None),
                heartbeat: Mutex::new(None),
                reconnector: Mutex::new(None),
            }),
            config,
        }
    }

    /// Current connection status
    pub fn status(&self) -> ConnectionStatus {
        *read_lock(&self.shared.status)
    }

    fn set_status(&self, status: ConnectionStatus) {
        *write_lock(&self.shared.status) = status;
    }

    /// Whether the broker rejected the last credential set
    pub fn auth_failed(&self) -> bool {
        self.shared.auth_failed.load(Ordering::SeqCst)
    }

    /// Clear the sticky auth-failed flag so new credentials can be tried
    pub fn reset_auth_status(&self) {
        self.shared.auth_failed.store(false, Ordering::SeqCst);
    }

    /// Establish a connection to the broker
    ///
    /// Short-circuits with `true` while already connecting or connected.
    /// Stores the credentials for later reconnection, dials with the
    /// configured timeout, and sends the auth frame once the transport is
    /// open. Resolves `false` on dial failure without scheduling a retry:
    /// only post-connection drops are retried automatically.
    pub async fn connect(
        &self,
        url: &str,
        username: Option<String>,
        password: Option<String>,
        registry: &SubscriptionRegistry,
    ) -> Result<bool> {
        validate_url(url)?;

        if matches!(
            self.status(),
            ConnectionStatus::Connecting | ConnectionStatus::Connected
        ) {
            tracing::debug!("connect() while session active, short-circuiting");
            return Ok(true);
        }

        self.reset_auth_status();
        self.shared.closing.store(false, Ordering::SeqCst);
        *lock(&self.shared.credentials) = Credentials { username, password };
        *lock(&self.shared.url) = Some(url.to_string());

        // A caller-initiated connect supersedes any pending retry cycle.
        if let Some(reconnector) = self.shared.reconnector.lock().await.take() {
            reconnector.abort();
        }
        self.shared.attempts.store(0, Ordering::SeqCst);

        self.dial(registry).await
    }

    /// Close the connection with the normal-closure code
    ///
    /// Cancels the heartbeat, any pending reconnect, and the receive loop,
    /// then forces the status to disconnected. Idempotent, and also the
    /// cancellation mechanism for an in-flight `connect`.
    pub async fn disconnect(&self) {
        self.shared.closing.store(true, Ordering::SeqCst);

        if let Some(reconnector) = self.shared.reconnector.lock().await.take() {
            reconnector.abort();
        }
        if let Some(heartbeat) = self.shared.heartbeat.lock().await.take() {
            heartbeat.abort();
        }
        if let Some(reader) = self.shared.reader.lock().await.take() {
            reader.abort();
        }

        self.close_transport().await;
        self.shared.pings_outstanding.store(0, Ordering::SeqCst);
        self.set_status(ConnectionStatus::Disconnected);
        tracing::info!("Disconnected");
    }

    /// Send a protocol frame over the live transport
    pub async fn send_frame(&self, frame: &Frame) -> Result<()> {
        let text = frame.encode()?;
        self.send_ws(WsMessage::Text(text)).await
    }

    async fn send_ws(&self, message: WsMessage) -> Result<()> {
        let mut guard = self.shared.sink.lock().await;
        let sink = guard.as_mut().ok_or(Error::ConnectionClosed)?;
        sink.send(message)
            .await
            .map_err(|e| Error::WebSocket(e.to_string()))
    }

    /// One dial attempt against the stored url, shared by `connect` and the
    /// reconnect cycle
    async fn dial(&self, registry: &SubscriptionRegistry) -> Result<bool> {
        let url = match lock(&self.shared.url).clone() {
            Some(url) => url,
            None => return Err(Error::InvalidConfig("no broker url set".to_string())),
        };

        self.set_status(ConnectionStatus::Connecting);
        tracing::info!(url = %url, "Connecting to broker");

        let ws_stream = match tokio::time::timeout(self.config.timeout, connect_async(&url)).await {
            Ok(Ok((ws_stream, _))) => ws_stream,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Connection failed");
                self.set_status(ConnectionStatus::Disconnected);
                return Ok(false);
            }
            Err(_) => {
                tracing::warn!(timeout_ms = self.config.timeout.as_millis() as u64, "Connect timed out");
                self.set_status(ConnectionStatus::Disconnected);
                return Ok(false);
            }
        };

        if self.shared.closing.load(Ordering::SeqCst) {
            // disconnect() raced the dial; treat the close as this
            // connect's failure path
            self.set_status(ConnectionStatus::Disconnected);
            return Ok(false);
        }

        let (sink, source) = ws_stream.split();
        *self.shared.sink.lock().await = Some(sink);

        if let Some(auth) = self.current_auth() {
            if let Err(e) = self.send_frame(&auth_frame(auth)).await {
                tracing::warn!(error = %e, "Auth handshake failed to send");
                self.close_transport().await;
                self.set_status(ConnectionStatus::Disconnected);
                return Ok(false);
            }
        }

        self.shared.attempts.store(0, Ordering::SeqCst);
        self.shared.pings_outstanding.store(0, Ordering::SeqCst);
        self.set_status(ConnectionStatus::Connected);
        tracing::info!("Connected");

        self.spawn_reader(source, registry.clone()).await;
        self.spawn_heartbeat(registry.clone()).await;
        self.replay_subscriptions(registry).await;

        Ok(true)
    }

    /// Credentials for the auth frame: the pair stored by `connect`, or the
    /// configured default
    fn current_auth(&self) -> Option<Auth> {
        lock(&self.shared.credentials)
            .to_auth()
            .or_else(|| self.config.auth.clone())
    }

    /// Re-subscribe every registered topic after a (re)connect
    ///
    /// The registry is cleared first and topics re-added one by one through
    /// the normal subscribe path so handler semantics stay consistent.
    async fn replay_subscriptions(&self, registry: &SubscriptionRegistry) {
        for topic in registry.drain_topics() {
            tracing::info!(topic = %topic, "Resubscribing");
            if let Err(e) = self
                .send_frame(&Frame::Subscribe {
                    topic: topic.clone(),
                })
                .await
            {
                tracing::warn!(topic = %topic, error = %e, "Resubscribe frame not sent");
            }
            registry.add_subscription(topic);
        }
    }

    async fn spawn_reader(&self, source: WsSource, registry: SubscriptionRegistry) {
        let conn = self.clone();
        let handle = tokio::spawn(async move {
            conn.read_loop(source, registry).await;
        });
        if let Some(old) = self.shared.reader.lock().await.replace(handle) {
            old.abort();
        }
    }

    async fn spawn_heartbeat(&self, registry: SubscriptionRegistry) {
        let conn = self.clone();
        let handle = tokio::spawn(async move {
            conn.heartbeat_loop(registry).await;
        });
        if let Some(old) = self.shared.heartbeat.lock().await.replace(handle) {
            old.abort();
        }
    }

    /// Receive loop for one connection, cancelled deterministically when
    /// the connection closes
    async fn read_loop(self, mut source: WsSource, registry: SubscriptionRegistry) {
        let mut normal_close = false;

        while let Some(item) = source.next().await {
            match item {
                Ok(WsMessage::Text(text)) => {
                    if self.handle_text(&text, &registry).await {
                        normal_close = true;
                        break;
                    }
                }
                Ok(WsMessage::Binary(bytes)) => match chatwire_core::codec::decode(&bytes) {
                    Ok(text) => {
                        if self.handle_text(&text, &registry).await {
                            normal_close = true;
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Discarding non-UTF-8 binary frame");
                    }
                },
                Ok(WsMessage::Ping(payload)) => {
                    let _ = self.send_ws(WsMessage::Pong(payload)).await;
                }
                Ok(WsMessage::Close(frame)) => {
                    normal_close =
                        matches!(&frame, Some(f) if f.code == CloseCode::Normal);
                    tracing::info!(frame = ?frame, "Connection closed by broker");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "WebSocket read error");
                    break;
                }
            }
        }

        self.handle_disconnect(normal_close, &registry).await;
    }

    /// Route one inbound text frame
    ///
    /// Returns true when the session must stop (fatal auth rejection).
    async fn handle_text(&self, text: &str, registry: &SubscriptionRegistry) -> bool {
        match classify(text) {
            Inbound::Control(ControlFrame::Ping) => {
                // Answer in kind: a bare-line PING gets a bare-line PONG.
                let reply = if text.trim().eq_ignore_ascii_case("PING") {
                    "PONG".to_string()
                } else {
                    Frame::Pong.encode().unwrap_or_else(|_| "PONG".to_string())
                };
                if let Err(e) = self.send_ws(WsMessage::Text(reply)).await {
                    tracing::debug!(error = %e, "Pong reply not sent");
                }
                false
            }
            Inbound::Control(ControlFrame::Pong) => {
                self.shared.pings_outstanding.store(0, Ordering::SeqCst);
                false
            }
            Inbound::Control(ControlFrame::Info) => {
                tracing::debug!("Broker info frame");
                false
            }
            Inbound::Control(ControlFrame::Error(message)) => {
                if is_auth_error(&message) {
                    tracing::error!(error = %message, "Broker rejected credentials");
                    self.shared.auth_failed.store(true, Ordering::SeqCst);
                    self.close_transport().await;
                    true
                } else {
                    tracing::warn!(error = %message, "Broker error");
                    false
                }
            }
            Inbound::Payload { topic, data } => {
                let message = Message::parse(&data, topic);
                registry.notify_handlers(&message);
                false
            }
        }
    }

    /// Keep-alive loop: one ping per interval, teardown when too many go
    /// unanswered
    async fn heartbeat_loop(self, registry: SubscriptionRegistry) {
        let mut interval = tokio::time::interval(self.config.ping_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick of a tokio interval fires immediately.
        interval.tick().await;

        loop {
            interval.tick().await;

            let outstanding = self.shared.pings_outstanding.fetch_add(1, Ordering::SeqCst);
            if outstanding >= self.config.max_ping_out {
                tracing::warn!(outstanding, "Connection stale, tearing down");
                // Drop our own handle first so the teardown below cannot
                // cancel this task mid-cleanup.
                let _ = self.shared.heartbeat.lock().await.take();
                if let Some(reader) = self.shared.reader.lock().await.take() {
                    reader.abort();
                }
                self.handle_disconnect(false, &registry).await;
                return;
            }

            if let Err(e) = self.send_frame(&Frame::Ping).await {
                tracing::debug!(error = %e, "Heartbeat ping not sent");
            }
        }
    }

    /// Common teardown after the transport is gone
    ///
    /// A normal close (explicit disconnect or auth failure) never
    /// reconnects; everything else schedules the backoff cycle when
    /// reconnection is enabled.
    async fn handle_disconnect(&self, normal_close: bool, registry: &SubscriptionRegistry) {
        if let Some(heartbeat) = self.shared.heartbeat.lock().await.take() {
            heartbeat.abort();
        }
        self.close_transport().await;
        self.set_status(ConnectionStatus::Disconnected);

        let suppressed = normal_close
            || self.shared.closing.load(Ordering::SeqCst)
            || self.auth_failed()
            || !self.config.reconnect;
        if suppressed {
            tracing::debug!(normal_close, "Not reconnecting");
            return;
        }

        let conn = self.clone();
        let registry = registry.clone();
        let handle = tokio::spawn(async move {
            conn.reconnect_loop(registry).await;
        });
        if let Some(old) = self.shared.reconnector.lock().await.replace(handle) {
            old.abort();
        }
    }

    /// Backoff-driven reconnect cycle after an unexpected close
    ///
    /// Returns a boxed future to break the opaque-type cycle between the
    /// mutually spawning async fns, which the compiler cannot otherwise
    /// prove `Send`.
    fn reconnect_loop(self, registry: SubscriptionRegistry) -> BoxFuture<'static, ()> {
        Box::pin(async move {
        let mut strategy = ExponentialBackoff::new(
            self.config.reconnect_time_wait,
            self.config.reconnect_max_wait,
        )
        .with_max_attempts(self.config.max_reconnect_attempts);

        loop {
            let attempt = self.shared.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            let delay = match strategy.next_delay(attempt) {
                Some(delay) => delay,
                None => {
                    tracing::error!(
                        attempts = attempt - 1,
                        "Reconnection abandoned, attempt limit reached"
                    );
                    return;
                }
            };

            tracing::info!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                "Reconnecting after backoff"
            );
            tokio::time::sleep(delay).await;

            if self.shared.closing.load(Ordering::SeqCst) || self.auth_failed() {
                return;
            }

            match self.dial(&registry).await {
                Ok(true) => {
                    tracing::info!("Reconnected");
                    return;
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Reconnect attempt failed");
                }
            }
        }
        })
    }

    /// Send a normal-closure frame and drop the sink, if one is open
    async fn close_transport(&self) {
        if let Some(mut sink) = self.shared.sink.lock().await.take() {
            let close = WsMessage::Close(Some(CloseFrame {
                code: CloseCode::Normal,
                reason: "".into(),
            }));
            if let Err(e) = sink.send(close).await {
                tracing::debug!(error = %e, "Close frame not sent");
            }
            let _ = sink.close().await;
        }
    }
}

fn auth_frame(auth: Auth) -> Frame {
    match auth {
        Auth::UserPass { user, pass } => Frame::Auth {
            username: Some(user),
            password: Some(pass),
            token: None,
        },
        Auth::Token(token) => Frame::Auth {
            username: None,
            password: None,
            token: Some(token),
        },
    }
}

fn lock<T>(mutex: &StdMutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn read_lock<T>(rwlock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    rwlock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_lock<T>(rwlock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    rwlock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}
