//! Common test utilities for chatwire-client integration tests
//!
//! Provides a scriptable mock broker so client behavior can be exercised
//! without a real message broker: each accepted connection is handed to the
//! test as a [`BrokerConn`] that records the frames the client sent and can
//! push frames, close cleanly, or drop the socket outright.

use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

enum ServerCommand {
    Send(String),
    Close,
    Abort,
}

/// Mock WebSocket broker for client testing
///
/// Accepts any number of sequential connections, which makes it suitable
/// for reconnection tests: each accepted socket is surfaced through
/// [`MockBroker::accept`] as its own handle.
pub struct MockBroker {
    addr: SocketAddr,
    conns: mpsc::Receiver<BrokerConn>,
    shutdown_tx: mpsc::Sender<()>,
}

/// One accepted client connection, driven by the test
pub struct BrokerConn {
    frames: mpsc::Receiver<String>,
    commands: mpsc::Sender<ServerCommand>,
}

impl MockBroker {
    /// Start the broker on an ephemeral local port
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (conn_tx, conns) = mpsc::channel::<BrokerConn>(8);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    accepted = listener.accept() => {
                        let Ok((stream, _)) = accepted else { break };
                        let Ok(ws_stream) = accept_async(stream).await else { continue };

                        let (frame_tx, frame_rx) = mpsc::channel::<String>(64);
                        let (cmd_tx, mut cmd_rx) = mpsc::channel::<ServerCommand>(16);

                        tokio::spawn(async move {
                            let (mut write, mut read) = ws_stream.split();
                            loop {
                                tokio::select! {
                                    cmd = cmd_rx.recv() => match cmd {
                                        Some(ServerCommand::Send(text)) => {
                                            if write.send(Message::Text(text)).await.is_err() {
                                                break;
                                            }
                                        }
                                        Some(ServerCommand::Close) => {
                                            let close = Message::Close(Some(CloseFrame {
                                                code: CloseCode::Normal,
                                                reason: "".into(),
                                            }));
                                            let _ = write.send(close).await;
                                        }
                                        // Dropping both halves kills the TCP
                                        // stream without a close handshake.
                                        Some(ServerCommand::Abort) | None => break,
                                    },
                                    item = read.next() => match item {
                                        Some(Ok(Message::Text(text))) => {
                                            let _ = frame_tx.send(text).await;
                                        }
                                        Some(Ok(Message::Close(_))) | None => break,
                                        Some(Ok(_)) => {}
                                        Some(Err(_)) => break,
                                    },
                                }
                            }
                        });

                        if conn_tx.send(BrokerConn { frames: frame_rx, commands: cmd_tx }).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });

        Self {
            addr,
            conns,
            shutdown_tx,
        }
    }

    /// WebSocket URL for connecting to this broker
    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Wait for the next client connection
    pub async fn accept(&mut self) -> BrokerConn {
        tokio::time::timeout(Duration::from_secs(5), self.conns.recv())
            .await
            .expect("timed out waiting for a client connection")
            .expect("broker task ended")
    }

    /// Wait briefly for a connection; None if no client dials in
    pub async fn try_accept(&mut self, wait: Duration) -> Option<BrokerConn> {
        tokio::time::timeout(wait, self.conns.recv()).await.ok().flatten()
    }

    /// Stop accepting connections and release the port
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

impl BrokerConn {
    /// Wait for the next text frame received from the client
    pub async fn next_frame(&mut self) -> String {
        tokio::time::timeout(Duration::from_secs(5), self.frames.recv())
            .await
            .expect("timed out waiting for a client frame")
            .expect("connection task ended")
    }

    /// Wait briefly for a frame; None if the client sends nothing
    pub async fn try_next_frame(&mut self, wait: Duration) -> Option<String> {
        tokio::time::timeout(wait, self.frames.recv()).await.ok().flatten()
    }

    /// Push a text frame to the client
    pub async fn send_text(&self, text: impl Into<String>) {
        let _ = self.commands.send(ServerCommand::Send(text.into())).await;
    }

    /// Close the connection with the normal-closure code
    pub async fn close_normal(&self) {
        let _ = self.commands.send(ServerCommand::Close).await;
    }

    /// Drop the socket without a close handshake, simulating a crash
    pub async fn abort(&self) {
        let _ = self.commands.send(ServerCommand::Abort).await;
    }
}

/// Build a broker-to-client message frame
pub fn message_frame(topic: &str, data: &str) -> String {
    serde_json::json!({
        "type": "message",
        "topic": topic,
        "data": data,
    })
    .to_string()
}

/// Build a broker error frame
pub fn error_frame(message: &str) -> String {
    serde_json::json!({
        "type": "error",
        "message": message,
    })
    .to_string()
}

/// Poll a condition until it holds or the timeout expires
pub async fn wait_until<F>(cond: F, timeout: Duration) -> bool
where
    F: Fn() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    cond()
}

/// Client configuration tuned for fast test turnaround
pub fn fast_config() -> chatwire_client::ClientConfig {
    chatwire_client::ClientConfig {
        reconnect_time_wait: Duration::from_millis(50),
        reconnect_max_wait: Duration::from_millis(400),
        timeout: Duration::from_secs(5),
        // Keep the heartbeat out of the way unless a test wants it.
        ping_interval: Duration::from_secs(60),
        ..Default::default()
    }
}
