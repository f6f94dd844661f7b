//! Client configuration
//!
//! All connection options are enumerated explicitly and validated when the
//! client is constructed, instead of being discovered at runtime from a
//! loosely-typed options bag. Defaults mirror the broker client this
//! protocol grew out of: reconnect on with five attempts, two second base
//! wait, thirty second dial timeout and ping interval, three outstanding
//! pings tolerated.

use chatwire_core::{Error, Result};
use std::time::Duration;

/// Credentials passed through to the broker during the auth handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Auth {
    /// Username and password pair
    UserPass { user: String, pass: String },
    /// Opaque bearer token
    Token(String),
}

/// Connection options for [`crate::ChatClient`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Broker endpoints; `connect(url, ..)` prepends its url at dial time
    pub servers: Vec<String>,
    /// Whether unexpected closes schedule automatic reconnection
    pub reconnect: bool,
    /// Reconnect attempts before giving up
    pub max_reconnect_attempts: u32,
    /// Base delay for the exponential reconnect backoff
    pub reconnect_time_wait: Duration,
    /// Upper bound on a single backoff delay
    pub reconnect_max_wait: Duration,
    /// Dial timeout for one connection attempt
    pub timeout: Duration,
    /// Interval between keep-alive pings on a live connection
    pub ping_interval: Duration,
    /// Unanswered pings tolerated before the connection is declared stale
    pub max_ping_out: u32,
    /// Default credentials, overridable per `connect` call
    pub auth: Option<Auth>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            servers: Vec::new(),
            reconnect: true,
            max_reconnect_attempts: 5,
            reconnect_time_wait: Duration::from_secs(2),
            reconnect_max_wait: Duration::from_secs(30),
            timeout: Duration::from_secs(30),
            ping_interval: Duration::from_secs(30),
            max_ping_out: 3,
            auth: None,
        }
    }
}

impl ClientConfig {
    /// Validate the configuration
    ///
    /// Called by `ChatClient::new`; rejects values that would make the
    /// connection manager misbehave rather than letting them surface as
    /// runtime oddities.
    pub fn validate(&self) -> Result<()> {
        for server in &self.servers {
            validate_url(server)?;
        }
        if self.reconnect && self.max_reconnect_attempts == 0 {
            return Err(Error::InvalidConfig(
                "max_reconnect_attempts must be at least 1 when reconnect is enabled".to_string(),
            ));
        }
        if self.reconnect && self.reconnect_time_wait.is_zero() {
            return Err(Error::InvalidConfig(
                "reconnect_time_wait must be non-zero".to_string(),
            ));
        }
        if self.reconnect_max_wait < self.reconnect_time_wait {
            return Err(Error::InvalidConfig(
                "reconnect_max_wait must be at least reconnect_time_wait".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(Error::InvalidConfig("timeout must be non-zero".to_string()));
        }
        if self.ping_interval.is_zero() {
            return Err(Error::InvalidConfig(
                "ping_interval must be non-zero".to_string(),
            ));
        }
        if self.max_ping_out == 0 {
            return Err(Error::InvalidConfig(
                "max_ping_out must be at least 1".to_string(),
            ));
        }
        if let Some(Auth::UserPass { user, .. }) = &self.auth {
            if user.is_empty() {
                return Err(Error::InvalidConfig("auth user must not be empty".to_string()));
            }
        }
        Ok(())
    }
}

/// Check that a url names a WebSocket endpoint
pub(crate) fn validate_url(url: &str) -> Result<()> {
    if url.starts_with("ws://") || url.starts_with("wss://") {
        Ok(())
    } else {
        Err(Error::InvalidConfig(format!(
            "not a WebSocket endpoint: {}",
            url
        )))
    }
}
