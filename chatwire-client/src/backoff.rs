//! Reconnection backoff strategies
//!
//! When the connection drops unexpectedly, the strategy decides how long to
//! wait before each attempt and when to give up. Attempts are 1-indexed:
//! the first retry after a drop asks for the attempt-1 delay.
//!
//! The connection manager builds an [`ExponentialBackoff`] from
//! [`crate::ClientConfig`]: `min(base * 2^(attempt-1), cap)` until the
//! attempt cap. A fresh strategy is constructed for every outage, so
//! delays always restart from the base.

use std::time::Duration;

/// Trait for reconnection backoff strategies
pub trait BackoffStrategy: Send + Sync {
    /// Delay before reconnect attempt number `attempt` (1-indexed)
    ///
    /// Returns `None` when the strategy gives up; no further attempts are
    /// scheduled after that.
    fn next_delay(&mut self, attempt: u32) -> Option<Duration>;
}

/// Capped exponential backoff with a maximum attempt count
pub struct ExponentialBackoff {
    base: Duration,
    cap: Duration,
    max_attempts: Option<u32>,
}

impl ExponentialBackoff {
    /// Create an exponential backoff from a base delay and a cap
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self {
            base,
            cap,
            max_attempts: None,
        }
    }

    /// Stop retrying after `max_attempts` attempts
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }
}

impl BackoffStrategy for ExponentialBackoff {
    fn next_delay(&mut self, attempt: u32) -> Option<Duration> {
        if attempt == 0 {
            return None;
        }
        if let Some(max) = self.max_attempts {
            if attempt > max {
                return None;
            }
        }

        // base * 2^(attempt-1), saturating, capped
        let base_ms = self.base.as_millis() as u64;
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1).min(32));
        let delay_ms = base_ms
            .saturating_mul(factor)
            .min(self.cap.as_millis() as u64);

        Some(Duration::from_millis(delay_ms))
    }
}
