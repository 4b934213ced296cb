//! Retry and reconnect policy.
//!
//! Send retries are bounded by `max_send_attempts` and spaced with an
//! exponential backoff. Reconnects after a handshake failure are bounded by
//! `max_reconnect_attempts`; the counter lives on the recognizer context.

use std::time::Duration;

use backoff::ExponentialBackoff;

use crate::config::RetryConfig;

/// Resolved retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per action, first one included
    pub max_send_attempts: u32,
    /// Reconnects allowed after a handshake failure
    pub max_reconnect_attempts: u32,
    /// First retry delay
    pub initial_backoff: Duration,
    /// Retry delay ceiling
    pub max_backoff: Duration,
    /// Handshake deadline
    pub handshake_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_send_attempts: config.max_send_attempts.max(1),
            max_reconnect_attempts: config.max_reconnect_attempts,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms.max(config.initial_backoff_ms)),
            handshake_timeout: config.handshake_timeout(),
        }
    }
}

impl RetryPolicy {
    /// Fresh backoff schedule for one logical action.
    ///
    /// Deterministic (no jitter) and without an elapsed-time cap: the
    /// attempt count is the only bound.
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: self.initial_backoff,
            initial_interval: self.initial_backoff,
            max_interval: self.max_backoff,
            randomization_factor: 0.0,
            multiplier: 2.0,
            max_elapsed_time: None,
            ..ExponentialBackoff::default()
        }
    }

    /// Whether another send attempt is allowed after `attempts` failures
    pub fn may_resend(&self, attempts: u32) -> bool {
        attempts < self.max_send_attempts
    }
}
