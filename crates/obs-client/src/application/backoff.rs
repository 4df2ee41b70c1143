//! Exponential reconnect backoff.
//!
//! The n-th consecutive failed attempt waits `initial * factor^n`, capped at
//! `max`.  The counter resets once a connection reaches Identified, so a
//! connection that drops after a long healthy session retries quickly.

use std::time::Duration;

use crate::domain::ConnectionConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub max: Duration,
    pub factor: u32,
}

impl BackoffPolicy {
    pub const DEFAULT_FACTOR: u32 = 2;

    pub fn from_config(config: &ConnectionConfig) -> Self {
        Self {
            initial: config.reconnect_delay,
            max: config.max_reconnect_delay.max(config.reconnect_delay),
            factor: Self::DEFAULT_FACTOR,
        }
    }

    /// Delay before retry number `attempt` (zero-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.initial
            .saturating_mul(self.factor.saturating_pow(attempt))
            .min(self.max)
    }
}
