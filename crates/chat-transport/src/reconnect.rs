//! Reconnection policies.

use std::time::Duration;

/// Retry schedule consulted after a connection ends without a local close.
pub trait ReconnectPolicy: Send + Sync {
    /// Delay before retry number `attempt` (0-based, reset after each
    /// successful open). `None` stops reconnecting.
    fn next_delay(&self, attempt: u32) -> Option<Duration>;
}

/// Never reconnect.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoReconnect;

impl ReconnectPolicy for NoReconnect {
    fn next_delay(&self, _attempt: u32) -> Option<Duration> {
        None
    }
}

/// `initial * multiplier^attempt`, capped at `max_delay`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExponentialBackoff {
    initial: Duration,
    max_delay: Duration,
    multiplier: f64,
    max_attempts: Option<u32>,
}

impl ExponentialBackoff {
    /// Create a doubling back-off with no attempt limit.
    #[must_use]
    pub const fn new(initial: Duration, max_delay: Duration) -> Self {
        Self {
            initial,
            max_delay,
            multiplier: 2.0,
            max_attempts: None,
        }
    }

    /// Set the growth factor. Values below 1.0 are treated as 1.0.
    #[must_use]
    pub const fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Stop after `max_attempts` consecutive failures.
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts;
        self
    }
}

impl ReconnectPolicy for ExponentialBackoff {
    fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if self.max_attempts.is_some_and(|max| attempt >= max) {
            return None;
        }

        let factor = self.multiplier.max(1.0).powi(i32::try_from(attempt).unwrap_or(i32::MAX));
        let max_secs = self.max_delay.as_secs_f64();
        let secs = (self.initial.as_secs_f64() * factor).min(max_secs);

        // NaN/inf from extreme multipliers land on the cap.
        Some(Duration::try_from_secs_f64(secs).map_or(self.max_delay, |d| d.min(self.max_delay)))
    }
}
