//! Retry strategies.
//!
//! Used by the HTTP client for idempotent requests and by the log
//! synchronizer's retry wrapper for whole read-modify-write cycles.

use std::time::Duration;

/// Strategy for retrying failed operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryStrategy {
    /// Maximum number of attempts, including the first one.
    pub max_attempts: u32,
    /// Base delay between attempts in milliseconds.
    pub base_delay_ms: u64,
    /// Whether to use exponential backoff.
    pub exponential_backoff: bool,
    /// Maximum delay between attempts in milliseconds.
    pub max_delay_ms: u64,
}

impl RetryStrategy {
    /// Creates a new retry strategy.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay_ms: 500,
            exponential_backoff: true,
            max_delay_ms: 30_000,
        }
    }

    /// Disables retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 0,
            exponential_backoff: false,
            max_delay_ms: 0,
        }
    }

    /// Sets the base delay.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Enables or disables exponential backoff.
    pub fn with_exponential_backoff(mut self, enabled: bool) -> Self {
        self.exponential_backoff = enabled;
        self
    }

    /// Calculates the delay after a failed attempt (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = if self.exponential_backoff {
            let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
            self.base_delay_ms.saturating_mul(factor)
        } else {
            self.base_delay_ms
        };

        Duration::from_millis(delay.min(self.max_delay_ms))
    }

    /// Whether another attempt is allowed after `attempt` attempts.
    pub fn allows_another(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Determines if a request error should be retried.
    pub fn should_retry(&self, error: &reqwest::Error) -> bool {
        error.is_connect() || error.is_timeout()
    }
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self::new(3)
    }
}
