//! Retry policy.
//!
//! # Responsibilities
//! - Decide whether another attempt is allowed
//! - Compute the wait before the next attempt
//!
//! `max_attempts` counts the first attempt, so `1` means no retries.

use std::time::Duration;

use crate::config::{BackoffKind, RetryConfig};
use crate::resilience::backoff::exponential_delay;

/// Delay strategy between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay before every retry.
    Fixed,
    /// Doubling delay with jitter, capped at `max_delay`.
    Exponential { max_delay: Duration },
}

/// Bounded retry with a delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// Single attempt, no retries.
    pub fn none() -> Self {
        Self::default()
    }

    /// Fixed-delay retries.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            backoff: Backoff::Fixed,
        }
    }

    /// Exponential retries starting at `delay`.
    pub fn exponential(max_attempts: u32, delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            backoff: Backoff::Exponential { max_delay },
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        let delay = Duration::from_millis(config.delay_ms);
        match config.backoff {
            BackoffKind::Fixed => Self::fixed(config.max_attempts, delay),
            BackoffKind::Exponential => Self::exponential(
                config.max_attempts,
                delay,
                Duration::from_millis(config.max_delay_ms),
            ),
        }
    }

    /// Whether another attempt may follow `attempts_made` failed attempts.
    pub fn should_retry(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts
    }

    /// Wait before retry number `retry` (1 = the second attempt).
    pub fn delay_for(&self, retry: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential { max_delay } => exponential_delay(retry, self.delay, max_delay),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(1, Duration::from_millis(1_000))
    }
}
