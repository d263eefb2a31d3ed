//! Exponential backoff policy for provider calls.
//!
//! The async driver lives in `studio_providers::retry`; this module only
//! computes delays so it can be tested without a runtime.

use std::time::Duration;

/// Tunable parameters for retrying a whole provider operation.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries.
    pub fn once() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Sleep that follows failed attempt `attempt` (0-based).
    ///
    /// Returns `None` after the last attempt: there is nothing left to wait for.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        if attempt + 1 >= self.max_attempts {
            return None;
        }
        let mut delay = self.initial_delay;
        for _ in 0..attempt {
            delay = next_delay(delay, self);
        }
        Some(delay.min(self.max_delay))
    }
}

/// Calculate the next backoff delay, clamped to [`RetryPolicy::max_delay`].
pub fn next_delay(current: Duration, policy: &RetryPolicy) -> Duration {
    let next_ms = (current.as_millis() as f64 * policy.multiplier) as u64;
    Duration::from_millis(next_ms).min(policy.max_delay)
}

/// Fixed-interval polling of an asynchronous provider task.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// `None` polls until a terminal state or cancellation.
    pub max_attempts: Option<u32>,
}

impl PollPolicy {
    /// DashScope image tasks: every 2s, at most 60 polls.
    pub fn image() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: Some(60),
        }
    }

    /// ClipCraft and Wan video jobs: every 3s, unbounded.
    pub fn video() -> Self {
        Self {
            interval: Duration::from_secs(3),
            max_attempts: None,
        }
    }
}
