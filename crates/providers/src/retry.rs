//! Whole-operation retry with exponential backoff.
//!
//! A retried operation is re-run from the start; for submit-and-poll
//! providers that means a fresh task is submitted and the previous task id is
//! abandoned (it is logged, not cancelled).

use std::fmt::Display;
use std::future::Future;

use studio_core::retry::RetryPolicy;

/// Run `op` until it succeeds or `policy.max_attempts` is exhausted.
///
/// Returns the last error when every attempt fails.
pub async fn with_retry<T, E, F, Fut>(policy: &RetryPolicy, op_name: &str, mut op: F) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0u32;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => match policy.delay_after(attempt) {
                Some(delay) => {
                    tracing::warn!(
                        op = op_name,
                        attempt = attempt + 1,
                        max_attempts = policy.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Provider call failed, retrying",
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                None => {
                    tracing::error!(
                        op = op_name,
                        attempts = attempt + 1,
                        error = %e,
                        "Provider call failed, giving up",
                    );
                    return Err(e);
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let result: Result<&str, String> = with_retry(&RetryPolicy::default(), "test", || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(format!("boom {n}"))
            } else {
                Ok("ok")
            }
        })
        .await;

        assert_eq!(result, Ok("ok"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 1s after the first failure, 2s after the second.
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn surfaces_the_last_error() {
        let calls = AtomicU32::new(0);

        let result: Result<(), String> = with_retry(&RetryPolicy::default(), "test", || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            Err(format!("failure {n}"))
        })
        .await;

        assert_eq!(result, Err("failure 2".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn single_attempt_policy_does_not_sleep() {
        let started = tokio::time::Instant::now();
        let result: Result<(), &str> =
            with_retry(&RetryPolicy::once(), "test", || async { Err("nope") }).await;
        assert_eq!(result, Err("nope"));
        assert_eq!(started.elapsed(), Duration::ZERO);
    }
}
