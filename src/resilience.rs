//! Bounded retry with a fixed delay.
//!
//! [`retry`] takes the operation, a predicate deciding which errors are worth
//! another attempt, the attempt bound and the delay. Lock acquisition passes
//! [`SceneLockError::is_retryable`](crate::error::SceneLockError::is_retryable)
//! and the bound and delay of a [`RetryConfig`].
//!
//! The delay is a `tokio` sleep, so a waiting caller yields the executor and
//! never holds the lock table guard while it waits.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Retry configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts, the first one included.
    pub max_attempts: u32,
    /// Fixed delay between attempts.
    #[serde(with = "crate::config::humantime_serde")]
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_millis(100),
        }
    }
}

impl RetryConfig {
    /// Single attempt, no waiting.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            delay: Duration::ZERO,
        }
    }

    /// Quick retry configuration for short critical sections.
    pub fn quick() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(20),
        }
    }

}

/// Run `operation` until it succeeds, fails with an error that
/// `matches_retryable` rejects, or `max_attempts` attempts have failed.
///
/// Unmatched errors are returned as soon as they occur. After the last
/// attempt the last error is returned unchanged. A bound of zero is treated
/// as one attempt.
pub async fn retry<F, Fut, T, E, P>(
    mut operation: F,
    matches_retryable: P,
    max_attempts: u32,
    delay: Duration,
) -> std::result::Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if !matches_retryable(&e) => return Err(e),
            Err(e) if attempt >= max_attempts => {
                tracing::debug!(attempt, max_attempts, "Retry attempts exhausted");
                return Err(e);
            }
            Err(_) => {
                tracing::debug!(
                    attempt = attempt,
                    max_attempts = max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying after failure"
                );
                if !delay.is_zero() {
                    sleep(delay).await;
                }
            }
        }
    }
}
