//! Bounded retry with a fixed delay
//!
//! Used by producer bootstraps to ride out a broker that is still starting
//! when the service comes up.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// How many times to try, and how long to wait in between
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts including the first; 0 behaves like 1
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            delay: Duration::from_secs(3),
        }
    }
}

/// Run `operation` until it succeeds or `config.max_attempts` is used up
///
/// Sleeps `config.delay` between attempts, never after the last one, and
/// returns the last error on exhaustion.
///
/// ```rust
/// use event_bus::connect_retry::{retry_with_fixed_delay, RetryConfig};
///
/// # async fn example() -> Result<(), String> {
/// let value = retry_with_fixed_delay(
///     || async { Ok::<_, String>(42) },
///     &RetryConfig::default(),
///     "example",
/// )
/// .await?;
/// assert_eq!(value, 42);
/// # Ok(())
/// # }
/// ```
pub async fn retry_with_fixed_delay<F, Fut, T, E>(
    mut operation: F,
    config: &RetryConfig,
    context: &str,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = config.max_attempts.max(1);

    for attempt in 1..max_attempts {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(context, attempt, "Succeeded after retrying");
                }
                return Ok(value);
            }
            Err(e) => {
                tracing::warn!(
                    context,
                    attempt,
                    max_attempts,
                    retry_in_ms = config.delay.as_millis() as u64,
                    error = %e,
                    "Attempt failed"
                );
                tokio::time::sleep(config.delay).await;
            }
        }
    }

    // Final attempt; its error is returned as-is
    match operation().await {
        Ok(value) => {
            if max_attempts > 1 {
                tracing::info!(context, attempt = max_attempts, "Succeeded after retrying");
            }
            Ok(value)
        }
        Err(e) => {
            tracing::error!(context, attempts = max_attempts, error = %e, "Giving up");
            Err(e)
        }
    }
}
