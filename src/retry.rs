//! Bounded retry with exponential backoff.
//!
//! Explicit combinator rather than a blanket wrapper: the commit-fetch path
//! composes `cache check -> with_backoff(fetch)` in ordinary code. PR-set
//! pagination deliberately does not use this; those failures propagate to
//! the caller, who re-invokes the whole operation.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::error::Result;

/// Run `op` up to `max_attempts` times, sleeping `base_delay * 2^attempt`
/// between attempts. Only transient errors are retried; the first
/// non-transient error and the last transient error both propagate. A
/// success on any attempt returns immediately.
pub async fn with_backoff<T, F, Fut>(
    max_attempts: u32,
    base_delay: Duration,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = max_attempts.max(1);

    for attempt in 0..max_attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_transient() => return Err(e),
            Err(e) if attempt + 1 == max_attempts => return Err(e),
            Err(e) => {
                // Exponent capped so arbitrarily large attempt counts
                // saturate instead of overflowing.
                let wait = base_delay.saturating_mul(2u32.saturating_pow(attempt.min(31)));
                warn!(
                    attempt = attempt + 1,
                    wait_ms = wait.as_millis() as u64,
                    error = %e,
                    "transient failure, backing off"
                );
                tokio::time::sleep(wait).await;
            }
        }
    }

    unreachable!("loop always returns within max_attempts iterations")
}
