//! Per-host politeness delay and exponential backoff retry, shared by
//! every adapter kind. A reusable rate-limiting primitive every adapter
//! can hold one of.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// A single-host rate limiter enforcing a minimum interval between calls.
/// Not a true token bucket (no burst credit) — deliberately simple, since
/// the politeness requirement is "at least N ms since the last call", not
/// a throughput cap.
pub struct RateLimiter {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    /// Blocks until at least `min_interval` has elapsed since the previous
    /// call to `acquire` on this limiter, then records the new call time.
    pub async fn acquire(&self) {
        let mut last = self.last_call.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                debug!(?wait, "rate limiter sleeping");
                tokio::time::sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Retries `f` with exponential backoff (`base_delay * 2^attempt`) up to
/// `max_retries` additional attempts after the first, returning the last
/// error if every attempt fails. Transient vs. permanent failure
/// classification is the caller's job — this helper just retries.
pub async fn retry_with_backoff<F, Fut, T>(
    mut f: F,
    max_retries: u32,
    base_delay: Duration,
) -> anyhow::Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = anyhow::Result<T>>,
{
    let mut attempt = 0u32;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= max_retries {
                    return Err(err);
                }
                let delay = base_delay * 2u32.pow(attempt);
                debug!(attempt, ?delay, error = %err, "retrying after backoff");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn rate_limiter_delays_second_call() {
        let limiter = RateLimiter::new(Duration::from_millis(50));
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(45));
    }

    #[tokio::test]
    async fn retry_succeeds_after_transient_failures() {
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();
        let result = retry_with_backoff(
            move || {
                let attempts = attempts_clone.clone();
                async move {
                    let n = attempts.fetch_add(1, Ordering::SeqCst);
                    if n < 2 {
                        anyhow::bail!("not yet");
                    }
                    Ok(42)
                }
            },
            5,
            Duration::from_millis(1),
        )
        .await
        .unwrap();
        assert_eq!(result, 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_gives_up_after_max_retries() {
        let result: anyhow::Result<()> =
            retry_with_backoff(|| async { anyhow::bail!("always fails") }, 2, Duration::from_millis(1))
                .await;
        assert!(result.is_err());
    }
}
