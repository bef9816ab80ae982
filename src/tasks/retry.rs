//! Bounded Retry
//!
//! Fixed-delay retry for jobs whose upstream times out often enough that
//! one failure should not cost a whole scheduling period.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{CacheError, Result};

/// Retry budget for one tick of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_delay: Duration) -> Result<Self> {
        if max_attempts == 0 {
            return Err(CacheError::Configuration(
                "retry policy needs at least one attempt".to_string(),
            ));
        }
        Ok(Self {
            max_attempts,
            backoff_delay,
        })
    }
}

/// Runs `operation` until it succeeds or the attempts run out, sleeping
/// `backoff_delay` between attempts. The final failure is returned as
/// `CacheError::Job` carrying the attempt count.
pub async fn run_with_retry<F, Fut>(name: &str, policy: RetryPolicy, mut operation: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match operation().await {
            Ok(()) => return Ok(()),
            Err(e) if attempt < policy.max_attempts => {
                warn!(
                    job = name,
                    attempt,
                    max_attempts = policy.max_attempts,
                    error = %e,
                    "job attempt failed, retrying"
                );
                tokio::time::sleep(policy.backoff_delay).await;
            }
            Err(e) => {
                return Err(CacheError::Job {
                    name: name.to_string(),
                    attempts: attempt,
                    message: e.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(attempts, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_zero_attempts_rejected() {
        assert!(RetryPolicy::new(0, Duration::ZERO).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_first_try() {
        let calls = AtomicU32::new(0);

        let result = run_with_retry("job", policy(3), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_success() {
        let calls = AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let result = run_with_retry("job", policy(10), || async {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                Err(CacheError::upstream("subgraph", "timeout"))
            } else {
                Ok(())
            }
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // Two sleeps between three attempts
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(10) && elapsed < Duration::from_secs(11));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);

        let result = run_with_retry("daily-snapshot", policy(4), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(CacheError::upstream("subgraph", "timeout"))
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        match result {
            Err(CacheError::Job { name, attempts, .. }) => {
                assert_eq!(name, "daily-snapshot");
                assert_eq!(attempts, 4);
            }
            other => panic!("expected job error, got {other:?}"),
        }
    }
}
