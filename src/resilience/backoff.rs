//! Fixed-delay reconnect loop for startup dependencies.
//!
//! # Responsibilities
//! - Retry a fallible connection attempt until it succeeds
//! - Log every failed attempt with its attempt number
//! - Optionally give up after a configured number of attempts
//!
//! # Design Decisions
//! - Fixed delay, no jitter: a single process reconnecting to its own database
//! - Unbounded by default; the cap exists for tests and bounded deployments

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::observability::metrics;

/// Returned only when a cap is configured and every attempt failed.
#[derive(Debug, thiserror::Error)]
#[error("gave up after {attempts} attempts: {last_error}")]
pub struct BackoffError<E> {
    pub attempts: u32,
    pub last_error: E,
}

/// Retry policy for opening a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffConnector {
    delay: Duration,
    max_attempts: Option<u32>,
}

impl BackoffConnector {
    /// Retry forever, sleeping `delay` between attempts.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            max_attempts: None,
        }
    }

    /// Stop after `max_attempts` attempts. `None` restores unbounded retries.
    pub fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Run `attempt` until it yields a value.
    ///
    /// Without a cap this never returns an error.
    pub async fn connect<T, E, F, Fut>(&self, mut attempt: F) -> Result<T, BackoffError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempts: u32 = 0;
        loop {
            attempts = attempts.saturating_add(1);
            metrics::record_connect_attempt();

            let error = match attempt().await {
                Ok(handle) => {
                    if attempts > 1 {
                        tracing::info!(attempts, "Storage connection established after retries");
                    }
                    return Ok(handle);
                }
                Err(e) => e,
            };

            if self.max_attempts.is_some_and(|max| attempts >= max) {
                tracing::error!(attempts, error = %error, "Storage connection attempts exhausted");
                return Err(BackoffError {
                    attempts,
                    last_error: error,
                });
            }

            tracing::warn!(
                attempt = attempts,
                error = %error,
                retry_in = ?self.delay,
                "Storage connection failed, retrying"
            );
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    fn flaky(failures: u32, calls: Arc<AtomicU32>) -> impl FnMut() -> std::future::Ready<Result<u32, String>> {
        move || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            std::future::ready(if n <= failures {
                Err(format!("connection refused ({n})"))
            } else {
                Ok(n)
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_success() {
        for failures in [0u32, 1, 4] {
            let calls = Arc::new(AtomicU32::new(0));
            let connector = BackoffConnector::new(Duration::from_secs(2));

            let started = Instant::now();
            let handle = connector.connect(flaky(failures, calls.clone())).await.unwrap();

            assert_eq!(calls.load(Ordering::SeqCst), failures + 1);
            assert_eq!(handle, failures + 1, "handle comes from the last attempt");
            assert_eq!(started.elapsed(), Duration::from_secs(2) * failures);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_at_cap() {
        let calls = Arc::new(AtomicU32::new(0));
        let connector = BackoffConnector::new(Duration::from_secs(1)).with_max_attempts(Some(3));

        let started = Instant::now();
        let err = connector.connect(flaky(10, calls.clone())).await.unwrap_err();

        assert_eq!(err.attempts, 3);
        assert_eq!(err.last_error, "connection refused (3)");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // No sleep after the final attempt.
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }
}
