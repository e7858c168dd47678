//! Bounded polled waiting.
//!
//! Every wait in this crate is bounded: a predicate is polled at a fixed
//! interval until it holds or the timeout elapses, surfacing as
//! [`TeclearError::Timeout`]. Fixed sleeps are deliberately not offered.

use std::future::Future;
use std::time::{Duration, Instant};

use crate::result::{TeclearError, TeclearResult};

/// Default timeout for wait operations (8 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 8000;

/// Default polling interval (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Options for wait operations
#[derive(Debug, Clone, Copy)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Result of a successful wait
#[derive(Debug, Clone)]
pub struct WaitOutcome {
    /// Time spent waiting
    pub elapsed: Duration,
    /// Description of what was waited for
    pub waited_for: String,
}

/// Poll a synchronous predicate until it holds or the timeout elapses
pub async fn wait_until<F>(
    predicate: F,
    description: &str,
    options: &WaitOptions,
) -> TeclearResult<WaitOutcome>
where
    F: Fn() -> bool,
{
    let start = Instant::now();
    loop {
        if predicate() {
            return Ok(WaitOutcome {
                elapsed: start.elapsed(),
                waited_for: description.to_string(),
            });
        }
        if start.elapsed() >= options.timeout() {
            tracing::debug!(waited_for = description, "wait timed out");
            return Err(TeclearError::Timeout {
                ms: options.timeout_ms,
            });
        }
        tokio::time::sleep(options.poll_interval()).await;
    }
}

/// Poll an asynchronous fallible probe until it reports true
pub async fn wait_until_async<F, Fut>(
    mut probe: F,
    description: &str,
    options: &WaitOptions,
) -> TeclearResult<WaitOutcome>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = TeclearResult<bool>>,
{
    let start = Instant::now();
    loop {
        if probe().await? {
            return Ok(WaitOutcome {
                elapsed: start.elapsed(),
                waited_for: description.to_string(),
            });
        }
        if start.elapsed() >= options.timeout() {
            tracing::debug!(waited_for = description, "wait timed out");
            return Err(TeclearError::Timeout {
                ms: options.timeout_ms,
            });
        }
        tokio::time::sleep(options.poll_interval()).await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    mod wait_options_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let opts = WaitOptions::default();
            assert_eq!(opts.timeout_ms, DEFAULT_WAIT_TIMEOUT_MS);
            assert_eq!(opts.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
        }

        #[test]
        fn test_chained() {
            let opts = WaitOptions::new().with_timeout(200).with_poll_interval(10);
            assert_eq!(opts.timeout(), Duration::from_millis(200));
            assert_eq!(opts.poll_interval(), Duration::from_millis(10));
        }
    }

    mod wait_until_tests {
        use super::*;

        #[tokio::test]
        async fn test_immediate_success() {
            let opts = WaitOptions::new().with_timeout(100);
            let outcome = wait_until(|| true, "always true", &opts).await.unwrap();
            assert_eq!(outcome.waited_for, "always true");
        }

        #[tokio::test]
        async fn test_timeout_surfaces() {
            let opts = WaitOptions::new().with_timeout(80).with_poll_interval(10);
            let result = wait_until(|| false, "never", &opts).await;
            match result {
                Err(TeclearError::Timeout { ms }) => assert_eq!(ms, 80),
                other => panic!("expected Timeout, got {other:?}"),
            }
        }

        #[tokio::test]
        async fn test_condition_becoming_true() {
            let flag = Arc::new(AtomicBool::new(false));
            let writer = flag.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(30)).await;
                writer.store(true, Ordering::SeqCst);
            });

            let opts = WaitOptions::new().with_timeout(500).with_poll_interval(10);
            let outcome = wait_until(|| flag.load(Ordering::SeqCst), "flag set", &opts)
                .await
                .unwrap();
            assert!(outcome.elapsed >= Duration::from_millis(25));
        }

        #[tokio::test]
        async fn test_async_probe_propagates_errors() {
            let opts = WaitOptions::new().with_timeout(100);
            let result = wait_until_async(
                || async { Err::<bool, _>(TeclearError::assertion("probe broke")) },
                "broken probe",
                &opts,
            )
            .await;
            assert!(matches!(result, Err(TeclearError::AssertionFailed { .. })));
        }
    }
}
