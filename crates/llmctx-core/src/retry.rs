//! Fixed-count retry for transient remote failures.
//!
//! Only errors that report themselves as [`Transient`] are retried. Every
//! other error ends the call on the attempt that produced it.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Classifies an error as worth retrying.
pub trait Transient {
    /// `true` when the remote side signalled a temporary condition
    /// (e.g. "service unavailable").
    fn is_transient(&self) -> bool;
}

/// How many times to attempt a call and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Values below 1 act as 1.
    pub max_attempts: u32,
    /// Fixed wait between consecutive attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

/// The last error of a call, with the number of attempts made.
#[derive(Debug)]
pub struct RetryError<E> {
    pub attempts: u32,
    pub source: E,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Run `op` until it succeeds, fails permanently, or runs out of attempts.
    ///
    /// `call` names the operation in log output. The wait between attempts
    /// suspends the task rather than blocking the thread.
    pub async fn run<T, E, F, Fut>(&self, call: &str, mut op: F) -> Result<T, RetryError<E>>
    where
        E: Transient + std::fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    warn!(
                        call,
                        attempt,
                        max_attempts,
                        delay_ms = self.delay.as_millis() as u64,
                        error = %err,
                        "Service unavailable, retrying"
                    );
                    tokio::time::sleep(self.delay).await;
                }
                Err(err) => {
                    return Err(RetryError {
                        attempts: attempt,
                        source: err,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, PartialEq)]
    enum FakeError {
        Busy,
        Broken,
    }

    impl std::fmt::Display for FakeError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{self:?}")
        }
    }

    impl Transient for FakeError {
        fn is_transient(&self) -> bool {
            matches!(self, FakeError::Busy)
        }
    }

    fn quick(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::ZERO)
    }

    /// Fails with `Busy` for the first `busy` calls, then succeeds.
    async fn busy_then_ok(calls: &AtomicU32, busy: u32) -> Result<&'static str, FakeError> {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        if n < busy {
            Err(FakeError::Busy)
        } else {
            Ok("done")
        }
    }

    #[tokio::test]
    async fn test_succeeds_after_k_busy_responses() {
        for k in 0..3 {
            let calls = AtomicU32::new(0);
            let result = quick(3).run("op", || busy_then_ok(&calls, k)).await;
            assert_eq!(result.unwrap(), "done");
            assert_eq!(calls.load(Ordering::SeqCst), k + 1);
        }
    }

    #[test_log::test(tokio::test)]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let err = quick(3)
            .run("op", || busy_then_ok(&calls, u32::MAX))
            .await
            .unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(err.attempts, 3);
        assert_eq!(err.source, FakeError::Busy);
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let err = quick(3)
            .run("op", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(FakeError::Broken)
            })
            .await
            .unwrap_err();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(err.attempts, 1);
        assert_eq!(err.source, FakeError::Broken);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_calls_once() {
        let calls = AtomicU32::new(0);
        let result = quick(0).run("op", || busy_then_ok(&calls, 0)).await;
        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_waits_between_attempts() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(2, Duration::from_millis(20));
        let started = std::time::Instant::now();
        policy.run("op", || busy_then_ok(&calls, 1)).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay, Duration::from_secs(2));
    }
}
