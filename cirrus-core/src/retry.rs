//! Retry - Bounded apply loop and status polling
//!
//! Every mutating remote call is wrapped in [`retry`], which keeps calling the
//! operation until it succeeds, fails with a non-retryable error, or the time
//! budget runs out. [`wait_for_status`] builds the mutate-then-poll pattern on
//! top of the same driver.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::config::RetryConfig;
use crate::provider::{ErrorKind, ProviderError, ProviderResult};

/// Outcome of a single attempt
#[derive(Debug)]
pub enum Attempt<T> {
    /// Terminal success
    Done(T),
    /// Transient failure, try again while budget remains
    Retry(ProviderError),
    /// Permanent failure, stop immediately
    Fatal(ProviderError),
}

impl<T> Attempt<T> {
    pub fn retry(message: impl Into<String>) -> Self {
        Attempt::Retry(ProviderError::new(ErrorKind::Timeout, message))
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Attempt::Fatal(ProviderError::new(ErrorKind::Api, message))
    }
}

/// Exponential backoff between attempts
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    pub min_interval: Duration,
    pub max_interval: Duration,
}

impl Backoff {
    pub fn new(min_interval: Duration, max_interval: Duration) -> Self {
        Self {
            min_interval,
            max_interval: max_interval.max(min_interval),
        }
    }

    /// Delay before the attempt following attempt number `attempt` (1-based)
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.min_interval
            .saturating_mul(factor)
            .min(self.max_interval)
    }
}

impl From<&RetryConfig> for Backoff {
    fn from(config: &RetryConfig) -> Self {
        Backoff::new(config.min_interval, config.max_interval)
    }
}

/// Run `op` until it returns `Done` or `Fatal`, or until `timeout` elapses.
///
/// On timeout the last retryable error is returned as a `Timeout` error.
pub async fn retry<T, F, Fut>(backoff: Backoff, timeout: Duration, mut op: F) -> ProviderResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Attempt<T>>,
{
    let deadline = Instant::now() + timeout;
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match op().await {
            Attempt::Done(value) => return Ok(value),
            Attempt::Fatal(err) => return Err(err),
            Attempt::Retry(err) => {
                let now = Instant::now();
                if now >= deadline {
                    log::error!(
                        "[CRITICAL] giving up after {} attempts in {:?}: {}",
                        attempt,
                        timeout,
                        err
                    );
                    let message = format!("timeout after {:?}: {}", timeout, err.message);
                    let mut timed_out = ProviderError::new(ErrorKind::Timeout, message);
                    timed_out.resource_id = err.resource_id.clone();
                    return Err(timed_out.with_cause(err));
                }
                let delay = backoff.delay(attempt).min(deadline - now);
                log::debug!(
                    "attempt {} failed, retrying in {:?}: {}",
                    attempt,
                    delay,
                    err
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Status sets for a poll-to-terminal loop
#[derive(Debug, Clone, Default)]
pub struct StatusWait {
    /// Statuses that mean "keep waiting"; any other non-target status also waits
    pub pending: Vec<String>,
    /// Statuses that end the wait successfully
    pub target: Vec<String>,
    /// Statuses that end the wait with an error
    pub failed: Vec<String>,
}

impl StatusWait {
    pub fn until<I, S>(target: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            target: target.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn pending<I, S>(mut self, pending: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pending = pending.into_iter().map(Into::into).collect();
        self
    }

    pub fn failing_on<I, S>(mut self, failed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.failed = failed.into_iter().map(Into::into).collect();
        self
    }

    fn judge(&self, status: &str) -> Attempt<String> {
        if self.target.iter().any(|s| s == status) {
            Attempt::Done(status.to_string())
        } else if self.failed.iter().any(|s| s == status) {
            Attempt::fatal(format!("reached failure status `{}`", status))
        } else if self.pending.is_empty() || self.pending.iter().any(|s| s == status) {
            Attempt::retry(format!("still pending, status `{}`", status))
        } else {
            Attempt::retry(format!("unexpected status `{}`, still waiting", status))
        }
    }
}

/// Poll `refresh` until it reports a target status.
///
/// Each call to `refresh` is a single attempt: `Done(Some(status))` is judged
/// against `wait`, `Done(None)` means the object is not visible yet, and a
/// classified error either retries within the same budget or aborts.
pub async fn wait_for_status<F, Fut>(
    backoff: Backoff,
    timeout: Duration,
    wait: &StatusWait,
    mut refresh: F,
) -> ProviderResult<String>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Attempt<Option<String>>>,
{
    retry(backoff, timeout, || {
        let fut = refresh();
        async move {
            match fut.await {
                Attempt::Done(Some(status)) => wait.judge(&status),
                Attempt::Done(None) => Attempt::retry("object not visible yet"),
                Attempt::Retry(e) => Attempt::Retry(e),
                Attempt::Fatal(e) => Attempt::Fatal(e),
            }
        }
    })
    .await
}

/// Poll `exists` until it reports the object is gone
pub async fn wait_until_gone<F, Fut>(
    backoff: Backoff,
    timeout: Duration,
    mut exists: F,
) -> ProviderResult<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Attempt<bool>>,
{
    retry(backoff, timeout, || {
        let fut = exists();
        async move {
            match fut.await {
                Attempt::Done(false) => Attempt::Done(()),
                Attempt::Done(true) => Attempt::retry("object still exists"),
                Attempt::Retry(e) => Attempt::Retry(e),
                Attempt::Fatal(e) => Attempt::Fatal(e),
            }
        }
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> Backoff {
        Backoff::new(Duration::from_millis(5), Duration::from_millis(20))
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let backoff = Backoff::new(Duration::from_millis(500), Duration::from_secs(2));
        assert_eq!(backoff.delay(1), Duration::from_millis(500));
        assert_eq!(backoff.delay(2), Duration::from_secs(1));
        assert_eq!(backoff.delay(3), Duration::from_secs(2));
        assert_eq!(backoff.delay(40), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = retry(fast(), Duration::from_secs(5), || {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Attempt::retry("busy")
                } else {
                    Attempt::Done(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn always_transient_stops_at_timeout() {
        let timeout = Duration::from_millis(150);
        let started = std::time::Instant::now();

        let result: ProviderResult<()> =
            retry(fast(), timeout, || async { Attempt::retry("busy") }).await;

        let elapsed = started.elapsed();
        let err = result.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Timeout);
        assert!(elapsed >= timeout);
        assert!(elapsed < timeout + Duration::from_secs(1), "took {:?}", elapsed);
    }

    #[tokio::test]
    async fn fatal_returns_after_one_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let started = std::time::Instant::now();

        let result: ProviderResult<()> = retry(fast(), Duration::from_secs(30), || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Attempt::fatal("bad request") }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn poll_reaches_target_status() {
        let statuses = ["PENDING", "RUNNING", "SUCCEEDED"];
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let wait = StatusWait::until(["SUCCEEDED"])
            .pending(["PENDING", "RUNNING"])
            .failing_on(["FAILED"]);

        let status = wait_for_status(fast(), Duration::from_secs(5), &wait, || {
            let i = counter.fetch_add(1, Ordering::SeqCst) as usize;
            async move { Attempt::Done(Some(statuses[i.min(2)].to_string())) }
        })
        .await
        .unwrap();

        assert_eq!(status, "SUCCEEDED");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn poll_stops_on_failed_status() {
        let wait = StatusWait::until(["SUCCEEDED"]).failing_on(["FAILED"]);

        let err = wait_for_status(fast(), Duration::from_secs(5), &wait, || async {
            Attempt::Done(Some("FAILED".to_string()))
        })
        .await
        .unwrap_err();

        assert_eq!(err.kind, ErrorKind::Api);
        assert!(err.message.contains("FAILED"));
    }

    #[tokio::test]
    async fn poll_gives_up_while_pending() {
        let wait = StatusWait::until(["SUCCEEDED"]);

        let err = wait_for_status(fast(), Duration::from_millis(60), &wait, || async {
            Attempt::Done(Some("RUNNING".to_string()))
        })
        .await
        .unwrap_err();

        assert_eq!(err.kind, ErrorKind::Timeout);
        assert!(err.message.contains("still pending"));
    }

    #[tokio::test]
    async fn wait_until_gone_polls() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        wait_until_gone(fast(), Duration::from_secs(5), || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move { Attempt::Done(n < 2) }
        })
        .await
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn transient_poll_errors_share_the_budget() {
        let timeout = Duration::from_millis(120);
        let wait = StatusWait::until(["SUCCEEDED"]);
        let started = std::time::Instant::now();

        let err = wait_for_status(fast(), timeout, &wait, || async move {
            if started.elapsed() < Duration::from_millis(80) {
                Attempt::Done(Some("RUNNING".to_string()))
            } else {
                Attempt::retry("InternalError")
            }
        })
        .await
        .unwrap_err();

        assert_eq!(err.kind, ErrorKind::Timeout);
        assert!(err.message.contains("InternalError"));
        let elapsed = started.elapsed();
        assert!(elapsed < timeout + Duration::from_millis(60), "took {:?}", elapsed);
    }
}
