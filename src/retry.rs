use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Bounded retry with exponential backoff. `retries == 0` is fail-fast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: usize,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Upper bound for a single attempt.
    pub attempt_timeout: Option<Duration>,
}

impl RetryPolicy {
    pub fn fail_fast() -> Self {
        Self {
            retries: 0,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
            attempt_timeout: None,
        }
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }

    fn backoff_for(&self, attempt: usize) -> Duration {
        let factor = 1u32
            .checked_shl(attempt.saturating_sub(1).min(16) as u32)
            .unwrap_or(u32::MAX);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fail_fast()
    }
}

#[derive(Debug, thiserror::Error)]
#[error("operation cancelled")]
pub struct Cancelled;

pub fn is_cancelled(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| cause.is::<Cancelled>())
}

/// Runs `op` until it succeeds, the policy is exhausted, or `cancel` fires.
pub async fn run<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    label: &str,
    mut op: F,
) -> anyhow::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let attempts = policy.retries.saturating_add(1);
    let mut attempt = 0usize;

    loop {
        attempt += 1;
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Cancelled.into()),
            result = bounded(policy.attempt_timeout, op()) => result,
        };

        let err = match result {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if attempt >= attempts {
            return Err(err.context(format!("{label} failed after {attempt} attempt(s)")));
        }

        let backoff = policy.backoff_for(attempt);
        tracing::warn!(
            label,
            attempt,
            attempts,
            backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
            error = %format!("{err:#}"),
            "attempt failed; retrying"
        );
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Cancelled.into()),
            _ = tokio::time::sleep(backoff) => {}
        }
    }
}

async fn bounded<T, Fut>(limit: Option<Duration>, fut: Fut) -> anyhow::Result<T>
where
    Fut: Future<Output = anyhow::Result<T>>,
{
    let Some(limit) = limit else {
        return fut.await;
    };
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => anyhow::bail!("timed out after {}ms", limit.as_millis()),
    }
}
