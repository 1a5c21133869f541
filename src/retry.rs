use std::{future::Future, num::NonZeroUsize, time::Duration};

use kube::Error as KubeError;
use tokio::time::sleep;

/// Retry policy applied to each discovery request.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of attempts including the first call.
    pub max_attempts: NonZeroUsize,
    /// Wait before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound for the exponential backoff.
    pub max_backoff: Duration,
    /// Error classifier for retry decisions.
    pub is_retryable: fn(&KubeError) -> bool,
}

impl RetryPolicy {
    /// A policy that sends every request exactly once.
    pub fn no_retry() -> Self {
        Self::default().with_max_attempts(NonZeroUsize::MIN)
    }

    pub fn with_max_attempts(mut self, max_attempts: NonZeroUsize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_initial_backoff(mut self, initial_backoff: Duration) -> Self {
        self.initial_backoff = initial_backoff;
        self
    }

    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    pub fn with_retryable(mut self, is_retryable: fn(&KubeError) -> bool) -> Self {
        self.is_retryable = is_retryable;
        self
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: NonZeroUsize::new(3).unwrap_or(NonZeroUsize::MIN),
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(2),
            is_retryable: is_transient,
        }
    }
}

/// Retries `408`, `429` and `5xx` API responses and any transport failure.
/// Other API errors (forbidden, not found, ...) are returned immediately.
pub fn is_transient(error: &KubeError) -> bool {
    match error {
        KubeError::Api(response) => matches!(response.code, 408 | 429 | 500..=599),
        _ => true,
    }
}

/// Runs `operation` until it succeeds, fails with a non-retryable error, or
/// runs out of attempts. The backoff doubles after every failed attempt.
pub async fn retry_with_policy<T, F, Fut>(
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, KubeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, KubeError>>,
{
    let mut backoff = policy.initial_backoff.min(policy.max_backoff);
    let mut attempt = 1usize;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) if attempt < policy.max_attempts.get() && (policy.is_retryable)(&error) => {
                tracing::debug!(%error, attempt, ?backoff, "retrying discovery request");
                sleep(backoff).await;
                backoff = backoff.saturating_mul(2).min(policy.max_backoff);
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}
