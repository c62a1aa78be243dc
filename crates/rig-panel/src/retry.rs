//! Retry policy for collaborator calls
//!
//! The engine never retries a failed node. Retries happen one level down, at
//! the collaborator boundary, through wrappers such as
//! [`RetryingProvider`](crate::llm::RetryingProvider) that call
//! [`retry_with_policy`].

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::CollaboratorError;

/// Exponential backoff policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum retry attempts after the first call
    pub max_retries: usize,

    /// Base delay for exponential backoff
    #[serde(with = "humantime_serde")]
    pub backoff_base: Duration,

    /// Maximum delay between retries
    #[serde(with = "humantime_serde")]
    pub backoff_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base: Duration::from_millis(1000),
            backoff_max: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Create a new retry policy
    pub fn new(max_retries: usize) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Set backoff base duration
    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    /// Set maximum backoff duration
    pub fn with_backoff_max(mut self, max: Duration) -> Self {
        self.backoff_max = max;
        self
    }

    /// Calculate delay for a given retry attempt (exponential backoff)
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        let multiplier = 2u32.saturating_pow(attempt as u32);
        let delay = self.backoff_base.saturating_mul(multiplier);
        delay.min(self.backoff_max)
    }

    /// Check if more retries are allowed
    pub fn should_retry(&self, attempts: usize) -> bool {
        attempts < self.max_retries
    }

    /// Create a no-retry policy
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }
}

/// Run `operation` until it succeeds, fails permanently, or the policy is exhausted
///
/// Only errors reporting [`CollaboratorError::is_retryable`] are repeated; parse
/// failures and permanent refusals are returned immediately.
pub async fn retry_with_policy<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut operation: F,
) -> Result<T, CollaboratorError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CollaboratorError>>,
{
    let mut retries = 0;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && policy.should_retry(retries) => {
                let delay = policy.delay_for_attempt(retries);
                warn!(
                    collaborator = label,
                    attempt = retries + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Collaborator call failed, will retry"
                );
                tokio::time::sleep(delay).await;
                retries += 1;
            }
            Err(err) => {
                debug!(collaborator = label, retries, error = %err, "Giving up on collaborator call");
                return Err(err);
            }
        }
    }
}
