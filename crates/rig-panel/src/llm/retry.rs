//! Retrying wrapper for reasoning collaborators

use async_trait::async_trait;

use super::config::LLMConfig;
use super::provider::{LLMProvider, LLMResponse};
use crate::error::CollaboratorError;
use crate::message::Message;
use crate::retry::{retry_with_policy, RetryPolicy};

/// Repeats retryable `complete` failures according to a [`RetryPolicy`]
pub struct RetryingProvider<P> {
    inner: P,
    policy: RetryPolicy,
}

impl<P: LLMProvider> RetryingProvider<P> {
    pub fn new(inner: P, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

#[async_trait]
impl<P: LLMProvider> LLMProvider for RetryingProvider<P> {
    async fn complete(
        &self,
        messages: &[Message],
        config: Option<&LLMConfig>,
    ) -> Result<LLMResponse, CollaboratorError> {
        let inner = &self.inner;
        retry_with_policy(&self.policy, inner.name(), move || {
            inner.complete(messages, config)
        })
        .await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn default_model(&self) -> &str {
        self.inner.default_model()
    }
}
