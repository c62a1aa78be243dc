//! Retrying wrappers for retrieval collaborators

use async_trait::async_trait;

use super::{EncyclopediaDocument, EncyclopediaLookup, WebDocument, WebSearch};
use crate::error::CollaboratorError;
use crate::retry::{retry_with_policy, RetryPolicy};

/// Repeats retryable `search` failures according to a [`RetryPolicy`]
pub struct RetryingWebSearch<W> {
    inner: W,
    policy: RetryPolicy,
}

impl<W: WebSearch> RetryingWebSearch<W> {
    pub fn new(inner: W, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &W {
        &self.inner
    }
}

#[async_trait]
impl<W: WebSearch> WebSearch for RetryingWebSearch<W> {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<WebDocument>, CollaboratorError> {
        let inner = &self.inner;
        retry_with_policy(&self.policy, inner.name(), move || {
            inner.search(query, max_results)
        })
        .await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

/// Repeats retryable `lookup` failures according to a [`RetryPolicy`]
pub struct RetryingEncyclopedia<E> {
    inner: E,
    policy: RetryPolicy,
}

impl<E: EncyclopediaLookup> RetryingEncyclopedia<E> {
    pub fn new(inner: E, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }
}

#[async_trait]
impl<E: EncyclopediaLookup> EncyclopediaLookup for RetryingEncyclopedia<E> {
    async fn lookup(
        &self,
        query: &str,
        max_docs: usize,
    ) -> Result<Vec<EncyclopediaDocument>, CollaboratorError> {
        let inner = &self.inner;
        retry_with_policy(&self.policy, inner.name(), move || {
            inner.lookup(query, max_docs)
        })
        .await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn fast_policy(max_retries: usize) -> RetryPolicy {
        RetryPolicy::new(max_retries)
            .with_backoff_base(Duration::from_millis(1))
            .with_backoff_max(Duration::from_millis(2))
    }

    struct FlakySearch {
        failures: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl WebSearch for FlakySearch {
        async fn search(
            &self,
            query: &str,
            _max_results: usize,
        ) -> Result<Vec<WebDocument>, CollaboratorError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
                return Err(CollaboratorError::unavailable("flaky-web", "502"));
            }
            Ok(vec![WebDocument::new("https://example.org", query)])
        }
    }

    struct RefusingLookup {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EncyclopediaLookup for RefusingLookup {
        async fn lookup(
            &self,
            _query: &str,
            _max_docs: usize,
        ) -> Result<Vec<EncyclopediaDocument>, CollaboratorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(CollaboratorError::permanent("refusing", "403"))
        }
    }

    #[tokio::test]
    async fn test_web_search_retries_until_success() {
        let search = RetryingWebSearch::new(
            FlakySearch {
                failures: 2,
                calls: AtomicUsize::new(0),
            },
            fast_policy(3),
        );

        let docs = search.search("cough", 2).await.unwrap();
        assert_eq!(docs[0].content, "cough");
        assert_eq!(search.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_web_search_gives_up_after_policy() {
        let search = RetryingWebSearch::new(
            FlakySearch {
                failures: 10,
                calls: AtomicUsize::new(0),
            },
            fast_policy(1),
        );

        assert!(search.search("cough", 2).await.is_err());
        assert_eq!(search.inner().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_permanent_lookup_failure_is_not_retried() {
        let lookup = RetryingEncyclopedia::new(
            RefusingLookup {
                calls: AtomicUsize::new(0),
            },
            fast_policy(5),
        );

        let err = lookup.lookup("cough", 3).await.unwrap_err();
        assert!(!err.is_retryable());
        assert_eq!(lookup.inner().calls.load(Ordering::SeqCst), 1);
        assert_eq!(lookup.name(), "encyclopedia");
    }
}
