//! Tavily web search client
//!
//! Implements [`WebSearch`] over the Tavily Search API (`POST /search` with a
//! Bearer key). HTTP failures are typed as [`TavilyError`] and mapped into
//! [`CollaboratorError::Unavailable`], retryable for timeouts, connection
//! failures, rate limits and server errors.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{WebDocument, WebSearch};
use crate::error::CollaboratorError;

/// Default Tavily endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.tavily.com";

/// Default timeout for Tavily API requests
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Tavily rejects larger result counts
const MAX_RESULTS_LIMIT: usize = 20;

/// Typed errors for the Tavily API
#[derive(Debug, thiserror::Error)]
pub enum TavilyError {
    #[error("TAVILY_API_KEY environment variable not set")]
    MissingApiKey,

    #[error("Request timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unauthorized - check API key")]
    Unauthorized,

    #[error("Rate limited - too many requests")]
    RateLimited,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Server error ({0}): {1}")]
    ServerError(u16, String),

    #[error("HTTP error ({0}): {1}")]
    HttpError(u16, String),

    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

impl TavilyError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TavilyError::Timeout
                | TavilyError::Connection(_)
                | TavilyError::RateLimited
                | TavilyError::ServerError(_, _)
        )
    }

    fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TavilyError::Timeout
        } else if e.is_connect() {
            TavilyError::Connection(e.to_string())
        } else {
            TavilyError::Network(e.to_string())
        }
    }

    fn from_status(status: u16, body: String) -> Self {
        match status {
            401 => TavilyError::Unauthorized,
            429 => TavilyError::RateLimited,
            400 => TavilyError::BadRequest(body),
            500..=599 => TavilyError::ServerError(status, body),
            _ => TavilyError::HttpError(status, body),
        }
    }
}

impl From<TavilyError> for CollaboratorError {
    fn from(e: TavilyError) -> Self {
        let message = format!("Tavily API error: {}", e);
        let err = if e.is_retryable() {
            CollaboratorError::unavailable("tavily", message)
        } else {
            CollaboratorError::permanent("tavily", message)
        };
        err.with_source(e)
    }
}

/// Request body for the Tavily API
#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    max_results: usize,
    search_depth: &'static str,
    include_answer: bool,
}

/// Response from the Tavily API
#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    url: String,
    #[serde(default)]
    content: String,
}

/// Tavily-backed [`WebSearch`]
///
/// # Example
/// ```ignore
/// let search = TavilySearch::from_env()?;
/// let docs = search.search("chronic cough treatment guidelines", 2).await?;
/// ```
#[derive(Clone)]
pub struct TavilySearch {
    api_key: String,
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl TavilySearch {
    /// Create a new client with the given API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            client: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Create from environment variable TAVILY_API_KEY
    pub fn from_env() -> Result<Self, TavilyError> {
        let api_key = std::env::var("TAVILY_API_KEY").map_err(|_| TavilyError::MissingApiKey)?;
        Ok(Self::new(api_key))
    }

    /// Point the client at another endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set custom timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Execute a single search request
    async fn execute(&self, query: &str, max_results: usize) -> Result<Vec<WebDocument>, TavilyError> {
        let request = TavilyRequest {
            query,
            max_results,
            search_depth: "basic",
            include_answer: false,
        };

        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(TavilyError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(TavilyError::from_status(status.as_u16(), error_text));
        }

        let body: TavilyResponse = response
            .json()
            .await
            .map_err(|e| TavilyError::ParseError(e.to_string()))?;

        Ok(body
            .results
            .into_iter()
            .take(max_results)
            .map(|r| WebDocument::new(r.url, r.content))
            .collect())
    }
}

impl std::fmt::Debug for TavilySearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TavilySearch")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl WebSearch for TavilySearch {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<WebDocument>, CollaboratorError> {
        if max_results == 0 {
            return Ok(Vec::new());
        }
        let max_results = max_results.min(MAX_RESULTS_LIMIT);
        debug!(query = %query, max_results, "Tavily search");

        let documents = self.execute(query, max_results).await?;
        debug!(query = %query, count = documents.len(), "Tavily search completed");
        Ok(documents)
    }

    fn name(&self) -> &str {
        "tavily"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tavily_error_retryable() {
        assert!(TavilyError::Timeout.is_retryable());
        assert!(TavilyError::RateLimited.is_retryable());
        assert!(TavilyError::ServerError(500, "".to_string()).is_retryable());
        assert!(TavilyError::Connection("failed".to_string()).is_retryable());

        assert!(!TavilyError::Unauthorized.is_retryable());
        assert!(!TavilyError::BadRequest("invalid".to_string()).is_retryable());
        assert!(!TavilyError::MissingApiKey.is_retryable());
    }

    #[test]
    fn test_tavily_error_to_collaborator_error() {
        let error: CollaboratorError = TavilyError::RateLimited.into();
        assert!(error.is_retryable());
        assert!(error.to_string().contains("Rate limited"));

        let error: CollaboratorError = TavilyError::Unauthorized.into();
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_builder_pattern() {
        let search = TavilySearch::new("test-key")
            .with_base_url("http://localhost:9999/")
            .with_timeout(Duration::from_secs(60));

        assert_eq!(search.base_url, "http://localhost:9999");
        assert_eq!(search.timeout, Duration::from_secs(60));
    }
}
