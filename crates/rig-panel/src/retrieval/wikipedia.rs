//! Wikipedia encyclopedia client
//!
//! Implements [`EncyclopediaLookup`] over the MediaWiki action API: a search
//! generator picks the top articles and `prop=extracts` returns their plain
//! text in one round trip. The article URL becomes the document's source id
//! and the title its page.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{EncyclopediaDocument, EncyclopediaLookup};
use crate::error::CollaboratorError;

/// Wikipedia asks API clients to identify themselves
const USER_AGENT: &str = concat!("rig-panel/", env!("CARGO_PKG_VERSION"));

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Upper bound on article text kept per document, in characters
pub const DEFAULT_MAX_CHARS: usize = 4000;

/// The API caps extracts per request
const MAX_DOCS_LIMIT: usize = 20;

/// Typed errors for the MediaWiki API
#[derive(Debug, thiserror::Error)]
pub enum WikipediaError {
    #[error("Request timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limited - too many requests")]
    RateLimited,

    #[error("Server error ({0}): {1}")]
    ServerError(u16, String),

    #[error("HTTP error ({0}): {1}")]
    HttpError(u16, String),

    #[error("API error {code}: {info}")]
    Api { code: String, info: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

impl WikipediaError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WikipediaError::Timeout
                | WikipediaError::Connection(_)
                | WikipediaError::RateLimited
                | WikipediaError::ServerError(_, _)
        )
    }

    fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            WikipediaError::Timeout
        } else if e.is_connect() {
            WikipediaError::Connection(e.to_string())
        } else {
            WikipediaError::Network(e.to_string())
        }
    }
}

impl From<WikipediaError> for CollaboratorError {
    fn from(e: WikipediaError) -> Self {
        let message = format!("Wikipedia API error: {}", e);
        let err = if e.is_retryable() {
            CollaboratorError::unavailable("wikipedia", message)
        } else {
            CollaboratorError::permanent("wikipedia", message)
        };
        err.with_source(e)
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    query: Option<QueryPages>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct QueryPages {
    #[serde(default)]
    pages: Vec<Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    title: String,
    /// Search rank; pages come back keyed by id, not in rank order
    #[serde(default)]
    index: u32,
    #[serde(default)]
    extract: Option<String>,
    #[serde(default)]
    fullurl: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    #[serde(default)]
    info: String,
}

/// Wikipedia-backed [`EncyclopediaLookup`]
#[derive(Debug, Clone)]
pub struct WikipediaLookup {
    client: Client,
    language: String,
    base_url: String,
    max_chars: usize,
    timeout: Duration,
}

impl Default for WikipediaLookup {
    fn default() -> Self {
        Self::new("en")
    }
}

impl WikipediaLookup {
    /// Create a client for the Wikipedia of `language` (e.g. `"en"`)
    pub fn new(language: impl Into<String>) -> Self {
        let language = language.into();
        Self {
            client: Client::new(),
            base_url: format!("https://{}.wikipedia.org", language),
            language,
            max_chars: DEFAULT_MAX_CHARS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Point the client at another MediaWiki host
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Truncate article text to at most `max_chars` characters
    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    /// Set custom timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    async fn execute(
        &self,
        query: &str,
        max_docs: usize,
    ) -> Result<Vec<EncyclopediaDocument>, WikipediaError> {
        let limit = max_docs.to_string();
        let params = [
            ("action", "query"),
            ("format", "json"),
            ("formatversion", "2"),
            ("generator", "search"),
            ("gsrsearch", query),
            ("gsrlimit", limit.as_str()),
            ("prop", "extracts|info"),
            ("inprop", "url"),
            ("explaintext", "1"),
            ("exlimit", "max"),
        ];

        let response = self
            .client
            .get(format!("{}/w/api.php", self.base_url))
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .query(&params)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(WikipediaError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                429 => WikipediaError::RateLimited,
                code @ 500..=599 => WikipediaError::ServerError(code, error_text),
                code => WikipediaError::HttpError(code, error_text),
            });
        }

        let body: QueryResponse = response
            .json()
            .await
            .map_err(|e| WikipediaError::ParseError(e.to_string()))?;

        if let Some(error) = body.error {
            return Err(WikipediaError::Api {
                code: error.code,
                info: error.info,
            });
        }

        let mut pages = body.query.map(|q| q.pages).unwrap_or_default();
        pages.sort_by_key(|page| page.index);

        Ok(pages
            .into_iter()
            .take(max_docs)
            .map(|page| self.to_document(page))
            .collect())
    }

    fn to_document(&self, page: Page) -> EncyclopediaDocument {
        let source = page.fullurl.unwrap_or_else(|| self.article_url(&page.title));
        let content = truncate_chars(page.extract.as_deref().unwrap_or(""), self.max_chars);
        EncyclopediaDocument::new(source, content).with_page(page.title)
    }

    fn article_url(&self, title: &str) -> String {
        format!(
            "https://{}.wikipedia.org/wiki/{}",
            self.language,
            urlencoding::encode(&title.replace(' ', "_"))
        )
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[async_trait]
impl EncyclopediaLookup for WikipediaLookup {
    async fn lookup(
        &self,
        query: &str,
        max_docs: usize,
    ) -> Result<Vec<EncyclopediaDocument>, CollaboratorError> {
        if max_docs == 0 || query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let max_docs = max_docs.min(MAX_DOCS_LIMIT);
        debug!(query = %query, max_docs, language = %self.language, "Wikipedia lookup");

        let documents = self.execute(query, max_docs).await?;
        debug!(query = %query, count = documents.len(), "Wikipedia lookup completed");
        Ok(documents)
    }

    fn name(&self) -> &str {
        "wikipedia"
    }
}
