//! Retrieval collaborators
//!
//! Two independent evidence sources feed the panel: a web search
//! ([`WebSearch`], backed by Tavily) and an encyclopedia lookup
//! ([`EncyclopediaLookup`], backed by Wikipedia). Both return ordered
//! documents that the retrieval nodes render into one evidence block with
//! per-document provenance.

pub mod retry;
pub mod tavily;
pub mod wikipedia;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CollaboratorError;

pub use retry::{RetryingEncyclopedia, RetryingWebSearch};
pub use tavily::{TavilyError, TavilySearch};
pub use wikipedia::{WikipediaError, WikipediaLookup};

/// Separator placed between documents inside one evidence block
pub const DOCUMENT_SEPARATOR: &str = "\n\n---\n\n";

/// A web search hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebDocument {
    pub url: String,
    pub content: String,
}

impl WebDocument {
    pub fn new(url: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            content: content.into(),
        }
    }

    /// Render with its provenance as `<Document href="..">`
    pub fn render(&self) -> String {
        format!("<Document href=\"{}\">\n{}\n</Document>", self.url, self.content)
    }
}

/// An encyclopedia article
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncyclopediaDocument {
    /// Where the article came from (the article URL for Wikipedia)
    pub source_id: String,
    /// Article title, when the source has one
    pub page: Option<String>,
    pub content: String,
}

impl EncyclopediaDocument {
    pub fn new(source_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            page: None,
            content: content.into(),
        }
    }

    pub fn with_page(mut self, page: impl Into<String>) -> Self {
        self.page = Some(page.into());
        self
    }

    /// Render with its provenance as `<Document source=".." page=".."/>`
    pub fn render(&self) -> String {
        format!(
            "<Document source=\"{}\" page=\"{}\"/>\n{}\n</Document>",
            self.source_id,
            self.page.as_deref().unwrap_or(""),
            self.content
        )
    }
}

/// Web-retrieval collaborator
#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Search the web, returning at most `max_results` documents in rank order
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<WebDocument>, CollaboratorError>;

    /// Name used in logs and errors
    fn name(&self) -> &str {
        "web"
    }
}

/// Encyclopedia-retrieval collaborator
#[async_trait]
pub trait EncyclopediaLookup: Send + Sync {
    /// Look up articles, returning at most `max_docs` documents in rank order
    async fn lookup(
        &self,
        query: &str,
        max_docs: usize,
    ) -> Result<Vec<EncyclopediaDocument>, CollaboratorError>;

    /// Name used in logs and errors
    fn name(&self) -> &str {
        "encyclopedia"
    }
}

/// Render web documents into one evidence block
pub fn format_web_evidence(query: &str, documents: &[WebDocument]) -> String {
    if documents.is_empty() {
        return format!("No web results found for query \"{}\".", query);
    }
    documents
        .iter()
        .map(WebDocument::render)
        .collect::<Vec<_>>()
        .join(DOCUMENT_SEPARATOR)
}

/// Render encyclopedia documents into one evidence block
pub fn format_encyclopedia_evidence(query: &str, documents: &[EncyclopediaDocument]) -> String {
    if documents.is_empty() {
        return format!("No encyclopedia articles found for query \"{}\".", query);
    }
    documents
        .iter()
        .map(EncyclopediaDocument::render)
        .collect::<Vec<_>>()
        .join(DOCUMENT_SEPARATOR)
}
