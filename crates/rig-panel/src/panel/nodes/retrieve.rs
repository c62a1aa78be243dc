//! Retrieve-Web and Retrieve-Encyclopedia
//!
//! Both derive a search query from the whole conversation log, query their
//! collaborator and append one evidence block. They run as sibling branches
//! and never see each other's block.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::error::NodeError;
use crate::llm::{generate_structured, LLMConfig, LLMProvider};
use crate::message::Message;
use crate::panel::prompts::SEARCH_QUERY_PROMPT;
use crate::panel::state::{fields, PanelState, PanelUpdate, SearchQuery};
use crate::pregel::vertex::{ComputeContext, Vertex, VertexId};
use crate::retrieval::{
    format_encyclopedia_evidence, format_web_evidence, EncyclopediaLookup, WebSearch,
};

async fn extract_query(
    llm: &dyn LLMProvider,
    conversation: &[Message],
    config: Option<&LLMConfig>,
) -> Result<String, NodeError> {
    let query: SearchQuery =
        generate_structured(llm, SEARCH_QUERY_PROMPT, conversation, config).await?;

    let query = query.search_query.trim().to_string();
    if query.is_empty() {
        return Err(NodeError::parse_failure("search query is empty"));
    }
    Ok(query)
}

/// Web branch of the retrieval fan-out
pub struct RetrieveWeb {
    id: VertexId,
    llm: Arc<dyn LLMProvider>,
    search: Arc<dyn WebSearch>,
    max_results: usize,
    config: Option<LLMConfig>,
}

impl RetrieveWeb {
    pub fn new(
        id: impl Into<VertexId>,
        llm: Arc<dyn LLMProvider>,
        search: Arc<dyn WebSearch>,
        max_results: usize,
    ) -> Self {
        Self {
            id: id.into(),
            llm,
            search,
            max_results,
            config: None,
        }
    }

    pub fn with_config(mut self, config: LLMConfig) -> Self {
        self.config = Some(config);
        self
    }
}

#[async_trait]
impl Vertex<PanelState> for RetrieveWeb {
    fn id(&self) -> &VertexId {
        &self.id
    }

    fn writes(&self) -> &[&'static str] {
        &[fields::EVIDENCE]
    }

    async fn compute(&self, ctx: &ComputeContext<'_, PanelState>) -> Result<PanelUpdate, NodeError> {
        let query = extract_query(self.llm.as_ref(), &ctx.state.messages, self.config.as_ref()).await?;
        let documents = self.search.search(&query, self.max_results).await?;

        debug!(
            vertex = %self.id,
            collaborator = self.search.name(),
            query = %query,
            documents = documents.len(),
            "Web evidence retrieved"
        );
        Ok(PanelUpdate::evidence_block(format_web_evidence(&query, &documents)))
    }
}

/// Encyclopedia branch of the retrieval fan-out
pub struct RetrieveEncyclopedia {
    id: VertexId,
    llm: Arc<dyn LLMProvider>,
    lookup: Arc<dyn EncyclopediaLookup>,
    max_docs: usize,
    config: Option<LLMConfig>,
}

impl RetrieveEncyclopedia {
    pub fn new(
        id: impl Into<VertexId>,
        llm: Arc<dyn LLMProvider>,
        lookup: Arc<dyn EncyclopediaLookup>,
        max_docs: usize,
    ) -> Self {
        Self {
            id: id.into(),
            llm,
            lookup,
            max_docs,
            config: None,
        }
    }

    pub fn with_config(mut self, config: LLMConfig) -> Self {
        self.config = Some(config);
        self
    }
}

#[async_trait]
impl Vertex<PanelState> for RetrieveEncyclopedia {
    fn id(&self) -> &VertexId {
        &self.id
    }

    fn writes(&self) -> &[&'static str] {
        &[fields::EVIDENCE]
    }

    async fn compute(&self, ctx: &ComputeContext<'_, PanelState>) -> Result<PanelUpdate, NodeError> {
        let query = extract_query(self.llm.as_ref(), &ctx.state.messages, self.config.as_ref()).await?;
        let documents = self.lookup.lookup(&query, self.max_docs).await?;

        debug!(
            vertex = %self.id,
            collaborator = self.lookup.name(),
            query = %query,
            documents = documents.len(),
            "Encyclopedia evidence retrieved"
        );
        Ok(PanelUpdate::evidence_block(format_encyclopedia_evidence(
            &query, &documents,
        )))
    }
}
