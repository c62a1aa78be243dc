//! Generate-Experts: assemble the specialist panel

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::error::NodeError;
use crate::llm::{generate_structured, LLMConfig, LLMProvider};
use crate::message::Message;
use crate::panel::prompts::{render_experts_prompt, EXPERTS_REQUEST};
use crate::panel::state::{fields, Expert, ExpertPanel, PanelState, PanelUpdate};
use crate::pregel::vertex::{ComputeContext, Vertex, VertexId};

/// Asks the reasoning collaborator for `max_experts` distinct specialists
pub struct GenerateExperts {
    id: VertexId,
    llm: Arc<dyn LLMProvider>,
    config: Option<LLMConfig>,
}

impl GenerateExperts {
    pub fn new(id: impl Into<VertexId>, llm: Arc<dyn LLMProvider>) -> Self {
        Self {
            id: id.into(),
            llm,
            config: None,
        }
    }

    pub fn with_config(mut self, config: LLMConfig) -> Self {
        self.config = Some(config);
        self
    }
}

/// Keep the first `k` experts with pairwise-distinct specializations
///
/// Specializations are compared case-insensitively, ignoring surrounding
/// whitespace. Returns `None` when fewer than `k` distinct ones exist.
pub fn select_distinct_experts(experts: Vec<Expert>, k: usize) -> Option<Vec<Expert>> {
    let mut seen = HashSet::new();
    let selected: Vec<Expert> = experts
        .into_iter()
        .filter(|e| seen.insert(e.specialization.trim().to_lowercase()))
        .take(k)
        .collect();

    (selected.len() == k).then_some(selected)
}

#[async_trait]
impl Vertex<PanelState> for GenerateExperts {
    fn id(&self) -> &VertexId {
        &self.id
    }

    fn writes(&self) -> &[&'static str] {
        &[fields::EXPERTS]
    }

    async fn compute(&self, ctx: &ComputeContext<'_, PanelState>) -> Result<PanelUpdate, NodeError> {
        let state = ctx.state;
        let k = state.max_experts;
        if k == 0 {
            return Ok(PanelUpdate::experts(Vec::new()));
        }

        let directive = render_experts_prompt(&state.symptom, state.guidance_text(), k);
        let panel: ExpertPanel = generate_structured(
            self.llm.as_ref(),
            &directive,
            &[Message::human(EXPERTS_REQUEST)],
            self.config.as_ref(),
        )
        .await?;

        let proposed = panel.experts.len();
        let experts = select_distinct_experts(panel.experts, k).ok_or_else(|| {
            NodeError::parse_failure(format!(
                "expected {} experts with distinct specializations, got {} proposals",
                k, proposed
            ))
        })?;

        debug!(
            vertex = %self.id,
            requested = k,
            proposed,
            "Expert panel assembled"
        );
        Ok(PanelUpdate::experts(experts))
    }
}
