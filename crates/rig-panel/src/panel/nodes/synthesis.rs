//! Synthesize-Plan: the lead physician's final plan

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::NodeError;
use crate::llm::{LLMConfig, LLMProvider};
use crate::message::Message;
use crate::panel::prompts::{render_synthesis_prompt, PLAN_SENTINEL, SYNTHESIS_REQUEST};
use crate::panel::state::{fields, PanelState, PanelUpdate, PLAN_MESSAGE};
use crate::pregel::vertex::{ComputeContext, Vertex, VertexId};

/// Make sure the plan text ends with the completion sentinel
pub fn ensure_plan_sentinel(text: &str) -> String {
    let trimmed = text.trim_end();
    if trimmed.ends_with(PLAN_SENTINEL) {
        trimmed.to_string()
    } else if trimmed.is_empty() {
        PLAN_SENTINEL.to_string()
    } else {
        format!("{}\n\n{}", trimmed, PLAN_SENTINEL)
    }
}

/// Produces the final plan from the debate and the merged evidence
pub struct SynthesizePlan {
    id: VertexId,
    llm: Arc<dyn LLMProvider>,
    config: Option<LLMConfig>,
}

impl SynthesizePlan {
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

#[async_trait]
impl Vertex<PanelState> for SynthesizePlan {
    fn id(&self) -> &VertexId {
        &self.id
    }

    fn writes(&self) -> &[&'static str] {
        &[fields::MESSAGES, fields::PLAN]
    }

    async fn compute(&self, ctx: &ComputeContext<'_, PanelState>) -> Result<PanelUpdate, NodeError> {
        let state = ctx.state;
        let directive =
            render_synthesis_prompt(&state.symptom, state.guidance_text(), &state.evidence);

        let mut request = state.messages.clone();
        request.push(Message::human(SYNTHESIS_REQUEST));

        let text = self
            .llm
            .generate(&directive, &request, self.config.as_ref())
            .await?;

        let plan = ensure_plan_sentinel(&text);
        if !text.trim_end().ends_with(PLAN_SENTINEL) {
            debug!(vertex = %self.id, "Completion sentinel was missing, appended");
        }
        info!(vertex = %self.id, chars = plan.len(), "Treatment plan synthesized");

        Ok(PanelUpdate::final_plan(
            Message::agent(plan).with_name(PLAN_MESSAGE),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::nodes::testing::{ctx, ScriptedLlm};
    use crate::pregel::state::WorkflowState;

    #[test]
    fn test_ensure_plan_sentinel() {
        assert_eq!(ensure_plan_sentinel("Plan.\nFinal plan complete.\n"), "Plan.\nFinal plan complete.");
        assert_eq!(ensure_plan_sentinel("Plan."), "Plan.\n\nFinal plan complete.");
        assert_eq!(ensure_plan_sentinel("  "), "Final plan complete.");
    }

    #[tokio::test]
    async fn test_plan_entry_is_named_and_stored() {
        let llm = Arc::new(ScriptedLlm::new(vec!["1. Differential: asthma\nFinal plan complete."]));
        let node = SynthesizePlan::new("synthesize_plan", llm.clone());

        let mut state = PanelState::new("persistent cough", 2).with_guidance("adult smoker");
        state.messages.push(Message::agent("debate").with_name("debate"));
        state.evidence = vec!["<Document href=\"u\">\nspirometry\n</Document>".into()];

        let update = node.compute(&ctx("synthesize_plan", &state)).await.unwrap();
        let next = state.apply_update(update);

        assert_eq!(next.messages.len(), 2);
        let plan = next.plan_message().unwrap();
        assert!(plan.content.ends_with(PLAN_SENTINEL));
        assert_eq!(next.plan.as_deref(), Some(plan.content.as_str()));

        let request = &llm.requests.lock().unwrap()[0];
        assert!(request[0].content.contains("spirometry"));
        assert!(request[0].content.contains("adult smoker"));
        assert_eq!(request.last().unwrap().content, SYNTHESIS_REQUEST);
    }
}
