//! Debate-Turn: one round of the simulated panel discussion

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::error::NodeError;
use crate::llm::{LLMConfig, LLMProvider};
use crate::message::{Message, Role};
use crate::panel::prompts::{render_debate_opening, render_debate_prompt, DEBATE_CONTINUE};
use crate::panel::state::{fields, PanelState, PanelUpdate, DEBATE_MESSAGE};
use crate::pregel::vertex::{ComputeContext, Vertex, VertexId};

/// Appends exactly one agent-authored turn to the conversation log
pub struct DebateTurn {
    id: VertexId,
    llm: Arc<dyn LLMProvider>,
    config: Option<LLMConfig>,
}

impl DebateTurn {
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

/// The conversation sent for the next turn
///
/// An empty log is opened with a human directive naming the symptom; a log
/// ending in an agent turn gets a nudge to continue. Neither is logged.
fn debate_request(state: &PanelState) -> Vec<Message> {
    let mut request = state.messages.clone();
    match request.last() {
        None => request.push(Message::human(render_debate_opening(&state.symptom))),
        Some(last) if last.role != Role::Human => request.push(Message::human(DEBATE_CONTINUE)),
        Some(_) => {}
    }
    request
}

#[async_trait]
impl Vertex<PanelState> for DebateTurn {
    fn id(&self) -> &VertexId {
        &self.id
    }

    fn writes(&self) -> &[&'static str] {
        &[fields::MESSAGES]
    }

    async fn compute(&self, ctx: &ComputeContext<'_, PanelState>) -> Result<PanelUpdate, NodeError> {
        let state = ctx.state;
        let directive = render_debate_prompt(&state.experts);
        let request = debate_request(state);

        let text = self
            .llm
            .generate(&directive, &request, self.config.as_ref())
            .await?;

        debug!(
            vertex = %self.id,
            turn = state.debate_turns() + 1,
            chars = text.len(),
            "Debate turn generated"
        );
        Ok(PanelUpdate::message(
            Message::agent(text).with_name(DEBATE_MESSAGE),
        ))
    }
}
