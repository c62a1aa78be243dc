//! The specialist-panel workflow
//!
//! Wires the six panel nodes into a graph, seeds the shared state from the
//! run parameters and turns the final state into a [`FinalOutput`].
//!
//! # Example
//!
//! ```rust,ignore
//! let workflow = PanelWorkflow::builder()
//!     .llm(Arc::new(RigAgentAdapter::new(agent)))
//!     .web_search(Arc::new(TavilySearch::from_env()?))
//!     .encyclopedia(Arc::new(WikipediaLookup::default()))
//!     .build()?;
//!
//! let output = workflow.run("persistent cough", 3, None).await?;
//! println!("{}", output.plan);
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use super::nodes::{
    DebateTurn, GenerateExperts, MergeEvidence, RetrieveEncyclopedia, RetrieveWeb,
    SynthesizePlan, DEBATE_TURN, GENERATE_EXPERTS, MERGE_EVIDENCE, RETRIEVE_ENCYCLOPEDIA,
    RETRIEVE_WEB, SYNTHESIZE_PLAN,
};
use super::prompts::DEBATE_SENTINEL;
use super::state::{Expert, PanelState};
use crate::config::PanelConfig;
use crate::llm::LLMProvider;
use crate::message::Message;
use crate::pregel::error::PregelError;
use crate::pregel::trace::RunTrace;
use crate::retrieval::{EncyclopediaLookup, WebSearch};
use crate::workflow::compiled::PassthroughVertex;
use crate::workflow::graph::{BuiltWorkflowGraph, WorkflowBuildError, WorkflowGraph, END};

/// Failure of a panel run
pub type WorkflowError = PregelError;

/// Name of the compiled graph
pub const WORKFLOW_NAME: &str = "specialist_panel";

/// Everything a successful run produced
#[derive(Debug, Clone, Serialize)]
pub struct FinalOutput {
    pub run_id: String,
    pub symptom: String,
    pub experts: Vec<Expert>,
    /// Full conversation log, debate turns followed by the plan entry
    pub conversation: Vec<Message>,
    /// Merged evidence context
    pub evidence: Vec<String>,
    /// The synthesized plan text
    pub plan: String,
    /// Node invocations
    pub steps: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub trace: RunTrace,
}

impl FinalOutput {
    /// Wall-clock duration of the run
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Decide where the debate goes after a turn
///
/// Loops while fewer than `max_turns` turns exist and the latest one does not
/// end with the closing phrase; otherwise fans out to both retrieval branches.
pub fn route_after_debate(state: &PanelState, max_turns: usize) -> Vec<String> {
    let closed = state
        .last_debate_turn()
        .is_some_and(|m| m.content.trim_end().ends_with(DEBATE_SENTINEL));

    if !closed && state.debate_turns() < max_turns {
        vec![DEBATE_TURN.to_string()]
    } else {
        vec![RETRIEVE_WEB.to_string(), RETRIEVE_ENCYCLOPEDIA.to_string()]
    }
}

/// Add the panel's edges to a graph that already holds its six nodes
fn wire_panel(graph: WorkflowGraph<PanelState>, max_turns: usize) -> WorkflowGraph<PanelState> {
    let graph = graph.entry(GENERATE_EXPERTS).edge(GENERATE_EXPERTS, DEBATE_TURN);

    let graph = if max_turns > 1 {
        graph.conditional_edges(
            DEBATE_TURN,
            move |state: &PanelState| route_after_debate(state, max_turns),
            [DEBATE_TURN, RETRIEVE_WEB, RETRIEVE_ENCYCLOPEDIA],
        )
    } else {
        graph
            .edge(DEBATE_TURN, RETRIEVE_WEB)
            .edge(DEBATE_TURN, RETRIEVE_ENCYCLOPEDIA)
    };

    graph
        .join([RETRIEVE_WEB, RETRIEVE_ENCYCLOPEDIA], MERGE_EVIDENCE)
        .edge(MERGE_EVIDENCE, SYNTHESIZE_PLAN)
        .edge(SYNTHESIZE_PLAN, END)
}

/// Mermaid diagram of the panel topology, without collaborators
pub fn panel_mermaid(max_turns: usize) -> Result<String, WorkflowBuildError> {
    let graph = [
        GENERATE_EXPERTS,
        DEBATE_TURN,
        RETRIEVE_WEB,
        RETRIEVE_ENCYCLOPEDIA,
        MERGE_EVIDENCE,
        SYNTHESIZE_PLAN,
    ]
    .into_iter()
    .fold(WorkflowGraph::<PanelState>::new().name(WORKFLOW_NAME), |graph, id| {
        graph.node(PassthroughVertex::new(id))
    });

    Ok(wire_panel(graph, max_turns).build()?.to_mermaid())
}

/// The specialist-panel workflow with its collaborators
pub struct PanelWorkflow {
    llm: Arc<dyn LLMProvider>,
    web: Arc<dyn WebSearch>,
    encyclopedia: Arc<dyn EncyclopediaLookup>,
    config: PanelConfig,
}

impl PanelWorkflow {
    pub fn builder() -> PanelWorkflowBuilder {
        PanelWorkflowBuilder::default()
    }

    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    /// Build the graph for a run with at most `max_turns` debate turns
    pub fn graph(&self, max_turns: usize) -> Result<BuiltWorkflowGraph<PanelState>, WorkflowBuildError> {
        let llm_config = self.config.llm.clone();

        let graph = WorkflowGraph::<PanelState>::new()
            .name(WORKFLOW_NAME)
            .node(GenerateExperts::new(GENERATE_EXPERTS, self.llm.clone()).with_config(llm_config.clone()))
            .node(DebateTurn::new(DEBATE_TURN, self.llm.clone()).with_config(llm_config.clone()))
            .node(
                RetrieveWeb::new(
                    RETRIEVE_WEB,
                    self.llm.clone(),
                    self.web.clone(),
                    self.config.web_max_results,
                )
                .with_config(llm_config.clone()),
            )
            .node(
                RetrieveEncyclopedia::new(
                    RETRIEVE_ENCYCLOPEDIA,
                    self.llm.clone(),
                    self.encyclopedia.clone(),
                    self.config.encyclopedia_max_docs,
                )
                .with_config(llm_config.clone()),
            )
            .node(MergeEvidence::new(MERGE_EVIDENCE))
            .node(SynthesizePlan::new(SYNTHESIZE_PLAN, self.llm.clone()).with_config(llm_config));

        wire_panel(graph, max_turns).build()
    }

    /// Mermaid rendering of the graph used for the configured turn count
    pub fn to_mermaid(&self) -> Result<String, WorkflowBuildError> {
        panel_mermaid(self.config.max_turns)
    }

    /// Run the panel for `symptom`
    pub async fn run(
        &self,
        symptom: &str,
        max_experts: usize,
        guidance: Option<&str>,
    ) -> Result<FinalOutput, WorkflowError> {
        self.run_with_cancellation(symptom, max_experts, guidance, CancellationToken::new())
            .await
    }

    /// Run the panel, aborting in-flight nodes when `cancel` fires
    pub async fn run_with_cancellation(
        &self,
        symptom: &str,
        max_experts: usize,
        guidance: Option<&str>,
        cancel: CancellationToken,
    ) -> Result<FinalOutput, WorkflowError> {
        let symptom = symptom.trim();
        if symptom.is_empty() {
            return Err(PregelError::invalid_input("symptom must not be empty"));
        }
        if max_experts == 0 {
            return Err(PregelError::invalid_input("max_experts must be at least 1"));
        }
        let max_turns = self.config.max_turns;
        if max_turns == 0 {
            return Err(PregelError::invalid_input("max_turns must be at least 1"));
        }

        let mut initial = PanelState::new(symptom, max_experts).with_max_turns(max_turns);
        if let Some(guidance) = guidance.map(str::trim).filter(|g| !g.is_empty()) {
            initial = initial.with_guidance(guidance);
        }

        let run_id = Uuid::new_v4().to_string();
        let workflow = self
            .graph(max_turns)?
            .compile(self.config.pregel.clone())
            .with_workflow_id(run_id.clone());

        info!(run_id = %run_id, symptom, max_experts, max_turns, "Starting panel run");
        let started_at = Utc::now();

        let result = match workflow.run_with_cancellation(initial, cancel).await {
            Ok(result) => result,
            Err(e) => {
                warn!(
                    run_id = %run_id,
                    kind = %e.kind(),
                    vertex = e.vertex_id().map(|v| v.as_str()).unwrap_or("-"),
                    error = %e,
                    "Panel run failed"
                );
                return Err(e);
            }
        };
        let finished_at = Utc::now();

        let state = result.state;
        let plan = state
            .plan
            .clone()
            .ok_or_else(|| PregelError::state_error("run completed without a treatment plan"))?;

        info!(
            run_id = %run_id,
            steps = result.steps,
            experts = state.experts.len(),
            turns = state.debate_turns(),
            "Panel run completed"
        );

        Ok(FinalOutput {
            run_id,
            symptom: state.symptom,
            experts: state.experts,
            conversation: state.messages,
            evidence: state.evidence,
            plan,
            steps: result.steps,
            started_at,
            finished_at,
            trace: result.trace,
        })
    }
}

/// Builder for [`PanelWorkflow`]
#[derive(Default)]
pub struct PanelWorkflowBuilder {
    llm: Option<Arc<dyn LLMProvider>>,
    web: Option<Arc<dyn WebSearch>>,
    encyclopedia: Option<Arc<dyn EncyclopediaLookup>>,
    config: PanelConfig,
}

impl PanelWorkflowBuilder {
    pub fn llm(mut self, llm: Arc<dyn LLMProvider>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn web_search(mut self, web: Arc<dyn WebSearch>) -> Self {
        self.web = Some(web);
        self
    }

    pub fn encyclopedia(mut self, encyclopedia: Arc<dyn EncyclopediaLookup>) -> Self {
        self.encyclopedia = Some(encyclopedia);
        self
    }

    pub fn config(mut self, config: PanelConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<PanelWorkflow, WorkflowError> {
        let missing = |what: &str| PregelError::config_error(format!("no {} collaborator set", what));
        Ok(PanelWorkflow {
            llm: self.llm.ok_or_else(|| missing("reasoning"))?,
            web: self.web.ok_or_else(|| missing("web search"))?,
            encyclopedia: self.encyclopedia.ok_or_else(|| missing("encyclopedia"))?,
            config: self.config,
        })
    }
}

/// Run the panel once with the given collaborators and default settings
pub async fn run_workflow(
    llm: Arc<dyn LLMProvider>,
    web: Arc<dyn WebSearch>,
    encyclopedia: Arc<dyn EncyclopediaLookup>,
    symptom: &str,
    max_experts: usize,
    guidance: Option<&str>,
) -> Result<FinalOutput, WorkflowError> {
    PanelWorkflow::builder()
        .llm(llm)
        .web_search(web)
        .encyclopedia(encyclopedia)
        .build()?
        .run(symptom, max_experts, guidance)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::state::DEBATE_MESSAGE;
    use crate::panel::nodes::testing::ScriptedLlm;
    use crate::error::{CollaboratorError, ErrorKind};
    use crate::retrieval::{EncyclopediaDocument, WebDocument};
    use async_trait::async_trait;

    struct NoWeb;

    #[async_trait]
    impl WebSearch for NoWeb {
        async fn search(&self, _q: &str, _n: usize) -> Result<Vec<WebDocument>, CollaboratorError> {
            Ok(Vec::new())
        }
    }

    struct NoEncyclopedia;

    #[async_trait]
    impl EncyclopediaLookup for NoEncyclopedia {
        async fn lookup(
            &self,
            _q: &str,
            _n: usize,
        ) -> Result<Vec<EncyclopediaDocument>, CollaboratorError> {
            Ok(Vec::new())
        }
    }

    fn workflow(config: PanelConfig) -> PanelWorkflow {
        PanelWorkflow::builder()
            .llm(Arc::new(ScriptedLlm::new(vec![])))
            .web_search(Arc::new(NoWeb))
            .encyclopedia(Arc::new(NoEncyclopedia))
            .config(config)
            .build()
            .unwrap()
    }

    fn with_turns(contents: &[&str]) -> PanelState {
        let mut state = PanelState::new("cough", 2);
        for c in contents {
            state.messages.push(Message::agent(*c).with_name(DEBATE_MESSAGE));
        }
        state
    }

    #[test]
    fn test_route_after_debate() {
        let fan_out = vec![RETRIEVE_WEB.to_string(), RETRIEVE_ENCYCLOPEDIA.to_string()];

        assert_eq!(route_after_debate(&with_turns(&["a"]), 3), vec![DEBATE_TURN.to_string()]);
        assert_eq!(route_after_debate(&with_turns(&["a", "b", "c"]), 3), fan_out);
        assert_eq!(route_after_debate(&with_turns(&["done. Thank you!"]), 3), fan_out);
        assert_eq!(route_after_debate(&with_turns(&["a"]), 1), fan_out);
    }

    #[test]
    fn test_closing_phrase_counts_only_at_the_end() {
        let mid_turn = with_turns(&["Thank you! Now, about the chest X-ray findings..."]);
        assert_eq!(route_after_debate(&mid_turn, 3), vec![DEBATE_TURN.to_string()]);

        let closed = with_turns(&["We agree on spirometry. Thank you!\n\n"]);
        assert_eq!(
            route_after_debate(&closed, 3),
            vec![RETRIEVE_WEB.to_string(), RETRIEVE_ENCYCLOPEDIA.to_string()]
        );
    }

    #[test]
    fn test_single_turn_graph_shape() {
        let graph = workflow(PanelConfig::default()).graph(1).unwrap();
        let layout = graph.layout();

        assert_eq!(layout.entry_points, vec![GENERATE_EXPERTS.to_string()]);
        assert_eq!(
            layout.joins.get(MERGE_EVIDENCE).unwrap(),
            &vec![RETRIEVE_WEB.to_string(), RETRIEVE_ENCYCLOPEDIA.to_string()]
        );
        let mut fan_out = layout.successors(DEBATE_TURN);
        fan_out.sort();
        assert_eq!(fan_out, vec![RETRIEVE_ENCYCLOPEDIA, RETRIEVE_WEB]);
        assert!(layout.edges.iter().all(|e| !e.conditional));
    }

    #[test]
    fn test_multi_turn_graph_has_debate_loop() {
        let graph = workflow(PanelConfig::default()).graph(3).unwrap();
        assert!(graph
            .layout()
            .edges
            .iter()
            .any(|e| e.conditional && e.from == DEBATE_TURN && e.to == DEBATE_TURN));
        assert!(graph.to_mermaid().contains("debate_turn"));
    }

    #[test]
    fn test_offline_mermaid_matches_live_graph() {
        let live = workflow(PanelConfig::default()).graph(2).unwrap().to_mermaid();
        assert_eq!(panel_mermaid(2).unwrap(), live);
        assert!(live.contains("merge_evidence[\\merge_evidence/]"));
    }

    #[tokio::test]
    async fn test_invalid_parameters_are_rejected_before_running() {
        let panel = workflow(PanelConfig::default());

        let err = panel.run("   ", 3, None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = panel.run("cough", 0, None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = workflow(PanelConfig::default().with_max_turns(0))
            .run("cough", 1, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_builder_requires_collaborators() {
        let err = PanelWorkflow::builder()
            .llm(Arc::new(ScriptedLlm::new(vec![])))
            .build()
            .err()
            .unwrap();
        assert!(err.to_string().contains("web search"));
    }
}
