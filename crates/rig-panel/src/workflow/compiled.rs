//! CompiledWorkflow: Compiles a WorkflowGraph into a runnable PregelRuntime
//!
//! This module provides the bridge between the high-level workflow DSL and
//! the low-level Pregel execution engine.
//!
//! # Overview
//!
//! The compilation process:
//! 1. Takes a validated `BuiltWorkflowGraph`
//! 2. Registers its vertices with a `PregelRuntime`
//! 3. Wires up entry points, edges, joins and routers
//! 4. Returns a `CompiledWorkflow` ready for execution
//!
//! # Example
//!
//! ```ignore
//! let graph = WorkflowGraph::<MyState>::new()
//!     .name("my_workflow")
//!     .node(PassthroughVertex::new("start"))
//!     .node(PassthroughVertex::new("process"))
//!     .entry("start")
//!     .edge("start", "process")
//!     .edge("process", END)
//!     .build()?;
//!
//! let workflow = CompiledWorkflow::compile(graph, PregelConfig::default());
//! let result = workflow.run(initial_state).await?;
//! ```

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::NodeError;
use crate::pregel::error::PregelError;
use crate::pregel::runtime::{PregelRuntime, Target, WorkflowResult};
use crate::pregel::state::WorkflowState;
use crate::pregel::vertex::{ComputeContext, StateUpdate, Vertex, VertexId};
use crate::pregel::PregelConfig;
use crate::workflow::graph::{BuiltWorkflowGraph, GraphLayout};

/// A compiled workflow ready for execution
///
/// Holds a configured `PregelRuntime` and the graph layout it was built from.
pub struct CompiledWorkflow<S: WorkflowState> {
    /// The underlying Pregel runtime
    runtime: PregelRuntime<S>,
    /// Static layout for inspection and visualization
    layout: GraphLayout,
}

impl<S: WorkflowState> CompiledWorkflow<S> {
    /// Compile a workflow graph into a runnable workflow
    pub fn compile(graph: BuiltWorkflowGraph<S>, config: PregelConfig) -> Self {
        let (layout, vertices, conditionals) = graph.into_parts();
        let mut runtime = PregelRuntime::with_config(config).with_name(layout.name.clone());

        for vertex in vertices.into_values() {
            runtime.add_vertex(vertex);
        }
        for entry in &layout.entry_points {
            runtime.add_entry(entry.as_str());
        }
        for (join, predecessors) in &layout.joins {
            runtime.add_join(
                predecessors.iter().map(|p| VertexId::from(p.as_str())),
                join.as_str(),
            );
        }
        for edge in &layout.edges {
            if edge.conditional || layout.is_join(&edge.to) {
                continue;
            }
            runtime.add_edge(edge.from.as_str(), Target::parse(&edge.to));
        }
        for route in conditionals {
            let targets = route.targets.iter().map(|t| Target::parse(t)).collect();
            runtime.add_conditional_edges(route.from.as_str(), route.router, targets);
        }

        Self { runtime, layout }
    }

    /// Set the identifier reported in logs and results
    pub fn with_workflow_id(mut self, workflow_id: impl Into<String>) -> Self {
        self.runtime = self.runtime.with_workflow_id(workflow_id);
        self
    }

    /// Run the workflow with the given initial state
    pub async fn run(&self, initial_state: S) -> Result<WorkflowResult<S>, PregelError> {
        self.runtime.run(initial_state).await
    }

    /// Run the workflow, aborting in-flight vertices when `cancel` fires
    pub async fn run_with_cancellation(
        &self,
        initial_state: S,
        cancel: CancellationToken,
    ) -> Result<WorkflowResult<S>, PregelError> {
        self.runtime
            .run_with_cancellation(initial_state, cancel)
            .await
    }

    /// Get the workflow name
    pub fn name(&self) -> &str {
        &self.layout.name
    }

    /// Get the graph layout
    pub fn layout(&self) -> &GraphLayout {
        &self.layout
    }

    /// Get the underlying runtime
    pub fn runtime(&self) -> &PregelRuntime<S> {
        &self.runtime
    }

    /// Generate a Mermaid diagram of the workflow
    pub fn to_mermaid(&self) -> String {
        self.layout.to_mermaid()
    }

    /// Generate a Mermaid diagram colored by the statuses of a finished run
    pub fn to_mermaid_with_state(&self, result: &WorkflowResult<S>) -> String {
        self.layout.to_mermaid_with_state(&result.vertex_states)
    }
}

/// A vertex that commits an empty update
///
/// Useful as a placeholder or a pure synchronization point.
pub struct PassthroughVertex<S: WorkflowState> {
    id: VertexId,
    _phantom: std::marker::PhantomData<S>,
}

impl<S: WorkflowState> PassthroughVertex<S> {
    /// Create a new passthrough vertex
    pub fn new(id: impl Into<VertexId>) -> Self {
        Self {
            id: id.into(),
            _phantom: std::marker::PhantomData,
        }
    }
}

#[async_trait]
impl<S: WorkflowState> Vertex<S> for PassthroughVertex<S> {
    fn id(&self) -> &VertexId {
        &self.id
    }

    fn writes(&self) -> &[&'static str] {
        &[]
    }

    async fn compute(&self, _ctx: &ComputeContext<'_, S>) -> Result<S::Update, NodeError> {
        Ok(S::Update::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pregel::{DynamicState, DynamicUpdate, StateSchema, VertexState};
    use crate::workflow::graph::{WorkflowGraph, END};
    use crate::workflow::vertices::FnVertex;
    use serde_json::json;

    fn initial() -> DynamicState {
        DynamicState::new(StateSchema::new().append("notes"))
    }

    fn note(id: &'static str) -> FnVertex<DynamicState> {
        FnVertex::new(id, &["notes"], move |_: &DynamicState| async move {
            Ok(DynamicUpdate::new().append("notes", vec![json!(id)]))
        })
    }

    #[tokio::test]
    async fn test_run_passthrough_workflow() {
        let graph = WorkflowGraph::<DynamicState>::new()
            .name("passthrough_test")
            .node(PassthroughVertex::new("a"))
            .node(PassthroughVertex::new("b"))
            .node(PassthroughVertex::new("c"))
            .entry("a")
            .edge("a", "b")
            .edge("b", "c")
            .edge("c", END)
            .build()
            .unwrap();

        let workflow = CompiledWorkflow::compile(graph, PregelConfig::default());
        let result = workflow.run(initial()).await.unwrap();

        assert!(result.completed);
        assert_eq!(result.steps, 3);
        assert!(result.state.sequence("notes").is_empty());
    }

    #[tokio::test]
    async fn test_compiled_join_runs_once() {
        let graph = WorkflowGraph::<DynamicState>::new()
            .name("fan")
            .node(note("split"))
            .node(note("left"))
            .node(note("right"))
            .node(note("merge"))
            .entry("split")
            .edge("split", "left")
            .edge("split", "right")
            .edge("left", "merge")
            .join(["left", "right"], "merge")
            .edge("merge", END)
            .build()
            .unwrap();

        let workflow = graph
            .compile(PregelConfig::default())
            .with_workflow_id("run-1");
        let result = workflow.run(initial()).await.unwrap();

        assert_eq!(result.workflow_id, "run-1");
        assert_eq!(result.trace.invocations("merge").len(), 1);
        assert_eq!(result.state.sequence("notes").len(), 4);
        assert_eq!(result.state.sequence("notes").last(), Some(&json!("merge")));
    }

    #[tokio::test]
    async fn test_mermaid_with_run_state() {
        let graph = WorkflowGraph::<DynamicState>::new()
            .name("single")
            .node(note("only"))
            .entry("only")
            .edge("only", END)
            .build()
            .unwrap();

        let workflow = CompiledWorkflow::compile(graph, PregelConfig::default());
        assert_eq!(workflow.name(), "single");
        assert!(workflow.to_mermaid().contains("START --> only"));

        let result = workflow.run(initial()).await.unwrap();
        assert_eq!(
            result.vertex_states.get(&VertexId::from("only")),
            Some(&VertexState::Completed)
        );
        assert!(workflow
            .to_mermaid_with_state(&result)
            .contains("only[only]:::completed"));
    }

    #[test]
    fn test_passthrough_vertex_declares_no_writes() {
        let vertex = PassthroughVertex::<DynamicState>::new("test");
        assert_eq!(vertex.id().as_str(), "test");
        assert!(vertex.writes().is_empty());
    }
}
