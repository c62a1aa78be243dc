//! WorkflowGraph builder DSL.
//!
//! Provides a fluent API for registering vertices, edges, joins and entry
//! points, then validates the whole definition once and produces a
//! [`BuiltWorkflowGraph`] ready for compilation.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::Arc;

use thiserror::Error;

use crate::pregel::runtime::RouterFn;
use crate::pregel::vertex::{BoxedVertex, Vertex, VertexId, VertexState};
use crate::pregel::{PregelConfig, WorkflowState};
use crate::workflow::compiled::CompiledWorkflow;
use crate::workflow::visualization::{
    render_edge, render_node, render_node_with_state, NodeShape, STYLE_DEFS,
};

/// Sentinel source for entry edges.
pub const START: &str = "START";

/// Sentinel target for terminal edges.
pub const END: &str = "END";

/// Edge definition for a workflow graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    /// Whether the edge is only taken when its router selects it
    pub conditional: bool,
}

/// Errors that can occur while building a workflow graph.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkflowBuildError {
    #[error("workflow entry point not set")]
    NoEntryPoint,
    #[error("unknown node id: {0}")]
    UnknownNode(String),
    #[error("duplicate node id: {0}")]
    DuplicateNode(String),
    #[error("node id is reserved: {0}")]
    ReservedName(String),
    #[error("edge out of END towards {0}")]
    EdgeFromEnd(String),
    #[error("node {0} has no outgoing edge")]
    DeadEnd(String),
    #[error("node {0} is not reachable from START")]
    Unreachable(String),
    #[error("END is not reachable from node {0}")]
    NoPathToEnd(String),
    #[error("join {0} needs at least two predecessors")]
    JoinTooSmall(String),
    #[error("join {0} is declared more than once")]
    DuplicateJoin(String),
    #[error("join {join} receives an edge from undeclared predecessor {from}")]
    JoinPredecessorMismatch { join: String, from: String },
    #[error("node {0} has several predecessors but is not declared as a join")]
    UndeclaredJoin(String),
    #[error("conditional edge from {from} targets join {join}")]
    ConditionalIntoJoin { from: String, join: String },
    #[error("conditional edges from {0} declare no targets")]
    EmptyConditional(String),
}

/// Data-dependent edge set registered on a node
pub(crate) struct ConditionalRoute<S> {
    pub(crate) from: String,
    pub(crate) router: RouterFn<S>,
    pub(crate) targets: Vec<String>,
}

impl<S> Clone for ConditionalRoute<S> {
    fn clone(&self) -> Self {
        Self {
            from: self.from.clone(),
            router: Arc::clone(&self.router),
            targets: self.targets.clone(),
        }
    }
}

/// Builder for constructing workflow graphs with fluent API.
#[derive(Clone)]
pub struct WorkflowGraph<S: WorkflowState> {
    name: String,
    nodes: Vec<BoxedVertex<S>>,
    edges: Vec<GraphEdge>,
    joins: Vec<(String, Vec<String>)>,
    conditionals: Vec<ConditionalRoute<S>>,
    entry_points: Vec<String>,
}

impl<S: WorkflowState> Default for WorkflowGraph<S> {
    fn default() -> Self {
        Self {
            name: String::new(),
            nodes: Vec::new(),
            edges: Vec::new(),
            joins: Vec::new(),
            conditionals: Vec::new(),
            entry_points: Vec::new(),
        }
    }
}

impl<S: WorkflowState> std::fmt::Debug for WorkflowGraph<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowGraph")
            .field("name", &self.name)
            .field(
                "nodes",
                &self.nodes.iter().map(|v| v.id().as_str()).collect::<Vec<_>>(),
            )
            .field("edges", &self.edges)
            .field("joins", &self.joins)
            .field("entry_points", &self.entry_points)
            .finish()
    }
}

impl<S: WorkflowState> WorkflowGraph<S> {
    /// Create a new workflow graph builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the workflow name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Add a vertex; its id names the node.
    pub fn node(self, vertex: impl Vertex<S> + 'static) -> Self {
        self.boxed_node(Arc::new(vertex))
    }

    /// Add an already shared vertex.
    pub fn boxed_node(mut self, vertex: BoxedVertex<S>) -> Self {
        self.nodes.push(vertex);
        self
    }

    /// Add a successor of the start marker.
    pub fn entry(mut self, id: impl Into<String>) -> Self {
        self.entry_points.push(id.into());
        self
    }

    /// Add a direct edge between nodes. `edge(START, x)` is `entry(x)`.
    pub fn edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        let from = from.into();
        if from == START {
            return self.entry(to);
        }
        self.edges.push(GraphEdge {
            from,
            to: to.into(),
            conditional: false,
        });
        self
    }

    /// Declare a join: `to` runs once, after every node in `predecessors` committed.
    pub fn join<I, P>(mut self, predecessors: I, to: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.joins.push((
            to.into(),
            predecessors.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Add data-dependent edges from a node.
    ///
    /// `router` sees the node's post-commit view and returns the names of
    /// the successors to schedule; each must be one of `targets`.
    pub fn conditional_edges<F, I, T>(mut self, from: impl Into<String>, router: F, targets: I) -> Self
    where
        F: Fn(&S) -> Vec<String> + Send + Sync + 'static,
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let from = from.into();
        let targets: Vec<String> = targets.into_iter().map(Into::into).collect();
        for target in &targets {
            self.edges.push(GraphEdge {
                from: from.clone(),
                to: target.clone(),
                conditional: true,
            });
        }
        self.conditionals.push(ConditionalRoute {
            from,
            router: Arc::new(router),
            targets,
        });
        self
    }

    /// Validate and build the workflow graph.
    pub fn build(self) -> Result<BuiltWorkflowGraph<S>, WorkflowBuildError> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut vertices: HashMap<String, BoxedVertex<S>> = HashMap::new();
        for vertex in self.nodes {
            let id = vertex.id().as_str().to_string();
            if id == START || id == END {
                return Err(WorkflowBuildError::ReservedName(id));
            }
            if vertices.contains_key(&id) {
                return Err(WorkflowBuildError::DuplicateNode(id));
            }
            order.push(id.clone());
            vertices.insert(id, vertex);
        }
        let known = |id: &str| vertices.contains_key(id);

        if self.entry_points.is_empty() {
            return Err(WorkflowBuildError::NoEntryPoint);
        }
        if let Some(unknown) = self.entry_points.iter().find(|id| !known(id.as_str())) {
            return Err(WorkflowBuildError::UnknownNode(unknown.clone()));
        }

        let mut joins: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (target, predecessors) in self.joins {
            if !known(target.as_str()) {
                return Err(WorkflowBuildError::UnknownNode(target));
            }
            let mut unique: Vec<String> = Vec::new();
            for pred in predecessors {
                if !known(pred.as_str()) {
                    return Err(WorkflowBuildError::UnknownNode(pred));
                }
                if !unique.contains(&pred) {
                    unique.push(pred);
                }
            }
            if unique.len() < 2 {
                return Err(WorkflowBuildError::JoinTooSmall(target));
            }
            if joins.contains_key(&target) {
                return Err(WorkflowBuildError::DuplicateJoin(target));
            }
            joins.insert(target, unique);
        }

        let mut edges: Vec<GraphEdge> = Vec::new();
        for edge in self.edges {
            if edge.from == END {
                return Err(WorkflowBuildError::EdgeFromEnd(edge.to));
            }
            if !known(edge.from.as_str()) {
                return Err(WorkflowBuildError::UnknownNode(edge.from));
            }
            if edge.to != END && !known(edge.to.as_str()) {
                return Err(WorkflowBuildError::UnknownNode(edge.to));
            }
            if let Some(predecessors) = joins.get(&edge.to) {
                if edge.conditional {
                    return Err(WorkflowBuildError::ConditionalIntoJoin {
                        from: edge.from,
                        join: edge.to,
                    });
                }
                if !predecessors.contains(&edge.from) {
                    return Err(WorkflowBuildError::JoinPredecessorMismatch {
                        join: edge.to,
                        from: edge.from,
                    });
                }
            }
            if !edges.contains(&edge) {
                edges.push(edge);
            }
        }
        for (join, predecessors) in &joins {
            if self.entry_points.contains(join) {
                return Err(WorkflowBuildError::JoinPredecessorMismatch {
                    join: join.clone(),
                    from: START.to_string(),
                });
            }
            for pred in predecessors {
                let edge = GraphEdge {
                    from: pred.clone(),
                    to: join.clone(),
                    conditional: false,
                };
                if !edges.contains(&edge) {
                    edges.push(edge);
                }
            }
        }

        for route in &self.conditionals {
            if route.targets.is_empty() {
                return Err(WorkflowBuildError::EmptyConditional(route.from.clone()));
            }
        }

        let layout = GraphLayout {
            name: self.name,
            nodes: order,
            entry_points: self.entry_points,
            edges,
            joins,
        };
        layout.validate_topology()?;

        Ok(BuiltWorkflowGraph {
            layout,
            vertices,
            conditionals: self.conditionals,
        })
    }
}

/// Static shape of a validated graph, kept for inspection and rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphLayout {
    pub name: String,
    /// Node ids in registration order
    pub nodes: Vec<String>,
    pub entry_points: Vec<String>,
    pub edges: Vec<GraphEdge>,
    /// Join node -> its full predecessor set
    pub joins: BTreeMap<String, Vec<String>>,
}

impl GraphLayout {
    /// Successors of a node (including END), in declaration order
    pub fn successors(&self, node: &str) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for edge in self.edges.iter().filter(|e| e.from == node) {
            if !out.contains(&edge.to.as_str()) {
                out.push(edge.to.as_str());
            }
        }
        out
    }

    /// Predecessors of a node (including START for entry points)
    pub fn predecessors(&self, node: &str) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        if self.entry_points.iter().any(|e| e == node) {
            out.push(START);
        }
        for edge in self.edges.iter().filter(|e| e.to == node) {
            if !out.contains(&edge.from.as_str()) {
                out.push(edge.from.as_str());
            }
        }
        out
    }

    pub fn is_join(&self, node: &str) -> bool {
        self.joins.contains_key(node)
    }

    /// Rendering shape of a node
    pub fn shape(&self, node: &str) -> NodeShape {
        if self.is_join(node) {
            return NodeShape::Join;
        }
        let unconditional = self
            .edges
            .iter()
            .filter(|e| e.from == node && !e.conditional && e.to != END)
            .count();
        if unconditional > 1 {
            NodeShape::FanOut
        } else {
            NodeShape::Task
        }
    }

    fn validate_topology(&self) -> Result<(), WorkflowBuildError> {
        // Several unconditional predecessors require an explicit join
        for node in &self.nodes {
            if self.is_join(node) {
                continue;
            }
            let mut plain: BTreeSet<&str> = self
                .edges
                .iter()
                .filter(|e| e.to == *node && !e.conditional)
                .map(|e| e.from.as_str())
                .collect();
            if self.entry_points.contains(node) {
                plain.insert(START);
            }
            if plain.len() > 1 {
                return Err(WorkflowBuildError::UndeclaredJoin(node.clone()));
            }
        }

        if let Some(dead) = self
            .nodes
            .iter()
            .find(|node| !self.edges.iter().any(|e| e.from == **node))
        {
            return Err(WorkflowBuildError::DeadEnd(dead.clone()));
        }

        let reached = self.walk(self.entry_points.iter().map(String::as_str), |n| self.successors(n));
        if let Some(unreachable) = self.nodes.iter().find(|n| !reached.contains(n.as_str())) {
            return Err(WorkflowBuildError::Unreachable(unreachable.clone()));
        }

        let finishing = self.walk(std::iter::once(END), |n| self.predecessors(n));
        if let Some(stuck) = self.nodes.iter().find(|n| !finishing.contains(n.as_str())) {
            return Err(WorkflowBuildError::NoPathToEnd(stuck.clone()));
        }

        Ok(())
    }

    fn walk<'a>(
        &'a self,
        roots: impl Iterator<Item = &'a str>,
        next: impl Fn(&'a str) -> Vec<&'a str>,
    ) -> BTreeSet<&'a str> {
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        let mut queue: VecDeque<&str> = roots.collect();
        while let Some(node) = queue.pop_front() {
            if seen.insert(node) {
                queue.extend(next(node));
            }
        }
        seen
    }

    /// Generate a Mermaid diagram of the graph
    pub fn to_mermaid(&self) -> String {
        self.render(None)
    }

    /// Generate a Mermaid diagram colored by final vertex status
    pub fn to_mermaid_with_state(&self, states: &HashMap<VertexId, VertexState>) -> String {
        self.render(Some(states))
    }

    fn render(&self, states: Option<&HashMap<VertexId, VertexState>>) -> String {
        let mut lines = vec![String::from("graph TD")];
        lines.push(render_node(START, NodeShape::Terminal));
        for node in &self.nodes {
            let shape = self.shape(node);
            match states {
                Some(states) => lines.push(render_node_with_state(
                    node,
                    shape,
                    states.get(&VertexId::from(node.as_str())),
                )),
                None => lines.push(render_node(node, shape)),
            }
        }
        lines.push(render_node(END, NodeShape::Terminal));

        for entry in &self.entry_points {
            lines.push(render_edge(START, entry, None));
        }
        for edge in &self.edges {
            let label = edge.conditional.then_some("route");
            lines.push(render_edge(&edge.from, &edge.to, label));
        }

        if states.is_some() {
            lines.push(STYLE_DEFS.trim_end().to_string());
        }
        lines.join("\n")
    }
}

/// Built workflow graph representation.
pub struct BuiltWorkflowGraph<S: WorkflowState> {
    layout: GraphLayout,
    vertices: HashMap<String, BoxedVertex<S>>,
    conditionals: Vec<ConditionalRoute<S>>,
}

impl<S: WorkflowState> std::fmt::Debug for BuiltWorkflowGraph<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltWorkflowGraph")
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

impl<S: WorkflowState> BuiltWorkflowGraph<S> {
    pub fn name(&self) -> &str {
        &self.layout.name
    }

    pub fn layout(&self) -> &GraphLayout {
        &self.layout
    }

    /// Generate a Mermaid diagram of the graph
    pub fn to_mermaid(&self) -> String {
        self.layout.to_mermaid()
    }

    /// Compile into a runnable workflow
    pub fn compile(self, config: PregelConfig) -> CompiledWorkflow<S> {
        CompiledWorkflow::compile(self, config)
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        GraphLayout,
        HashMap<String, BoxedVertex<S>>,
        Vec<ConditionalRoute<S>>,
    ) {
        (self.layout, self.vertices, self.conditionals)
    }
}
