//! Vertex (Node) abstractions for the Pregel runtime
//!
//! A Vertex is a named unit of work. It reads a snapshot of the workflow
//! state and returns a partial update; the runtime validates and commits the
//! update, then schedules the vertex's successors.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::hash::Hash;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::state::WorkflowState;
use crate::error::NodeError;

/// Unique identifier for a vertex in the workflow graph
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VertexId(pub String);

impl VertexId {
    /// Create a new VertexId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for VertexId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for VertexId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&String> for VertexId {
    fn from(s: &String) -> Self {
        Self(s.clone())
    }
}

impl std::fmt::Display for VertexId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Scheduling status of a vertex within one run
///
/// - `Pending`: not yet reached by any predecessor
/// - `Ready`: admitted to the frontier, waiting to be spawned
/// - `Running`: computing
/// - `BlockedOnJoin`: some, but not all, join predecessors have committed
/// - `Completed`: last invocation committed its update
/// - `Failed`: last invocation failed and aborted the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VertexState {
    #[default]
    Pending,
    Ready,
    Running,
    BlockedOnJoin,
    Completed,
    Failed,
}

impl VertexState {
    /// Check if the vertex is queued or computing
    pub fn is_active(&self) -> bool {
        matches!(self, VertexState::Ready | VertexState::Running)
    }

    /// Check if the vertex is waiting at a join barrier
    pub fn is_blocked(&self) -> bool {
        matches!(self, VertexState::BlockedOnJoin)
    }

    /// Check if the vertex has committed at least once
    pub fn is_completed(&self) -> bool {
        matches!(self, VertexState::Completed)
    }

    /// Check if the vertex failed
    pub fn is_failed(&self) -> bool {
        matches!(self, VertexState::Failed)
    }
}

/// Trait for partial state updates produced by vertex computation
///
/// Updates must serialize to a JSON field map so the runtime can validate them
/// against the state schema before committing.
pub trait StateUpdate: Clone + Send + Sync + Serialize + 'static {
    /// Create an empty (no-op) update
    fn empty() -> Self;

    /// Check if this update has no effect
    fn is_empty(&self) -> bool;
}

/// Context provided to a vertex during computation
pub struct ComputeContext<'a, S> {
    /// Read-only snapshot of the state visible to this vertex
    pub state: &'a S,
    /// Number of earlier invocations of this vertex in the current run
    pub invocation: usize,
    /// Global invocation counter of the run (0-indexed)
    pub step: usize,
    vertex_id: VertexId,
    cancellation: CancellationToken,
}

impl<'a, S> ComputeContext<'a, S> {
    /// Create a new compute context
    pub fn new(
        vertex_id: VertexId,
        state: &'a S,
        invocation: usize,
        step: usize,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            state,
            invocation,
            step,
            vertex_id,
            cancellation,
        }
    }

    /// Get the current vertex ID
    pub fn id(&self) -> &VertexId {
        &self.vertex_id
    }

    /// Check if this is the vertex's first invocation in the run
    pub fn is_first_invocation(&self) -> bool {
        self.invocation == 0
    }

    /// Cancellation token of the run, for collaborators that support it
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Check if the run has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

/// The core vertex trait
///
/// A vertex must treat the state snapshot as read-only and report failure by
/// returning a [`NodeError`] rather than producing a partial update.
///
/// # Example
///
/// ```ignore
/// struct MergeEvidence {
///     id: VertexId,
/// }
///
/// #[async_trait]
/// impl Vertex<PanelState> for MergeEvidence {
///     fn id(&self) -> &VertexId {
///         &self.id
///     }
///
///     fn writes(&self) -> &[&'static str] {
///         &["evidence"]
///     }
///
///     async fn compute(
///         &self,
///         ctx: &ComputeContext<'_, PanelState>,
///     ) -> Result<PanelUpdate, NodeError> {
///         Ok(PanelUpdate::merged_evidence(ctx.state.evidence.join("\n\n")))
///     }
/// }
/// ```
#[async_trait]
pub trait Vertex<S: WorkflowState>: Send + Sync {
    /// Get the vertex ID
    fn id(&self) -> &VertexId;

    /// Fields this vertex may write
    fn writes(&self) -> &[&'static str];

    /// Compute a partial update from the given state snapshot
    async fn compute(&self, ctx: &ComputeContext<'_, S>) -> Result<S::Update, NodeError>;
}

/// Type alias for a shared vertex
pub type BoxedVertex<S> = Arc<dyn Vertex<S>>;
