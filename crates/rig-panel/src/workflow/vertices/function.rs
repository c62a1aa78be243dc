//! Closure-backed vertex
//!
//! Lets small graphs be assembled without a dedicated vertex type per node.

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use std::sync::Arc;

use crate::error::NodeError;
use crate::pregel::state::WorkflowState;
use crate::pregel::vertex::{ComputeContext, Vertex, VertexId};

/// Boxed async computation over a state snapshot
pub type VertexFn<S> = Arc<
    dyn Fn(&S) -> BoxFuture<'static, Result<<S as WorkflowState>::Update, NodeError>>
        + Send
        + Sync,
>;

/// Vertex whose computation is an async closure
///
/// The closure receives the snapshot by reference and must copy out what
/// the returned future needs.
pub struct FnVertex<S: WorkflowState> {
    id: VertexId,
    writes: &'static [&'static str],
    func: VertexFn<S>,
}

impl<S: WorkflowState> FnVertex<S> {
    pub fn new<F, Fut>(id: impl Into<VertexId>, writes: &'static [&'static str], func: F) -> Self
    where
        F: Fn(&S) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<S::Update, NodeError>> + Send + 'static,
    {
        Self {
            id: id.into(),
            writes,
            func: Arc::new(move |state: &S| func(state).boxed()),
        }
    }
}

impl<S: WorkflowState> Clone for FnVertex<S> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            writes: self.writes,
            func: Arc::clone(&self.func),
        }
    }
}

#[async_trait]
impl<S: WorkflowState> Vertex<S> for FnVertex<S> {
    fn id(&self) -> &VertexId {
        &self.id
    }

    fn writes(&self) -> &[&'static str] {
        self.writes
    }

    async fn compute(&self, ctx: &ComputeContext<'_, S>) -> Result<S::Update, NodeError> {
        (self.func)(ctx.state).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::pregel::{DynamicState, DynamicUpdate, StateSchema, ValueShape};
    use serde_json::json;
    use tokio_util::sync::CancellationToken;

    fn state() -> DynamicState {
        DynamicState::new(StateSchema::new().overwrite("topic", ValueShape::Text)).with("topic", "fever")
    }

    #[tokio::test]
    async fn test_fn_vertex_reads_snapshot() {
        let vertex = FnVertex::new("shout", &["topic"], |s: &DynamicState| {
            let topic = s.get("topic").and_then(|v| v.as_str()).unwrap_or_default().to_uppercase();
            async move { Ok(DynamicUpdate::new().set("topic", topic)) }
        });
        let snapshot = state();
        let ctx = ComputeContext::new(vertex.id().clone(), &snapshot, 0, 0, CancellationToken::new());

        let update = vertex.compute(&ctx).await.unwrap();
        assert_eq!(update.0.get("topic"), Some(&json!("FEVER")));
        assert_eq!(vertex.writes(), &["topic"]);
    }

    #[tokio::test]
    async fn test_fn_vertex_propagates_error() {
        let vertex = FnVertex::new("broken", &[], |_: &DynamicState| async {
            Err(NodeError::parse_failure("not json"))
        });
        let snapshot = state();
        let ctx = ComputeContext::new(vertex.id().clone(), &snapshot, 0, 0, CancellationToken::new());

        let err = vertex.compute(&ctx).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ParseFailure);
    }
}
