//! Merge-Evidence: join of the two retrieval branches

use async_trait::async_trait;
use tracing::debug;

use crate::error::NodeError;
use crate::panel::state::{fields, PanelState, PanelUpdate};
use crate::pregel::vertex::{ComputeContext, Vertex, VertexId};

/// Separator between evidence blocks in the merged block
pub const EVIDENCE_SEPARATOR: &str = "\n\n";

/// Collapses the evidence sequence into one combined block
///
/// Idempotent: an already-merged single block is rewritten unchanged.
pub struct MergeEvidence {
    id: VertexId,
}

impl MergeEvidence {
    pub fn new(id: impl Into<VertexId>) -> Self {
        Self { id: id.into() }
    }
}

#[async_trait]
impl Vertex<PanelState> for MergeEvidence {
    fn id(&self) -> &VertexId {
        &self.id
    }

    fn writes(&self) -> &[&'static str] {
        &[fields::EVIDENCE]
    }

    async fn compute(&self, ctx: &ComputeContext<'_, PanelState>) -> Result<PanelUpdate, NodeError> {
        let evidence = &ctx.state.evidence;
        if evidence.is_empty() {
            return Ok(PanelUpdate::default());
        }

        debug!(vertex = %self.id, blocks = evidence.len(), "Merging evidence");
        Ok(PanelUpdate::merged_evidence(evidence.join(EVIDENCE_SEPARATOR)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::nodes::testing::ctx;
    use crate::pregel::state::WorkflowState;
    use crate::pregel::vertex::StateUpdate;

    #[tokio::test]
    async fn test_merges_blocks_in_order() {
        let mut state = PanelState::new("cough", 1);
        state.evidence = vec!["web block".into(), "wiki block".into()];

        let node = MergeEvidence::new("merge_evidence");
        let update = node.compute(&ctx("merge_evidence", &state)).await.unwrap();
        let merged = state.apply_update(update);

        assert_eq!(merged.evidence, vec!["web block\n\nwiki block"]);
    }

    #[tokio::test]
    async fn test_merge_is_idempotent() {
        let mut state = PanelState::new("cough", 1);
        state.evidence = vec!["a".into(), "b".into()];
        let node = MergeEvidence::new("merge_evidence");

        let once = state.apply_update(node.compute(&ctx("merge_evidence", &state)).await.unwrap());
        let twice = once.apply_update(node.compute(&ctx("merge_evidence", &once)).await.unwrap());

        assert_eq!(once.evidence, twice.evidence);
        assert_eq!(twice.evidence.len(), 1);
    }

    #[tokio::test]
    async fn test_no_evidence_writes_nothing() {
        let state = PanelState::new("cough", 1);
        let node = MergeEvidence::new("merge_evidence");
        let update = node.compute(&ctx("merge_evidence", &state)).await.unwrap();
        assert!(update.is_empty());
    }
}
