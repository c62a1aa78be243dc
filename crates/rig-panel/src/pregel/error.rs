//! Error types for the Pregel runtime
//!
//! Every failure maps to an [`ErrorKind`] and, where one is involved, names
//! the vertex that caused it.

use super::schema::SchemaViolation;
use super::vertex::VertexId;
use crate::error::{BoxError, ErrorKind, NodeError};
use crate::workflow::WorkflowBuildError;
use thiserror::Error;

/// Errors that can occur during Pregel runtime execution
#[derive(Debug, Error)]
pub enum PregelError {
    /// Invocation budget exhausted
    #[error("Max steps exceeded: {0}")]
    MaxStepsExceeded(usize),

    /// Vertex computation timed out
    #[error("Vertex timeout: {0}")]
    VertexTimeout(VertexId),

    /// Error returned by a vertex computation
    #[error("Vertex {vertex_id} failed ({kind}): {message}")]
    VertexError {
        vertex_id: VertexId,
        kind: ErrorKind,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// A committed update did not satisfy the state schema
    #[error("Schema violation in {vertex_id}: {violation}")]
    SchemaViolation {
        vertex_id: VertexId,
        #[source]
        violation: SchemaViolation,
    },

    /// A join could not collect all of its predecessors
    #[error("Join {vertex_id} incomplete, missing: {missing:?}")]
    JoinIncomplete {
        vertex_id: VertexId,
        missing: Vec<VertexId>,
    },

    /// Error during routing decision
    #[error("Routing error in {vertex_id}: {decision}")]
    RoutingError { vertex_id: VertexId, decision: String },

    /// A vertex task panicked or was aborted
    #[error("Vertex task {vertex_id} aborted: {message}")]
    TaskAborted { vertex_id: VertexId, message: String },

    /// Error in workflow state management
    #[error("State error: {0}")]
    StateError(String),

    /// The graph definition is invalid
    #[error("Invalid workflow graph: {0}")]
    InvalidGraph(#[from] WorkflowBuildError),

    /// Invalid run parameters
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid workflow configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Workflow terminated by the caller
    #[error("Workflow cancelled")]
    Cancelled,

    /// Workflow execution timed out
    #[error("Workflow timeout after {0:?}")]
    WorkflowTimeout(std::time::Duration),
}

impl PregelError {
    /// Wrap a vertex's failure
    pub fn from_node_error(vertex_id: impl Into<VertexId>, err: NodeError) -> Self {
        Self::VertexError {
            vertex_id: vertex_id.into(),
            kind: err.kind,
            message: err.message,
            source: err.source,
        }
    }

    /// Create a vertex error with a message
    pub fn vertex_error(
        vertex_id: impl Into<VertexId>,
        kind: ErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self::VertexError {
            vertex_id: vertex_id.into(),
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a routing error
    pub fn routing_error(vertex_id: impl Into<VertexId>, decision: impl Into<String>) -> Self {
        Self::RoutingError {
            vertex_id: vertex_id.into(),
            decision: decision.into(),
        }
    }

    /// Create a state error
    pub fn state_error(message: impl Into<String>) -> Self {
        Self::StateError(message.into())
    }

    /// Create a config error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Category of this failure
    pub fn kind(&self) -> ErrorKind {
        match self {
            PregelError::VertexError { kind, .. } => *kind,
            PregelError::SchemaViolation { .. } => ErrorKind::SchemaViolation,
            PregelError::JoinIncomplete { .. } => ErrorKind::JoinIncomplete,
            PregelError::RoutingError { .. } => ErrorKind::Routing,
            PregelError::VertexTimeout(_) | PregelError::WorkflowTimeout(_) => ErrorKind::Timeout,
            PregelError::MaxStepsExceeded(_) => ErrorKind::StepLimit,
            PregelError::Cancelled => ErrorKind::Cancelled,
            PregelError::InvalidGraph(_)
            | PregelError::InvalidInput(_)
            | PregelError::ConfigError(_) => ErrorKind::InvalidInput,
            PregelError::TaskAborted { .. } | PregelError::StateError(_) => ErrorKind::Internal,
        }
    }

    /// The vertex responsible for the failure, if any
    pub fn vertex_id(&self) -> Option<&VertexId> {
        match self {
            PregelError::VertexTimeout(id) => Some(id),
            PregelError::VertexError { vertex_id, .. }
            | PregelError::SchemaViolation { vertex_id, .. }
            | PregelError::JoinIncomplete { vertex_id, .. }
            | PregelError::RoutingError { vertex_id, .. }
            | PregelError::TaskAborted { vertex_id, .. } => Some(vertex_id),
            _ => None,
        }
    }

    /// Check if the error is a timeout
    pub fn is_timeout(&self) -> bool {
        self.kind() == ErrorKind::Timeout
    }
}

#[cfg(test)]
mod tests {
    // Ensure errors are Send + Sync (compile-time check)
    static_assertions::assert_impl_all!(super::PregelError: Send, Sync);
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PregelError::MaxStepsExceeded(100);
        assert_eq!(format!("{}", err), "Max steps exceeded: 100");
        assert_eq!(err.kind(), ErrorKind::StepLimit);
    }

    #[test]
    fn test_from_node_error_keeps_kind_and_vertex() {
        let node_err = NodeError::unavailable("tavily down")
            .with_source(std::io::Error::other("connection refused"));
        let err = PregelError::from_node_error("retrieve_web", node_err);

        assert_eq!(err.kind(), ErrorKind::CollaboratorUnavailable);
        assert_eq!(err.vertex_id().map(VertexId::as_str), Some("retrieve_web"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_vertex_timeout() {
        let err = PregelError::VertexTimeout(VertexId::from("slow_node"));
        assert!(format!("{}", err).contains("slow_node"));
        assert!(err.is_timeout());
    }

    #[test]
    fn test_schema_violation_kind() {
        let err = PregelError::SchemaViolation {
            vertex_id: "merge".into(),
            violation: SchemaViolation::NotASequence("evidence".into()),
        };
        assert_eq!(err.kind(), ErrorKind::SchemaViolation);
        assert!(err.to_string().contains("evidence"));
    }

    #[test]
    fn test_join_incomplete_names_missing_branches() {
        let err = PregelError::JoinIncomplete {
            vertex_id: "merge_evidence".into(),
            missing: vec!["retrieve_web".into()],
        };
        assert_eq!(err.kind(), ErrorKind::JoinIncomplete);
        assert!(err.to_string().contains("retrieve_web"));
    }

    #[test]
    fn test_kinds_without_vertex() {
        assert_eq!(PregelError::Cancelled.kind(), ErrorKind::Cancelled);
        assert!(PregelError::Cancelled.vertex_id().is_none());
        assert_eq!(
            PregelError::invalid_input("empty symptom").kind(),
            ErrorKind::InvalidInput
        );
        assert!(PregelError::WorkflowTimeout(std::time::Duration::from_secs(1)).is_timeout());
    }
}
