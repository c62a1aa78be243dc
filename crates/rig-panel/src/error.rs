//! Error types shared by collaborators and workflow nodes
//!
//! Collaborators (reasoning, web search, encyclopedia) fail with
//! [`CollaboratorError`]. Nodes surface failures as [`NodeError`], which the
//! engine wraps with the failing vertex id. Every failure is classified by an
//! [`ErrorKind`] so callers can branch on the category without matching on
//! concrete variants.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Boxed error used for `#[source]` chains
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Category of a workflow failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Structured output did not match the requested schema
    ParseFailure,
    /// An external reasoning or retrieval call could not be completed
    CollaboratorUnavailable,
    /// A node wrote an undeclared field or a wrong-shaped value
    SchemaViolation,
    /// A join was reached without all of its predecessors committed
    JoinIncomplete,
    /// A routing decision named an unknown or undeclared target
    Routing,
    /// A node or the whole run exceeded its time budget
    Timeout,
    /// The run exceeded its node invocation budget
    StepLimit,
    /// The run was cancelled by the caller
    Cancelled,
    /// The caller supplied invalid run parameters or an invalid graph
    InvalidInput,
    /// A node panicked or the engine hit an unexpected condition
    Internal,
}

impl ErrorKind {
    /// Stable name of the kind, used in logs and JSON output
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ParseFailure => "ParseFailure",
            ErrorKind::CollaboratorUnavailable => "CollaboratorUnavailable",
            ErrorKind::SchemaViolation => "SchemaViolation",
            ErrorKind::JoinIncomplete => "JoinIncomplete",
            ErrorKind::Routing => "Routing",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::StepLimit => "StepLimit",
            ErrorKind::Cancelled => "Cancelled",
            ErrorKind::InvalidInput => "InvalidInput",
            ErrorKind::Internal => "Internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure reported by an external collaborator
#[derive(Debug, Error)]
pub enum CollaboratorError {
    /// The collaborator answered, but the answer could not be decoded
    #[error("Failed to parse {target}: {message}")]
    ParseFailure {
        /// Name of the type that was requested
        target: String,
        message: String,
        /// The raw collaborator output, kept for diagnostics
        raw: String,
    },

    /// The collaborator could not be reached or refused the request
    #[error("{collaborator} unavailable: {message}")]
    Unavailable {
        collaborator: String,
        message: String,
        /// Whether repeating the call may succeed
        retryable: bool,
        #[source]
        source: Option<BoxError>,
    },
}

impl CollaboratorError {
    /// Create a parse failure for `target`
    pub fn parse_failure(
        target: impl Into<String>,
        message: impl Into<String>,
        raw: impl Into<String>,
    ) -> Self {
        Self::ParseFailure {
            target: target.into(),
            message: message.into(),
            raw: raw.into(),
        }
    }

    /// Create a transient unavailability error
    pub fn unavailable(collaborator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unavailable {
            collaborator: collaborator.into(),
            message: message.into(),
            retryable: true,
            source: None,
        }
    }

    /// Create an unavailability error that retrying will not fix
    pub fn permanent(collaborator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unavailable {
            collaborator: collaborator.into(),
            message: message.into(),
            retryable: false,
            source: None,
        }
    }

    /// Attach an underlying cause
    pub fn with_source(self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        match self {
            Self::Unavailable {
                collaborator,
                message,
                retryable,
                ..
            } => Self::Unavailable {
                collaborator,
                message,
                retryable,
                source: Some(Box::new(cause)),
            },
            other => other,
        }
    }

    /// Category of this failure
    pub fn kind(&self) -> ErrorKind {
        match self {
            CollaboratorError::ParseFailure { .. } => ErrorKind::ParseFailure,
            CollaboratorError::Unavailable { .. } => ErrorKind::CollaboratorUnavailable,
        }
    }

    /// Check if a retry wrapper should repeat the call
    pub fn is_retryable(&self) -> bool {
        matches!(self, CollaboratorError::Unavailable { retryable: true, .. })
    }
}

/// Failure returned by a node's computation
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct NodeError {
    pub kind: ErrorKind,
    pub message: String,
    #[source]
    pub source: Option<BoxError>,
}

impl NodeError {
    /// Create a node error of the given kind
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a parse failure
    pub fn parse_failure(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ParseFailure, message)
    }

    /// Create a collaborator unavailability error
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CollaboratorUnavailable, message)
    }

    /// Attach an underlying cause
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl From<CollaboratorError> for NodeError {
    fn from(err: CollaboratorError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static_assertions::assert_impl_all!(CollaboratorError: Send, Sync);
    static_assertions::assert_impl_all!(NodeError: Send, Sync);

    #[test]
    fn test_collaborator_error_kinds() {
        let parse = CollaboratorError::parse_failure("ExpertPanel", "missing field", "{}");
        assert_eq!(parse.kind(), ErrorKind::ParseFailure);
        assert!(!parse.is_retryable());

        let down = CollaboratorError::unavailable("tavily", "connection reset");
        assert_eq!(down.kind(), ErrorKind::CollaboratorUnavailable);
        assert!(down.is_retryable());

        let denied = CollaboratorError::permanent("tavily", "unauthorized");
        assert_eq!(denied.kind(), ErrorKind::CollaboratorUnavailable);
        assert!(!denied.is_retryable());
    }

    #[test]
    fn test_node_error_from_collaborator_keeps_cause() {
        let err: NodeError = CollaboratorError::unavailable("wikipedia", "timeout").into();
        assert_eq!(err.kind, ErrorKind::CollaboratorUnavailable);
        assert!(err.message.contains("wikipedia"));

        let source = std::error::Error::source(&err).expect("cause should be kept");
        assert!(source.to_string().contains("timeout"));
    }

    #[test]
    fn test_error_display() {
        let err = NodeError::parse_failure("expected 3 experts, got 2");
        assert_eq!(err.to_string(), "ParseFailure: expected 3 experts, got 2");
    }

    #[test]
    fn test_with_source_on_unavailable() {
        let io = std::io::Error::other("socket closed");
        let err = CollaboratorError::unavailable("llm", "send failed").with_source(io);
        let source = std::error::Error::source(&err).expect("source attached");
        assert_eq!(source.to_string(), "socket closed");
    }
}
