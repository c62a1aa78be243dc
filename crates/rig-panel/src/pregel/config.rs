//! Pregel runtime configuration
//!
//! Configuration for the execution engine: invocation budget, parallelism
//! and timeouts.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::error::PregelError;

/// Floor for the default concurrency limit
///
/// Vertices spend their time awaiting collaborators, so the CPU count is a
/// poor bound on how many should be in flight.
pub const MIN_DEFAULT_PARALLELISM: usize = 16;

/// Limits applied to one workflow run
///
/// The panel graph runs six vertices per debate turn, so the default step
/// budget leaves ample room for a multi-turn debate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PregelConfig {
    /// Maximum vertex invocations per run (guards cyclic graphs)
    pub max_steps: usize,

    /// Maximum concurrent vertex computations
    pub parallelism: usize,

    /// Timeout for individual vertex computation
    #[serde(with = "humantime_serde")]
    pub vertex_timeout: Duration,

    /// Timeout for entire workflow
    #[serde(with = "humantime_serde")]
    pub workflow_timeout: Duration,

    /// Record a run trace of scheduling events
    pub tracing_enabled: bool,
}

impl Default for PregelConfig {
    fn default() -> Self {
        Self {
            max_steps: 100,
            parallelism: num_cpus::get().max(MIN_DEFAULT_PARALLELISM),
            vertex_timeout: Duration::from_secs(300),    // 5 min per vertex
            workflow_timeout: Duration::from_secs(3600), // 1 hour total
            tracing_enabled: true,
        }
    }
}

impl PregelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject limits that would stop every run before it starts
    pub fn validate(&self) -> Result<(), PregelError> {
        if self.max_steps == 0 {
            return Err(PregelError::config_error("max_steps must be at least 1"));
        }
        if self.vertex_timeout.is_zero() || self.workflow_timeout.is_zero() {
            return Err(PregelError::config_error("timeouts must be non-zero"));
        }
        Ok(())
    }

    pub fn with_max_steps(mut self, max: usize) -> Self {
        self.max_steps = max;
        self
    }

    /// Concurrent vertex computations; clamped to at least one
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    pub fn with_vertex_timeout(mut self, timeout: Duration) -> Self {
        self.vertex_timeout = timeout;
        self
    }

    pub fn with_workflow_timeout(mut self, timeout: Duration) -> Self {
        self.workflow_timeout = timeout;
        self
    }

    /// Enable or disable the run trace
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.tracing_enabled = enabled;
        self
    }
}
