//! Panel workflow configuration
//!
//! Serde-loadable settings for one panel run. Durations inside the engine
//! configuration use humantime strings (`"30s"`, `"5m"`).

use serde::{Deserialize, Serialize};

use crate::llm::LLMConfig;
use crate::pregel::PregelConfig;

/// Default model requested from the reasoning collaborator
pub const DEFAULT_MODEL: &str = "gpt-4.1";

/// Settings of a panel run
///
/// # Example
///
/// ```
/// use rig_panel::config::PanelConfig;
///
/// let config: PanelConfig = serde_json::from_str(
///     r#"{"web_max_results": 5, "pregel": {"vertex_timeout": "90s"}}"#,
/// ).unwrap();
///
/// assert_eq!(config.web_max_results, 5);
/// assert_eq!(config.encyclopedia_max_docs, 3);
/// assert_eq!(config.pregel.vertex_timeout.as_secs(), 90);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    /// Documents requested from the web search
    pub web_max_results: usize,

    /// Articles requested from the encyclopedia
    pub encyclopedia_max_docs: usize,

    /// Upper bound on debate turns
    pub max_turns: usize,

    /// Overrides passed with every reasoning call
    pub llm: LLMConfig,

    /// Engine settings
    pub pregel: PregelConfig,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            web_max_results: 2,
            encyclopedia_max_docs: 3,
            max_turns: 1,
            llm: LLMConfig::new(DEFAULT_MODEL).with_temperature(0.0),
            pregel: PregelConfig::default(),
        }
    }
}

impl PanelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_web_max_results(mut self, n: usize) -> Self {
        self.web_max_results = n;
        self
    }

    pub fn with_encyclopedia_max_docs(mut self, n: usize) -> Self {
        self.encyclopedia_max_docs = n;
        self
    }

    pub fn with_max_turns(mut self, turns: usize) -> Self {
        self.max_turns = turns;
        self
    }

    pub fn with_llm(mut self, llm: LLMConfig) -> Self {
        self.llm = llm;
        self
    }

    pub fn with_pregel(mut self, pregel: PregelConfig) -> Self {
        self.pregel = pregel;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_defaults() {
        let config = PanelConfig::default();
        assert_eq!(config.web_max_results, 2);
        assert_eq!(config.encyclopedia_max_docs, 3);
        assert_eq!(config.max_turns, 1);
        assert_eq!(config.llm.temperature, Some(0.0));
        assert_eq!(config.pregel.max_steps, 100);
    }

    #[test]
    fn test_builders() {
        let config = PanelConfig::new()
            .with_max_turns(3)
            .with_web_max_results(4)
            .with_encyclopedia_max_docs(1)
            .with_pregel(PregelConfig::new().with_vertex_timeout(Duration::from_secs(5)));

        assert_eq!(config.max_turns, 3);
        assert_eq!(config.web_max_results, 4);
        assert_eq!(config.encyclopedia_max_docs, 1);
        assert_eq!(config.pregel.vertex_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_serde_roundtrip_keeps_durations() {
        let config = PanelConfig::new().with_max_turns(2);
        let json = serde_json::to_string(&config).unwrap();
        let back: PanelConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
