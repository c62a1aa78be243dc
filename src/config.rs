//! # Configuration Module
//!
//! Loads the panel settings from environment variables (and a `.env` file
//! when present) and turns them into the library's [`PanelConfig`].

use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use rig_panel::config::DEFAULT_MODEL;
use rig_panel::{LLMConfig, PanelConfig, RetryPolicy};

// =============================================================================
// CONFIGURATION STRUCT
// =============================================================================
/// Settings of the medical-panel binary.
///
/// API keys are not stored here: `OPENAI_API_KEY` is read by the Rig client
/// and `TAVILY_API_KEY` by the Tavily client.
#[derive(Debug, Clone)]
pub struct Config {
    /// OpenAI model used for every reasoning call
    pub model: String,

    /// Sampling temperature (0.0 = deterministic)
    pub temperature: f64,

    /// Number of specialists on the panel
    pub max_experts: usize,

    /// Upper bound on debate turns
    pub max_turns: usize,

    /// Documents requested from the web search
    pub web_max_results: usize,

    /// Articles requested from Wikipedia
    pub wiki_max_docs: usize,

    /// Wikipedia language edition (e.g. "en")
    pub wiki_language: String,

    /// Retries per collaborator call on transient failures
    pub collaborator_retries: usize,

    /// Per-node timeout
    pub node_timeout: Duration,

    /// Log filter used when RUST_LOG is not set
    pub log_level: String,
}

// =============================================================================
// DEFAULT IMPLEMENTATION
// =============================================================================
impl Default for Config {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.0,
            max_experts: 3,
            max_turns: 1,
            web_max_results: 2,
            wiki_max_docs: 3,
            wiki_language: "en".to_string(),
            collaborator_retries: 2,
            node_timeout: Duration::from_secs(300),
            log_level: "info".to_string(),
        }
    }
}

// =============================================================================
// CONFIGURATION LOADING
// =============================================================================
/// Parse an optional environment variable, keeping `current` when it is unset.
///
/// `.context()` attaches the variable name so a typo in `.env` reads clearly.
fn parse_var<T>(name: &str, current: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(val) => val
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {:?}", name, val)),
        Err(_) => Ok(current),
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Example
    /// ```ignore
    /// let config = Config::from_env()?;
    /// println!("Using model: {}", config.model);
    /// ```
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (silently ignore if not found)
        let _ = dotenvy::dotenv();

        let defaults = Config::default();

        let config = Config {
            model: env::var("OPENAI_MODEL").unwrap_or(defaults.model),
            temperature: parse_var("TEMPERATURE", defaults.temperature)?,
            max_experts: parse_var("MAX_EXPERTS", defaults.max_experts)?,
            max_turns: parse_var("MAX_TURNS", defaults.max_turns)?,
            web_max_results: parse_var("WEB_MAX_RESULTS", defaults.web_max_results)?,
            wiki_max_docs: parse_var("WIKI_MAX_DOCS", defaults.wiki_max_docs)?,
            wiki_language: env::var("WIKI_LANGUAGE").unwrap_or(defaults.wiki_language),
            collaborator_retries: parse_var("COLLABORATOR_RETRIES", defaults.collaborator_retries)?,
            node_timeout: Duration::from_secs(parse_var(
                "NODE_TIMEOUT_SECS",
                defaults.node_timeout.as_secs(),
            )?),
            log_level: env::var("RUST_LOG").unwrap_or(defaults.log_level),
        };

        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// Fail fast with a clear message instead of failing halfway through a run.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.temperature) {
            anyhow::bail!(
                "Temperature must be between 0.0 and 2.0, got: {}",
                self.temperature
            );
        }

        if self.max_experts == 0 {
            anyhow::bail!("MAX_EXPERTS must be at least 1");
        }

        if self.max_turns == 0 {
            anyhow::bail!("MAX_TURNS must be at least 1");
        }

        if self.model.trim().is_empty() {
            anyhow::bail!("OPENAI_MODEL cannot be empty");
        }

        if self.wiki_language.trim().is_empty()
            || !self.wiki_language.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            anyhow::bail!("WIKI_LANGUAGE must be a language code like \"en\", got: {:?}", self.wiki_language);
        }

        if self.node_timeout.is_zero() {
            anyhow::bail!("NODE_TIMEOUT_SECS must be at least 1");
        }

        Ok(())
    }

    /// Library settings for a panel run
    pub fn panel_config(&self) -> PanelConfig {
        let pregel = PanelConfig::default()
            .pregel
            .with_vertex_timeout(self.node_timeout);

        PanelConfig::new()
            .with_web_max_results(self.web_max_results)
            .with_encyclopedia_max_docs(self.wiki_max_docs)
            .with_max_turns(self.max_turns)
            .with_llm(LLMConfig::new(&self.model).with_temperature(self.temperature))
            .with_pregel(pregel)
    }

    /// Backoff used by every collaborator wrapper
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.collaborator_retries)
    }
}

// =============================================================================
// UNIT TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.max_experts, 3);
        assert_eq!(config.max_turns, 1);
        assert_eq!(config.web_max_results, 2);
        assert_eq!(config.wiki_max_docs, 3);
        assert!(config.temperature.abs() < f64::EPSILON);
    }

    #[test]
    fn test_config_validation_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_temperature() {
        let config = Config {
            temperature: 3.0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_experts() {
        let config = Config {
            max_experts: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_bad_language() {
        let config = Config {
            wiki_language: "en/../../x".into(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_panel_config_mapping() {
        let config = Config {
            max_turns: 3,
            web_max_results: 4,
            node_timeout: Duration::from_secs(42),
            ..Config::default()
        };
        let panel = config.panel_config();

        assert_eq!(panel.max_turns, 3);
        assert_eq!(panel.web_max_results, 4);
        assert_eq!(panel.encyclopedia_max_docs, 3);
        assert_eq!(panel.llm.model, DEFAULT_MODEL);
        assert_eq!(panel.pregel.vertex_timeout, Duration::from_secs(42));
    }
}
