//! Request settings and token accounting for the reasoning collaborator

use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Tokens consumed by one or more completions
///
/// ```
/// use rig_panel::llm::TokenUsage;
///
/// let run: TokenUsage = [TokenUsage::new(120, 40), TokenUsage::new(300, 90)]
///     .into_iter()
///     .sum();
/// assert_eq!(run.total_tokens, 550);
/// ```
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
        }
    }

    /// Usage reported by a Rig completion
    pub fn from_rig_usage(usage: &rig::completion::Usage) -> Self {
        Self::new(usage.input_tokens, usage.output_tokens)
    }

    pub fn is_empty(&self) -> bool {
        self.total_tokens == 0
    }
}

impl Add for TokenUsage {
    type Output = Self;

    fn add(mut self, other: Self) -> Self {
        self += other;
        self
    }
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, other: Self) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.total_tokens += other.total_tokens;
    }
}

impl Sum for TokenUsage {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

/// Per-call overrides passed to [`LLMProvider`](super::LLMProvider)
///
/// Unset fields leave the collaborator's own defaults in place. Panel runs
/// use temperature 0.0 so that repeated runs stay comparable.
///
/// ```
/// use rig_panel::llm::LLMConfig;
///
/// let config = LLMConfig::new("gpt-4.1").with_temperature(0.0);
/// assert_eq!(config.temperature, Some(0.0));
/// assert_eq!(config.max_tokens, None);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LLMConfig {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u64>,
}

impl LLMConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Cap on generated tokens; plans can be long, so leave unset unless needed
    pub fn with_max_tokens(mut self, max_tokens: u64) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}
