//! LLM Provider trait definition
//!
//! Defines the reasoning collaborator. Implementations bridge to specific
//! providers via Rig's CompletionModel trait (see
//! [`RigAgentAdapter`](crate::compat::RigAgentAdapter)) or are deterministic
//! fakes in tests.

use async_trait::async_trait;

use super::config::{LLMConfig, TokenUsage};
use crate::error::CollaboratorError;
use crate::message::Message;

/// LLM completion response
#[derive(Debug, Clone)]
pub struct LLMResponse {
    /// The agent-authored reply
    pub message: Message,
    /// Token usage statistics (if available from provider)
    pub usage: Option<TokenUsage>,
}

impl LLMResponse {
    /// Create a new response with just a message
    pub fn new(message: Message) -> Self {
        Self {
            message,
            usage: None,
        }
    }

    /// Add token usage statistics to the response
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }
}

/// Core LLM Provider trait
///
/// # Example Implementation
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use rig_panel::llm::{LLMConfig, LLMProvider, LLMResponse};
///
/// struct Echo;
///
/// #[async_trait]
/// impl LLMProvider for Echo {
///     async fn complete(
///         &self,
///         messages: &[Message],
///         _config: Option<&LLMConfig>,
///     ) -> Result<LLMResponse, CollaboratorError> {
///         let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
///         Ok(LLMResponse::new(Message::agent(last)))
///     }
///
///     fn name(&self) -> &str { "echo" }
///     fn default_model(&self) -> &str { "echo-1" }
/// }
/// ```
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate a completion for a full request
    ///
    /// # Arguments
    /// * `messages` - System directives followed by the conversation
    /// * `config` - Optional runtime configuration overrides
    async fn complete(
        &self,
        messages: &[Message],
        config: Option<&LLMConfig>,
    ) -> Result<LLMResponse, CollaboratorError>;

    /// Free-text generation: `directive` framed as a system turn ahead of `conversation`
    async fn generate(
        &self,
        directive: &str,
        conversation: &[Message],
        config: Option<&LLMConfig>,
    ) -> Result<String, CollaboratorError> {
        let mut messages = Vec::with_capacity(conversation.len() + 1);
        messages.push(Message::system(directive));
        messages.extend_from_slice(conversation);

        let response = self.complete(&messages, config).await?;
        Ok(response.message.content)
    }

    /// Provider name for logging/debugging
    fn name(&self) -> &str;

    /// Default model identifier for this provider
    fn default_model(&self) -> &str;
}
