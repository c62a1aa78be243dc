//! Adapter for using Rig Agents as the reasoning collaborator
//!
//! `RigAgentAdapter` wraps a Rig `Agent<M>` to implement [`LLMProvider`].
//! System turns are folded into the agent preamble, the last conversation
//! turn becomes the prompt and everything before it the chat history.
//!
//! # Usage
//!
//! ```rust,ignore
//! use rig::providers::openai::Client;
//! use rig::client::{CompletionClient, ProviderClient};
//! use rig_panel::compat::RigAgentAdapter;
//!
//! let client = Client::from_env();
//! let agent = client.agent("gpt-4o-mini").build();
//! let provider = RigAgentAdapter::new(agent);
//! ```

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use rig::agent::Agent;
use rig::completion::{Completion, CompletionModel, Message as RigMessage};
use rig::message::AssistantContent;
use rig::OneOrMany;

use crate::error::CollaboratorError;
use crate::llm::{LLMConfig, LLMProvider, LLMResponse, TokenUsage};
use crate::message::{Message, Role};

/// A Rig agent acting as the panel's reasoning collaborator
///
/// Every Rig failure is reported as retryable; wrap the adapter in a
/// [`RetryingProvider`](crate::llm::RetryingProvider) to act on that.
pub struct RigAgentAdapter<M>
where
    M: CompletionModel + Send + Sync,
{
    agent: Arc<Agent<M>>,
    provider_name: String,
    model_name: String,
}

impl<M> RigAgentAdapter<M>
where
    M: CompletionModel + Send + Sync,
{
    pub fn new(agent: Agent<M>) -> Self {
        Self::with_names(agent, "rig", "rig-agent")
    }

    /// Names appear in logs and in collaborator errors
    pub fn with_names(
        agent: Agent<M>,
        provider_name: impl Into<String>,
        model_name: impl Into<String>,
    ) -> Self {
        Self {
            agent: Arc::new(agent),
            provider_name: provider_name.into(),
            model_name: model_name.into(),
        }
    }

    pub fn agent(&self) -> &Agent<M> {
        &self.agent
    }

    fn unavailable(&self, err: impl std::fmt::Display) -> CollaboratorError {
        CollaboratorError::unavailable(
            self.provider_name.clone(),
            format!("Rig agent error: {}", err),
        )
    }
}

#[async_trait]
impl<M> LLMProvider for RigAgentAdapter<M>
where
    M: CompletionModel + Send + Sync + 'static,
{
    async fn complete(
        &self,
        messages: &[Message],
        config: Option<&LLMConfig>,
    ) -> Result<LLMResponse, CollaboratorError> {
        let RigConversation {
            prompt,
            history,
            preamble,
        } = build_rig_conversation(messages);
        let turns = history.len();

        let mut request = self
            .agent
            .completion(prompt, history)
            .await
            .map_err(|e| self.unavailable(e))?;

        // Node directives extend the agent's own preamble instead of replacing it
        if let Some(directive) = preamble {
            request = request.preamble(match self.agent.preamble.as_deref() {
                Some(base) => format!("{}\n\n{}", base, directive),
                None => directive,
            });
        }
        if let Some(temperature) = config.and_then(|c| c.temperature) {
            request = request.temperature(temperature);
        }
        if let Some(max_tokens) = config.and_then(|c| c.max_tokens) {
            request = request.max_tokens(max_tokens);
        }

        let response = request.send().await.map_err(|e| self.unavailable(e))?;
        let usage = TokenUsage::from_rig_usage(&response.usage);

        debug!(
            provider = %self.provider_name,
            model = %self.model_name,
            history = turns,
            tokens = usage.total_tokens,
            "Completion received"
        );

        let reply = LLMResponse::new(Message::agent(text_from_rig_choice(&response.choice)));
        Ok(if usage.is_empty() { reply } else { reply.with_usage(usage) })
    }

    fn name(&self) -> &str {
        &self.provider_name
    }

    fn default_model(&self) -> &str {
        &self.model_name
    }
}

struct RigConversation {
    prompt: RigMessage,
    history: Vec<RigMessage>,
    preamble: Option<String>,
}

fn build_rig_conversation(messages: &[Message]) -> RigConversation {
    let mut system_parts = Vec::new();
    let mut rig_messages = Vec::new();

    for message in messages {
        match message.role {
            Role::System => {
                if !message.content.trim().is_empty() {
                    system_parts.push(message.content.clone());
                }
            }
            Role::Human => rig_messages.push(RigMessage::user(message.content.clone())),
            Role::Agent => rig_messages.push(RigMessage::Assistant {
                id: None,
                content: OneOrMany::one(AssistantContent::text(message.content.clone())),
            }),
        }
    }

    RigConversation {
        prompt: rig_messages.pop().unwrap_or_else(|| RigMessage::user("")),
        history: rig_messages,
        preamble: (!system_parts.is_empty()).then(|| system_parts.join("\n\n")),
    }
}

/// Reply text; tool calls and reasoning parts are dropped
fn text_from_rig_choice(choice: &OneOrMany<AssistantContent>) -> String {
    choice
        .iter()
        .filter_map(|item| match item {
            AssistantContent::Text(text) => Some(text.text.as_str()),
            _ => None,
        })
        .collect()
}

impl<M> std::fmt::Debug for RigAgentAdapter<M>
where
    M: CompletionModel + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RigAgentAdapter")
            .field("provider_name", &self.provider_name)
            .field("model_name", &self.model_name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rig::message::UserContent;

    fn rig_message_text(message: &RigMessage) -> Option<String> {
        match message {
            RigMessage::User { content } => content.iter().find_map(|item| match item {
                UserContent::Text(text) => Some(text.text.clone()),
                _ => None,
            }),
            RigMessage::Assistant { content, .. } => content.iter().find_map(|item| match item {
                AssistantContent::Text(text) => Some(text.text.clone()),
                _ => None,
            }),
        }
    }

    #[test]
    fn test_build_rig_conversation_history_and_preamble() {
        let messages = vec![
            Message::system("panel rules"),
            Message::human("discuss cough"),
            Message::agent("Pulmonologist: consider asthma"),
            Message::human("continue"),
        ];

        let conversation = build_rig_conversation(&messages);

        assert_eq!(conversation.preamble, Some("panel rules".to_string()));
        assert_eq!(conversation.history.len(), 2);
        assert_eq!(rig_message_text(&conversation.history[0]).unwrap(), "discuss cough");
        assert_eq!(
            rig_message_text(&conversation.history[1]).unwrap(),
            "Pulmonologist: consider asthma"
        );
        assert_eq!(rig_message_text(&conversation.prompt).unwrap(), "continue");
    }

    #[test]
    fn test_multiple_system_turns_join_into_preamble() {
        let messages = vec![
            Message::system("first"),
            Message::system("  "),
            Message::system("second"),
            Message::human("go"),
        ];

        let conversation = build_rig_conversation(&messages);
        assert_eq!(conversation.preamble.as_deref(), Some("first\n\nsecond"));
        assert!(conversation.history.is_empty());
    }

    #[test]
    fn test_empty_conversation_prompts_with_empty_user_turn() {
        let conversation = build_rig_conversation(&[]);
        assert!(conversation.preamble.is_none());
        assert_eq!(rig_message_text(&conversation.prompt).unwrap(), "");
    }

    #[test]
    fn test_text_from_rig_choice_joins_text_parts() {
        let choice = OneOrMany::many(vec![
            AssistantContent::text("Final plan"),
            AssistantContent::text(" complete."),
        ])
        .unwrap();

        assert_eq!(text_from_rig_choice(&choice), "Final plan complete.");
    }
}
