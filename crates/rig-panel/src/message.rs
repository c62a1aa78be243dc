//! Conversation turns
//!
//! A [`Message`] is one entry of the conversation log shared between the
//! workflow and the reasoning collaborator.

use serde::{Deserialize, Serialize};

/// Author of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions that frame the collaborator's behaviour
    System,
    /// Directives from the human operator
    Human,
    /// Text authored by the reasoning collaborator
    Agent,
}

/// A single turn of the conversation log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Optional tag distinguishing special entries (e.g. the final plan)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            name: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn human(content: impl Into<String>) -> Self {
        Self::new(Role::Human, content)
    }

    pub fn agent(content: impl Into<String>) -> Self {
        Self::new(Role::Agent, content)
    }

    /// Tag this message with a name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Check whether this message carries the given name
    pub fn is_named(&self, name: &str) -> bool {
        self.name.as_deref() == Some(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        assert_eq!(Message::system("rules").role, Role::System);
        assert_eq!(Message::human("hi").role, Role::Human);

        let plan = Message::agent("plan").with_name("treatment_plan");
        assert_eq!(plan.role, Role::Agent);
        assert!(plan.is_named("treatment_plan"));
        assert!(!plan.is_named("debate"));
    }

    #[test]
    fn test_serialization_omits_missing_name() {
        let json = serde_json::to_value(Message::human("hello")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "human", "content": "hello"}));

        let named = serde_json::to_value(Message::agent("x").with_name("debate")).unwrap();
        assert_eq!(named["name"], "debate");
    }
}
