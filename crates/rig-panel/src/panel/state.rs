//! Shared state of a panel run
//!
//! | field         | policy    | written by                       |
//! |---------------|-----------|----------------------------------|
//! | `symptom`     | overwrite | seeded                           |
//! | `max_experts` | overwrite | seeded                           |
//! | `guidance`    | overwrite | seeded                           |
//! | `max_turns`   | overwrite | seeded                           |
//! | `experts`     | overwrite | generate_experts                 |
//! | `messages`    | append    | debate_turn, synthesize_plan     |
//! | `evidence`    | append    | retrieve_*, merge_evidence       |
//! | `plan`        | overwrite | synthesize_plan                  |

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::message::Message;
use crate::pregel::schema::{SeqWrite, StateSchema, ValueShape};
use crate::pregel::state::WorkflowState;
use crate::pregel::vertex::StateUpdate;

/// Field names of [`PanelState`]
pub mod fields {
    pub const SYMPTOM: &str = "symptom";
    pub const MAX_EXPERTS: &str = "max_experts";
    pub const GUIDANCE: &str = "guidance";
    pub const MAX_TURNS: &str = "max_turns";
    pub const EXPERTS: &str = "experts";
    pub const MESSAGES: &str = "messages";
    pub const EVIDENCE: &str = "evidence";
    pub const PLAN: &str = "plan";
}

/// Name tag of conversation entries produced by the debate
pub const DEBATE_MESSAGE: &str = "debate";

/// Name tag of the final plan entry
pub const PLAN_MESSAGE: &str = "treatment_plan";

/// A simulated domain specialist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Expert {
    /// Name of the doctor.
    pub name: String,
    /// Qualifications of the doctor.
    pub qualifications: String,
    /// Specialization of the doctor, e.g. cardiologist, dermatologist, orthopedist.
    pub specialization: String,
    /// Number of years of work experience of the doctor.
    pub experience: u32,
    /// Description of the doctor's place of work, achievements, etc.
    pub description: String,
}

impl Expert {
    /// Persona text used to brief the debate
    pub fn persona(&self) -> String {
        format!(
            "Name: {}\nQualifications: {}\nSpecialization: {}\nExperience: {}\nDescription: {}\n",
            self.name, self.qualifications, self.specialization, self.experience, self.description
        )
    }
}

/// Structured reply of the expert-generation call
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExpertPanel {
    /// Comprehensive list of doctors with their specializations, place of work and qualifications.
    pub experts: Vec<Expert>,
}

/// Structured reply of the query-extraction call
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchQuery {
    /// Search query for retrieval.
    pub search_query: String,
}

/// Shared state of one panel run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PanelState {
    pub symptom: String,
    pub max_experts: usize,
    pub guidance: Option<String>,
    pub max_turns: usize,
    pub experts: Vec<Expert>,
    pub messages: Vec<Message>,
    pub evidence: Vec<String>,
    pub plan: Option<String>,
}

impl PanelState {
    /// Seed a run with its parameters
    pub fn new(symptom: impl Into<String>, max_experts: usize) -> Self {
        Self {
            symptom: symptom.into(),
            max_experts,
            max_turns: 1,
            ..Default::default()
        }
    }

    pub fn with_guidance(mut self, guidance: impl Into<String>) -> Self {
        self.guidance = Some(guidance.into());
        self
    }

    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }

    /// Guidance text, empty when none was given
    pub fn guidance_text(&self) -> &str {
        self.guidance.as_deref().unwrap_or("")
    }

    /// Number of debate entries in the conversation log
    pub fn debate_turns(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.is_named(DEBATE_MESSAGE))
            .count()
    }

    /// Most recent debate entry, if any
    pub fn last_debate_turn(&self) -> Option<&Message> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.is_named(DEBATE_MESSAGE))
    }

    /// The final plan entry, once synthesized
    pub fn plan_message(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.is_named(PLAN_MESSAGE))
    }
}

/// Field declarations of [`PanelState`]
pub fn panel_schema() -> &'static StateSchema {
    static SCHEMA: OnceLock<StateSchema> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        StateSchema::new()
            .overwrite(fields::SYMPTOM, ValueShape::Text)
            .overwrite(fields::MAX_EXPERTS, ValueShape::Integer)
            .overwrite(fields::GUIDANCE, ValueShape::Text)
            .overwrite(fields::MAX_TURNS, ValueShape::Integer)
            .overwrite(fields::EXPERTS, ValueShape::Sequence)
            .append(fields::MESSAGES)
            .append(fields::EVIDENCE)
            .overwrite(fields::PLAN, ValueShape::Text)
    })
}

/// Partial update produced by a panel node
///
/// Only the fields a node sets are serialized, so schema validation sees
/// exactly what the node writes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PanelUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experts: Option<Vec<Expert>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<SeqWrite<Message>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<SeqWrite<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
}

impl PanelUpdate {
    pub fn experts(experts: Vec<Expert>) -> Self {
        Self {
            experts: Some(experts),
            ..Default::default()
        }
    }

    /// Append one conversation entry
    pub fn message(message: Message) -> Self {
        Self {
            messages: Some(SeqWrite::append(vec![message])),
            ..Default::default()
        }
    }

    /// Append one evidence block
    pub fn evidence_block(block: impl Into<String>) -> Self {
        Self {
            evidence: Some(SeqWrite::append(vec![block.into()])),
            ..Default::default()
        }
    }

    /// Replace the evidence sequence with a single merged block
    pub fn merged_evidence(block: impl Into<String>) -> Self {
        Self {
            evidence: Some(SeqWrite::overwrite(vec![block.into()])),
            ..Default::default()
        }
    }

    /// Record the final plan as a conversation entry and in `plan`
    pub fn final_plan(message: Message) -> Self {
        Self {
            plan: Some(message.content.clone()),
            messages: Some(SeqWrite::append(vec![message])),
            ..Default::default()
        }
    }
}

impl StateUpdate for PanelUpdate {
    fn empty() -> Self {
        Self::default()
    }

    fn is_empty(&self) -> bool {
        self.experts.is_none()
            && self.messages.is_none()
            && self.evidence.is_none()
            && self.plan.is_none()
    }
}

impl WorkflowState for PanelState {
    type Update = PanelUpdate;

    fn schema(&self) -> &StateSchema {
        panel_schema()
    }

    fn apply_update(&self, update: PanelUpdate) -> Self {
        let mut new = self.clone();
        if let Some(experts) = update.experts {
            new.experts = experts;
        }
        if let Some(messages) = update.messages {
            messages.apply_to(&mut new.messages);
        }
        if let Some(evidence) = update.evidence {
            evidence.apply_to(&mut new.evidence);
        }
        if let Some(plan) = update.plan {
            new.plan = Some(plan);
        }
        new
    }
}
