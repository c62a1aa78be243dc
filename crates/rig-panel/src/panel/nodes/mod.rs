//! The concrete nodes of the panel workflow
//!
//! ```text
//! START ─▶ generate_experts ─▶ debate_turn ─┬─▶ retrieve_web ──────────┬─▶ merge_evidence ─▶ synthesize_plan ─▶ END
//!                                 ▲   │     └─▶ retrieve_encyclopedia ─┘
//!                                 └───┘ (max_turns > 1)
//! ```

mod debate;
mod experts;
mod merge;
mod retrieve;
mod synthesis;

pub use debate::DebateTurn;
pub use experts::{select_distinct_experts, GenerateExperts};
pub use merge::MergeEvidence;
pub use retrieve::{RetrieveEncyclopedia, RetrieveWeb};
pub use synthesis::{ensure_plan_sentinel, SynthesizePlan};

/// Node identifiers
pub const GENERATE_EXPERTS: &str = "generate_experts";
pub const DEBATE_TURN: &str = "debate_turn";
pub const RETRIEVE_WEB: &str = "retrieve_web";
pub const RETRIEVE_ENCYCLOPEDIA: &str = "retrieve_encyclopedia";
pub const MERGE_EVIDENCE: &str = "merge_evidence";
pub const SYNTHESIZE_PLAN: &str = "synthesize_plan";
