//! Specialist-panel workflow
//!
//! Given a symptom, the panel is assembled, debates, gathers evidence from
//! two independent sources, merges it and drafts a treatment plan.
//!
//! - [`state`]: the shared state and its merge schema
//! - [`prompts`]: directives sent to the reasoning collaborator
//! - [`nodes`]: the six workflow nodes
//! - [`workflow`]: graph wiring, [`PanelWorkflow`] and [`run_workflow`]

pub mod nodes;
pub mod prompts;
pub mod state;
pub mod workflow;

pub use state::{Expert, ExpertPanel, PanelState, PanelUpdate, SearchQuery};
pub use workflow::{
    panel_mermaid, route_after_debate, run_workflow, FinalOutput, PanelWorkflow, PanelWorkflowBuilder,
    WorkflowError,
};
