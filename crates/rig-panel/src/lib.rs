//! rig-panel: shared-state workflow engine and a specialist-panel workflow for Rig
//!
//! The engine runs a statically validated graph of nodes over a shared state
//! whose fields merge by schema (overwrite or append). Fan-out branches run
//! concurrently on causally isolated views, joins fire once every declared
//! predecessor has committed, and any node failure aborts the run.
//!
//! The panel workflow built on it turns a symptom into a treatment plan:
//!
//! ```text
//! START → generate_experts → debate_turn ─┬─▶ retrieve_web ──────────┬─▶ merge_evidence → synthesize_plan → END
//!                                         └─▶ retrieve_encyclopedia ─┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use rig::providers::openai::Client;
//! use rig::client::{CompletionClient, ProviderClient};
//! use rig_panel::{run_workflow, RigAgentAdapter, TavilySearch, WikipediaLookup};
//!
//! let agent = Client::from_env().agent("gpt-4.1").build();
//! let output = run_workflow(
//!     Arc::new(RigAgentAdapter::new(agent)),
//!     Arc::new(TavilySearch::from_env()?),
//!     Arc::new(WikipediaLookup::default()),
//!     "persistent cough",
//!     3,
//!     None,
//! )
//! .await?;
//! ```

pub mod compat;
pub mod config;
pub mod error;
pub mod llm;
pub mod message;
pub mod panel;
pub mod pregel;
pub mod retrieval;
pub mod retry;
pub mod workflow;

// Re-exports for convenience
pub use compat::RigAgentAdapter;
pub use config::PanelConfig;
pub use error::{CollaboratorError, ErrorKind, NodeError};
pub use llm::{generate_structured, LLMConfig, LLMProvider, LLMResponse, RetryingProvider};
pub use message::{Message, Role};
pub use panel::{run_workflow, Expert, FinalOutput, PanelState, PanelWorkflow, WorkflowError};
pub use pregel::{PregelConfig, PregelError, PregelRuntime, StateSchema, WorkflowState};
pub use retrieval::{
    EncyclopediaDocument, EncyclopediaLookup, RetryingEncyclopedia, RetryingWebSearch,
    TavilySearch, WebDocument, WebSearch, WikipediaLookup,
};
pub use retry::RetryPolicy;
pub use workflow::{CompiledWorkflow, WorkflowGraph, END, START};
