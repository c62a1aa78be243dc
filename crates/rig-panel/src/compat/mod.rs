//! Compatibility layer for Rig framework integration
//!
//! ```text
//! ┌──────────────────────────────┐
//! │ rig-panel                    │
//! │  LLMProvider trait           │
//! │        ▲ adapts              │
//! │  RigAgentAdapter             │
//! └────────│─────────────────────┘
//!          ▼
//! ┌──────────────────────────────┐
//! │ Rig: Agent<M: CompletionModel>│
//! └──────────────────────────────┘
//! ```

mod rig_agent_adapter;

pub use rig_agent_adapter::RigAgentAdapter;
