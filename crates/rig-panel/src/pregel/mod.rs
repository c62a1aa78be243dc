//! Pregel Runtime for Graph-Based Workflow Orchestration
//!
//! This module implements the shared-state execution engine. Key concepts:
//!
//! - **Vertex**: computation unit that reads a state snapshot and returns a
//!   partial update for the fields it declares
//! - **Schema**: per-field merge policy (overwrite or append) used to validate
//!   and combine updates
//! - **Route**: unconditional or data-dependent edge between vertices
//! - **Join**: vertex that runs once every declared predecessor has committed
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    PregelRuntime                             │
//! │                                                              │
//! │   frontier ──spawn──▶ in-flight vertices (JoinSet)           │
//! │       ▲                      │                               │
//! │       │                      ▼ completion order              │
//! │   route / join ◀── commit (validate + merge, serialized)     │
//! │                                                              │
//! │   Each vertex computes on its causal view: the seed state    │
//! │   plus exactly the commits of its predecessors.              │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod dynamic;
pub mod error;
pub mod runtime;
pub mod schema;
pub mod state;
pub mod trace;
pub mod vertex;

// Re-exports
pub use config::PregelConfig;
pub use dynamic::{DynamicState, DynamicUpdate};
pub use error::PregelError;
pub use runtime::{PregelRuntime, RouterFn, Target, WorkflowResult};
pub use schema::{FieldSpec, MergePolicy, SchemaViolation, SeqWrite, StateSchema, ValueShape};
pub use state::WorkflowState;
pub use trace::{RunTrace, TraceEvent, TraceEventKind};
pub use vertex::{BoxedVertex, ComputeContext, StateUpdate, Vertex, VertexId, VertexState};
