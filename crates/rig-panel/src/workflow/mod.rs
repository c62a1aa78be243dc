//! Workflow Graph System
//!
//! Building blocks for declaring a workflow graph once, validating it
//! statically and executing it on the Pregel runtime.
//!
//! # Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       WorkflowGraph                           │
//! │                                                               │
//! │  START → experts → debate ─┬─▶ web ──────┐                    │
//! │                     ▲  │   └─▶ wiki ─────┴─▶ merge (join)     │
//! │                     └──┘ (conditional)         │              │
//! │                                                ▼              │
//! │                                            synthesize → END   │
//! │                                                               │
//! │  build() → BuiltWorkflowGraph → compile() → CompiledWorkflow  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use rig_panel::workflow::{WorkflowGraph, START, END};
//!
//! let workflow = WorkflowGraph::<MyState>::new()
//!     .name("fan_out")
//!     .node(split)
//!     .node(left)
//!     .node(right)
//!     .node(merge)
//!     .edge(START, "split")
//!     .edge("split", "left")
//!     .edge("split", "right")
//!     .join(["left", "right"], "merge")
//!     .edge("merge", END)
//!     .build()?
//!     .compile(PregelConfig::default());
//! ```

pub mod compiled;
pub mod graph;
pub mod vertices;
pub mod visualization;

pub use compiled::{CompiledWorkflow, PassthroughVertex};
pub use graph::{
    BuiltWorkflowGraph, GraphEdge, GraphLayout, WorkflowBuildError, WorkflowGraph, END, START,
};
pub use vertices::{FnVertex, VertexFn};
pub use visualization::{render_edge, render_node, render_node_with_state, sanitize_id, NodeShape};
