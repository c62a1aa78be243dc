//! Mermaid diagram generation for workflow graphs
//!
//! Helper functions used by [`GraphLayout::to_mermaid`](super::GraphLayout::to_mermaid).
//!
//! # Node Shapes
//!
//! | NodeShape | Shape             | Mermaid Syntax |
//! |-----------|-------------------|----------------|
//! | Task      | Rectangle         | `id[label]`    |
//! | FanOut    | Parallelogram     | `id[/label\]`  |
//! | Join      | Reverse Para.     | `id[\label/]`  |
//! | Terminal  | Stadium           | `id([label])`  |

use crate::pregel::vertex::VertexState;

/// How a node is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeShape {
    /// Ordinary node
    Task,
    /// Node with several unconditional successors
    FanOut,
    /// Declared join
    Join,
    /// START or END marker
    Terminal,
}

// ============================================================================
// ID Sanitization
// ============================================================================

/// Sanitize a node ID for use as a Mermaid node identifier.
///
/// Mermaid node IDs must be alphanumeric (plus underscores).
/// This function replaces any invalid characters with underscores.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(sanitize_id("my-node"), "my_node");
/// assert_eq!(sanitize_id("node.name"), "node_name");
/// ```
pub fn sanitize_id(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

// ============================================================================
// Node Rendering
// ============================================================================

/// Render a node declaration like `id[label]` or `id[\label/]`.
pub fn render_node(id: &str, shape: NodeShape) -> String {
    let safe_id = sanitize_id(id);

    match shape {
        NodeShape::Task => format!("    {}[{}]", safe_id, id),
        NodeShape::FanOut => format!("    {}[/{}\\]", safe_id, id),
        NodeShape::Join => format!("    {}[\\{}/]", safe_id, id),
        NodeShape::Terminal => format!("    {}([{}])", safe_id, id),
    }
}

/// Render a node with a status class for coloring.
pub fn render_node_with_state(id: &str, shape: NodeShape, state: Option<&VertexState>) -> String {
    let base = render_node(id, shape);
    match state {
        Some(VertexState::Completed) => format!("{}:::completed", base),
        Some(VertexState::Failed) => format!("{}:::failed", base),
        Some(VertexState::BlockedOnJoin) => format!("{}:::blocked", base),
        Some(VertexState::Ready) | Some(VertexState::Running) => format!("{}:::active", base),
        Some(VertexState::Pending) | None => base,
    }
}

// ============================================================================
// Edge Rendering
// ============================================================================

/// Render an edge between two nodes.
///
/// - Unconditional edges: solid arrow `-->`
/// - Conditional edges: dotted arrow with label `-. "label" .->`
pub fn render_edge(from: &str, to: &str, condition: Option<&str>) -> String {
    let from_safe = sanitize_id(from);
    let to_safe = sanitize_id(to);

    match condition {
        Some(label) => format!("    {} -. \"{}\" .-> {}", from_safe, label, to_safe),
        None => format!("    {} --> {}", from_safe, to_safe),
    }
}

// ============================================================================
// Style Definitions
// ============================================================================

/// CSS class definitions for vertex states.
pub const STYLE_DEFS: &str = r#"
    classDef active fill:#90EE90,stroke:#228B22,stroke-width:2px
    classDef blocked fill:#FFE4B5,stroke:#FF8C00,stroke-width:1px
    classDef completed fill:#D3D3D3,stroke:#696969,stroke-width:1px
    classDef failed fill:#F4A6A6,stroke:#B22222,stroke-width:2px
"#;
