//! Generic vertex implementations
//!
//! - [`function::FnVertex`]: wraps an async closure over the state snapshot

pub mod function;

pub use function::{FnVertex, VertexFn};
