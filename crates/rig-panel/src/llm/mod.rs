//! Reasoning collaborator abstraction
//!
//! - [`LLMProvider`]: request/response interface with a free-text `generate` helper
//! - [`generate_structured`]: schema-guided JSON output decoded into a typed value
//! - [`RetryingProvider`]: collaborator-boundary retries

pub mod config;
pub mod provider;
pub mod retry;
pub mod structured;

pub use config::{LLMConfig, TokenUsage};
pub use provider::{LLMProvider, LLMResponse};
pub use retry::RetryingProvider;
pub use structured::{decode_structured, generate_structured};
