//! Structured output over a free-text reasoning collaborator
//!
//! The requested type's JSON schema (derived with `schemars`) is embedded in
//! the system directive, and the first JSON object found in the reply is
//! decoded into the type. A reply that cannot be decoded is a
//! [`CollaboratorError::ParseFailure`]; it is never retried here.

use regex::Regex;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use std::sync::OnceLock;
use tracing::debug;

use super::config::LLMConfig;
use super::provider::LLMProvider;
use crate::error::CollaboratorError;
use crate::message::Message;

const JSON_ONLY_NUDGE: &str =
    "Reply with the JSON object only, without commentary before or after it.";

fn fence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)```").expect("valid fence pattern"))
}

/// Ask `provider` for a value of type `T`
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Deserialize, JsonSchema)]
/// struct SearchQuery { search_query: String }
///
/// let query: SearchQuery =
///     generate_structured(llm.as_ref(), "Write a search query.", &log, None).await?;
/// ```
pub async fn generate_structured<T>(
    provider: &dyn LLMProvider,
    directive: &str,
    conversation: &[Message],
    config: Option<&LLMConfig>,
) -> Result<T, CollaboratorError>
where
    T: JsonSchema + DeserializeOwned,
{
    let schema = schemars::schema_for!(T);
    let schema_text = serde_json::to_string_pretty(&schema).map_err(|e| {
        CollaboratorError::parse_failure(type_label::<T>(), format!("schema not serializable: {}", e), "")
    })?;
    let directive = format!(
        "{}\n\nRespond with a single JSON object that validates against this JSON schema:\n{}",
        directive, schema_text
    );

    let mut request = conversation.to_vec();
    request.push(Message::human(JSON_ONLY_NUDGE));

    let text = provider.generate(&directive, &request, config).await?;
    decode_structured(&text)
}

/// Decode the first JSON object of `text` as `T`
///
/// Tries the whole reply, then a fenced code block, then the span from the
/// first `{` to the last `}`.
pub fn decode_structured<T: DeserializeOwned>(text: &str) -> Result<T, CollaboratorError> {
    let mut last_error = None;

    for candidate in json_candidates(text) {
        match serde_json::from_str::<T>(candidate) {
            Ok(value) => return Ok(value),
            Err(err) => last_error = Some(err),
        }
    }

    let message = last_error
        .map(|e| e.to_string())
        .unwrap_or_else(|| String::from("no JSON object in reply"));
    debug!(target_type = type_label::<T>(), error = %message, "Structured decode failed");
    Err(CollaboratorError::parse_failure(type_label::<T>(), message, text))
}

fn json_candidates(text: &str) -> Vec<&str> {
    let mut candidates = Vec::new();
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        candidates.push(trimmed);
    }
    if let Some(fenced) = fence_regex().captures(text).and_then(|c| c.get(1)) {
        candidates.push(fenced.as_str().trim());
    }
    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            candidates.push(&text[start..=end]);
        }
    }
    candidates
}

fn type_label<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}
