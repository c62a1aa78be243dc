//! Schema-driven JSON state
//!
//! [`DynamicState`] stores fields as JSON values and merges updates purely
//! according to its [`StateSchema`]. Useful for graphs assembled at runtime
//! where no typed state exists.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use super::schema::{sequence_write, MergePolicy, StateSchema};
use super::state::WorkflowState;
use super::vertex::StateUpdate;

/// JSON field map written by a vertex
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DynamicUpdate(pub Map<String, Value>);

impl DynamicUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field value
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// Append items to a sequence field
    pub fn append(self, field: impl Into<String>, items: Vec<Value>) -> Self {
        self.set(field, Value::Array(items))
    }

    /// Replace a sequence field
    pub fn replace(self, field: impl Into<String>, items: Vec<Value>) -> Self {
        let mut wrapper = Map::new();
        wrapper.insert(super::schema::OVERWRITE_KEY.to_string(), Value::Array(items));
        self.set(field, Value::Object(wrapper))
    }
}

impl StateUpdate for DynamicUpdate {
    fn empty() -> Self {
        Self::default()
    }

    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Shared state backed by a JSON object
#[derive(Debug, Clone)]
pub struct DynamicState {
    schema: Arc<StateSchema>,
    values: Map<String, Value>,
}

impl DynamicState {
    /// Create an empty state; append fields start as empty sequences
    pub fn new(schema: StateSchema) -> Self {
        let values = schema
            .fields()
            .filter(|spec| spec.policy == MergePolicy::Append)
            .map(|spec| (spec.name.clone(), Value::Array(Vec::new())))
            .collect();
        Self {
            schema: Arc::new(schema),
            values,
        }
    }

    /// Seed a field value
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(field.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Items of a sequence field, empty if unset
    pub fn sequence(&self, field: &str) -> &[Value] {
        self.values
            .get(field)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }
}

impl WorkflowState for DynamicState {
    type Update = DynamicUpdate;

    fn schema(&self) -> &StateSchema {
        &self.schema
    }

    fn apply_update(&self, update: Self::Update) -> Self {
        let mut new = self.clone();
        for (field, value) in update.0 {
            if value.is_null() {
                continue;
            }
            match self.schema.policy(&field) {
                Some(MergePolicy::Append) => {
                    // Non-sequence writes are rejected before commit; treat as one item
                    let parsed =
                        sequence_write(&value).map(|(items, replace)| (items.clone(), replace));
                    let (items, replace) = parsed.unwrap_or_else(|| (vec![value], false));
                    let current = new
                        .values
                        .entry(field)
                        .or_insert_with(|| Value::Array(Vec::new()));
                    match current {
                        Value::Array(existing) if !replace => existing.extend(items),
                        other => *other = Value::Array(items),
                    }
                }
                Some(MergePolicy::Overwrite) | None => {
                    new.values.insert(field, value);
                }
            }
        }
        new
    }
}
