//! State schema: field declarations and merge policies
//!
//! A [`StateSchema`] declares every field of the shared workflow state, its
//! value shape and its [`MergePolicy`]. The runtime serializes each partial
//! update to a JSON field map and validates it against the schema before the
//! update is committed.
//!
//! Append-policy fields accept two write forms:
//!
//! ```text
//! "evidence": ["block"]                      // append to the sequence
//! "evidence": {"$overwrite": ["merged"]}      // replace the sequence
//! ```
//!
//! [`SeqWrite`] produces exactly these forms for typed updates.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Key marking an explicit sequence replacement on an append field
pub const OVERWRITE_KEY: &str = "$overwrite";

/// How a field combines a new value with the current one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// The written value replaces the current one (last writer wins)
    Overwrite,
    /// The written sequence is concatenated in commit order
    Append,
}

/// Semantic type of a field's value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueShape {
    Text,
    Integer,
    Boolean,
    Sequence,
    Record,
    Any,
}

impl ValueShape {
    /// Check whether a JSON value has this shape
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ValueShape::Text => value.is_string(),
            ValueShape::Integer => value.is_i64() || value.is_u64(),
            ValueShape::Boolean => value.is_boolean(),
            ValueShape::Sequence => value.is_array(),
            ValueShape::Record => value.is_object(),
            ValueShape::Any => true,
        }
    }
}

impl fmt::Display for ValueShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueShape::Text => "text",
            ValueShape::Integer => "integer",
            ValueShape::Boolean => "boolean",
            ValueShape::Sequence => "sequence",
            ValueShape::Record => "record",
            ValueShape::Any => "any",
        };
        f.write_str(name)
    }
}

/// Declaration of one state field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub shape: ValueShape,
    pub policy: MergePolicy,
}

/// Reasons a partial update is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaViolation {
    #[error("update is not a field map")]
    NotAFieldMap,

    #[error("field `{0}` is not declared in the state schema")]
    UndeclaredField(String),

    #[error("field `{0}` is not among the node's declared writes")]
    UndeclaredWrite(String),

    #[error("append field `{0}` must be written as a sequence")]
    NotASequence(String),

    #[error("field `{field}` expects {expected}, got {found}")]
    ShapeMismatch {
        field: String,
        expected: ValueShape,
        found: &'static str,
    },
}

/// Field declarations for a workflow state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSchema {
    fields: BTreeMap<String, FieldSpec>,
}

impl StateSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a field
    pub fn field(mut self, name: impl Into<String>, shape: ValueShape, policy: MergePolicy) -> Self {
        let name = name.into();
        self.fields.insert(
            name.clone(),
            FieldSpec {
                name,
                shape,
                policy,
            },
        );
        self
    }

    /// Declare an overwrite field
    pub fn overwrite(self, name: impl Into<String>, shape: ValueShape) -> Self {
        self.field(name, shape, MergePolicy::Overwrite)
    }

    /// Declare an append field (always a sequence)
    pub fn append(self, name: impl Into<String>) -> Self {
        self.field(name, ValueShape::Sequence, MergePolicy::Append)
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.get(name)
    }

    pub fn policy(&self, name: &str) -> Option<MergePolicy> {
        self.fields.get(name).map(|spec| spec.policy)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.values()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Validate a serialized partial update
    ///
    /// `declared_writes` is the set of fields the writing node declared.
    /// Null values count as "not written".
    pub fn validate_update(
        &self,
        update: &Value,
        declared_writes: &[&str],
    ) -> Result<(), SchemaViolation> {
        let map = match update {
            Value::Object(map) => map,
            Value::Null => return Ok(()),
            _ => return Err(SchemaViolation::NotAFieldMap),
        };

        for (name, value) in map {
            if value.is_null() {
                continue;
            }
            let spec = self
                .fields
                .get(name)
                .ok_or_else(|| SchemaViolation::UndeclaredField(name.clone()))?;

            if !declared_writes.contains(&name.as_str()) {
                return Err(SchemaViolation::UndeclaredWrite(name.clone()));
            }

            match spec.policy {
                MergePolicy::Append => {
                    if sequence_write(value).is_none() {
                        return Err(SchemaViolation::NotASequence(name.clone()));
                    }
                }
                MergePolicy::Overwrite => {
                    if !spec.shape.matches(value) {
                        return Err(SchemaViolation::ShapeMismatch {
                            field: name.clone(),
                            expected: spec.shape,
                            found: json_type_name(value),
                        });
                    }
                }
            }
        }

        Ok(())
    }
}

/// Decode an append-field write into (items, replace?)
pub(crate) fn sequence_write(value: &Value) -> Option<(&Vec<Value>, bool)> {
    match value {
        Value::Array(items) => Some((items, false)),
        Value::Object(map) if map.len() == 1 => match map.get(OVERWRITE_KEY) {
            Some(Value::Array(items)) => Some((items, true)),
            _ => None,
        },
        _ => None,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "text",
        Value::Array(_) => "sequence",
        Value::Object(_) => "record",
    }
}

/// Typed write to an append-policy field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SeqWrite<T> {
    /// Concatenate onto the current sequence
    Append(Vec<T>),
    /// Replace the current sequence
    Overwrite {
        #[serde(rename = "$overwrite")]
        items: Vec<T>,
    },
}

impl<T> SeqWrite<T> {
    pub fn append(items: Vec<T>) -> Self {
        SeqWrite::Append(items)
    }

    pub fn overwrite(items: Vec<T>) -> Self {
        SeqWrite::Overwrite { items }
    }

    /// Merge this write into `target`
    pub fn apply_to(self, target: &mut Vec<T>) {
        match self {
            SeqWrite::Append(items) => target.extend(items),
            SeqWrite::Overwrite { items } => *target = items,
        }
    }
}
