//! Structured result payload supplied when a step record completes.
//!
//! Results are free-form JSON, but always an object at the top level so that
//! consumers can rely on key lookup without re-validating the shape.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Rejected attempt to build a payload from a non-object JSON value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("result payload must be a JSON object, got {found}")]
pub struct InvalidPayload {
    pub found: &'static str,
}

/// Key/value result map stored on a completed step record
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct ResultPayload(Map<String, Value>);

impl ResultPayload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl TryFrom<Value> for ResultPayload {
    type Error = InvalidPayload;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Err(InvalidPayload { found: "null" }),
            Value::Bool(_) => Err(InvalidPayload { found: "boolean" }),
            Value::Number(_) => Err(InvalidPayload { found: "number" }),
            Value::String(_) => Err(InvalidPayload { found: "string" }),
            Value::Array(_) => Err(InvalidPayload { found: "array" }),
        }
    }
}

impl From<ResultPayload> for Value {
    fn from(payload: ResultPayload) -> Self {
        Value::Object(payload.0)
    }
}
