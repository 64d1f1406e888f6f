//! The unit of stream data flowing through the filter.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{RestError, RestResult};

/// Field holding the record's tag collection.
pub const TAGS_FIELD: &str = "tags";

/// An ordered mapping from field names to JSON values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from a JSON value. Only objects are records.
    pub fn from_value(value: Value) -> RestResult<Self> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(RestError::Parse(format!(
                "record must be a JSON object, got {}",
                type_name(&other)
            ))),
        }
    }

    /// Top-level field by name.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Walk a nested path of object keys and array indices.
    pub fn get_path<S: AsRef<str>>(&self, path: &[S]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        let mut current = self.fields.get(first.as_ref())?;
        for segment in rest {
            let segment = segment.as_ref();
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Set a top-level field, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.fields.insert(key.into(), value)
    }

    /// Remove a top-level field, keeping the order of the rest.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Tags currently attached to the record.
    pub fn tags(&self) -> Vec<&str> {
        match self.fields.get(TAGS_FIELD) {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            Some(Value::String(tag)) => vec![tag.as_str()],
            _ => Vec::new(),
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags().contains(&tag)
    }

    /// Append a tag unless it is already present.
    ///
    /// A scalar string `tags` field is promoted to an array first; any other
    /// non-array value other than null is kept as the first element of the
    /// new array.
    pub fn add_tag(&mut self, tag: &str) {
        let entry = self
            .fields
            .entry(TAGS_FIELD)
            .or_insert_with(|| Value::Array(Vec::new()));

        if !entry.is_array() {
            let existing = entry.take();
            *entry = match existing {
                Value::Null => Value::Array(Vec::new()),
                Value::String(_) => Value::Array(vec![existing]),
                other => {
                    tracing::warn!(
                        found = type_name(&other),
                        "tags field is not a list, wrapping it"
                    );
                    Value::Array(vec![other])
                }
            };
        }

        if let Value::Array(items) = entry {
            if !items.iter().any(|t| t.as_str() == Some(tag)) {
                items.push(Value::String(tag.to_string()));
            }
        }
    }

    /// Borrow the underlying ordered map.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Consume the record into a JSON object value.
    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
