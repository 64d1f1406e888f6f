//! Writes payloads into records at the configured target.

use serde_json::Value;

use crate::error::{RestError, RestResult};
use crate::record::Record;

/// Where merge results land.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeTarget {
    /// Top-level keys of the payload are set directly on the record.
    Root,
    /// The whole payload is placed under this key.
    Key(String),
}

impl MergeTarget {
    /// An empty target string means root.
    pub fn from_config(target: &str) -> Self {
        if target.is_empty() {
            MergeTarget::Root
        } else {
            MergeTarget::Key(target.to_string())
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self, MergeTarget::Root)
    }
}

/// Replace-at-target write of `payload` into `record`.
///
/// The record is left untouched when the payload cannot be merged.
pub fn merge(record: &mut Record, target: &MergeTarget, payload: Value) -> RestResult<()> {
    match (target, payload) {
        (MergeTarget::Key(key), payload) => {
            record.insert(key.clone(), payload);
            Ok(())
        }
        (MergeTarget::Root, Value::Object(map)) => {
            for (key, value) in map {
                record.insert(key, value);
            }
            Ok(())
        }
        (MergeTarget::Root, Value::Array(_)) => Err(RestError::Merge(
            "array payload requires a named target".into(),
        )),
        (MergeTarget::Root, _) => Err(RestError::Merge(
            "scalar payload requires a named target".into(),
        )),
    }
}
