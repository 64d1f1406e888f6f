//! Field-reference templating for URLs, headers, and parameters.
//!
//! `%{name}` substitutes the top-level field `name`; `%{[a][b]}` walks
//! nested objects and array indices. Missing fields render as the empty
//! string. An unterminated `%{` is kept as literal text.

use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde_json::Value;

use crate::error::{RestError, RestResult};
use crate::record::Record;

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"%\{([^}]*)\}").expect("placeholder regex is valid"))
}

/// A string that may contain field-reference placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
}

impl Template {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether the string contains at least one placeholder.
    pub fn is_dynamic(&self) -> bool {
        placeholder_re().is_match(&self.source)
    }

    /// Substitute every placeholder with the referenced field of `record`.
    pub fn render(&self, record: &Record) -> RestResult<String> {
        resolve(&self.source, record)
    }
}

/// Resolve all placeholders in `input` against `record`.
pub fn resolve(input: &str, record: &Record) -> RestResult<String> {
    let mut error = None;
    let rendered = placeholder_re().replace_all(input, |caps: &Captures<'_>| {
        match parse_reference(&caps[1]) {
            Ok(path) => record.get_path(&path).map(render_value).unwrap_or_default(),
            Err(e) => {
                error.get_or_insert(e);
                String::new()
            }
        }
    });

    match error {
        Some(e) => Err(e),
        None => Ok(rendered.into_owned()),
    }
}

/// Template every string leaf inside a JSON value. Keys, numbers, booleans
/// and nulls pass through untouched.
pub fn resolve_value(value: &Value, record: &Record) -> RestResult<Value> {
    Ok(match value {
        Value::String(s) => Value::String(resolve(s, record)?),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| resolve_value(item, record))
                .collect::<RestResult<_>>()?,
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| Ok((k.clone(), resolve_value(v, record)?)))
                .collect::<RestResult<_>>()?,
        ),
        other => other.clone(),
    })
}

/// Render a field value the way it appears inside a templated string.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Split a reference into path segments: `name` or `[a][b][0]`.
fn parse_reference(reference: &str) -> RestResult<Vec<String>> {
    if reference.is_empty() {
        return Err(RestError::Template("empty field reference %{}".into()));
    }
    if !reference.starts_with('[') {
        return Ok(vec![reference.to_string()]);
    }

    let mut segments = Vec::new();
    let mut rest = reference;
    while !rest.is_empty() {
        let inner = rest
            .strip_prefix('[')
            .ok_or_else(|| malformed(reference))?;
        let end = inner.find(']').ok_or_else(|| malformed(reference))?;
        let segment = &inner[..end];
        if segment.is_empty() || segment.contains('[') {
            return Err(malformed(reference));
        }
        segments.push(segment.to_string());
        rest = &inner[end + 1..];
    }
    Ok(segments)
}

fn malformed(reference: &str) -> RestError {
    RestError::Template(format!("malformed field reference %{{{reference}}}"))
}
