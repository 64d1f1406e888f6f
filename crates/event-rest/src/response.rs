//! Interprets raw HTTP responses as mergeable payloads.

use serde_json::{Map, Value};

use crate::error::{RestError, RestResult};

/// Key raw-text bodies are wrapped under.
pub const RAW_TEXT_KEY: &str = "message";

/// Response from an HTTP request. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseEnvelope {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: Vec<(String, String)>,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl ResponseEnvelope {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Turn a response into a payload, or the error that routes the record to
/// the fallback branch.
pub fn normalize(envelope: &ResponseEnvelope, json: bool) -> RestResult<Value> {
    if !envelope.is_success() {
        return Err(RestError::HttpStatus {
            status: envelope.status,
        });
    }

    if json {
        serde_json::from_slice(&envelope.body)
            .map_err(|e| RestError::Parse(format!("response body is not valid JSON: {e}")))
    } else {
        let mut wrapped = Map::new();
        wrapped.insert(RAW_TEXT_KEY.to_string(), Value::String(envelope.text()));
        Ok(Value::Object(wrapped))
    }
}
