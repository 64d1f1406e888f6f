//! Message framing for newline-delimited JSON records.

use event_rest::{Record, RestError, RestResult};

/// Parse a single line of text as a record.
pub fn parse_record(line: &str) -> RestResult<Record> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(RestError::Parse("empty line".to_string()));
    }

    let value: serde_json::Value = serde_json::from_str(trimmed)?;
    Record::from_value(value)
}

/// Serialize a record to a JSON line (with trailing newline).
pub fn frame_record(record: &Record) -> RestResult<String> {
    let mut json = serde_json::to_string(record)?;
    json.push('\n');
    Ok(json)
}
