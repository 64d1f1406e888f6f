//! Error taxonomy for the enrichment stage.

/// All errors that can occur while enriching a record.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RestError {
    /// Bad or missing URL, unknown method, unreadable configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Malformed field reference in a templated string.
    #[error("Template error: {0}")]
    Template(String),

    /// Connection refused, timeout, DNS failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server answered with a status outside 200..=299.
    #[error("HTTP status error: {status}")]
    HttpStatus { status: u16 },

    /// The response body was not valid JSON.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The payload shape cannot be written at the configured target.
    #[error("Merge error: {0}")]
    Merge(String),
}

impl RestError {
    /// Stable label used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            RestError::Configuration(_) => "configuration",
            RestError::Template(_) => "template",
            RestError::Transport(_) => "transport",
            RestError::HttpStatus { .. } => "http_status",
            RestError::Parse(_) => "parse",
            RestError::Merge(_) => "merge",
        }
    }

    /// Whether the error routes the record to the fallback/tag branch
    /// instead of surfacing to the host pipeline.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, RestError::Template(_))
    }
}

impl From<serde_json::Error> for RestError {
    fn from(e: serde_json::Error) -> Self {
        RestError::Parse(e.to_string())
    }
}

/// Convenience result type.
pub type RestResult<T> = Result<T, RestError>;
