//! Filter configuration, read once at startup and immutable afterwards.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{RestError, RestResult};
use crate::request::Method;

/// Default field enrichment results are merged under.
pub const DEFAULT_TARGET: &str = "rest";
/// Default tag added when a request fails and no fallback is set.
pub const DEFAULT_FAILURE_TAG: &str = "_restfailure";

/// Top-level filter options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterConfig {
    pub request: RequestConfig,
    /// Parse the response body as JSON instead of keeping raw text.
    #[serde(default = "default_true")]
    pub json: bool,
    /// Enable `%{field}` templating in url, headers, and params.
    #[serde(default)]
    pub sprintf: bool,
    /// Field to merge results under; empty merges at the record root.
    #[serde(default = "default_target")]
    pub target: String,
    /// Static payload merged in place of a failed request.
    #[serde(default)]
    pub fallback: Option<Map<String, Value>>,
    #[serde(default = "default_failure_tag")]
    pub tag_on_rest_failure: String,
}

/// The `request` block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(default)]
    pub auth: Option<AuthConfig>,
}

/// HTTP Basic credentials.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    pub user: String,
    pub password: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn default_true() -> bool {
    true
}

fn default_target() -> String {
    DEFAULT_TARGET.to_string()
}

fn default_failure_tag() -> String {
    DEFAULT_FAILURE_TAG.to_string()
}

impl FilterConfig {
    /// Minimal configuration for a URL, every other option at its default.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            request: RequestConfig {
                url: url.into(),
                ..RequestConfig::default()
            },
            json: true,
            sprintf: false,
            target: default_target(),
            fallback: None,
            tag_on_rest_failure: default_failure_tag(),
        }
    }

    /// Parse configuration from a JSON document.
    pub fn from_json_str(s: &str) -> RestResult<Self> {
        serde_json::from_str(s)
            .map_err(|e| RestError::Configuration(format!("invalid filter configuration: {e}")))
    }

    /// Read configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> RestResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            RestError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&raw)
    }

    /// The configured method, GET when unset.
    pub fn method(&self) -> RestResult<Method> {
        match &self.request.method {
            Some(m) => m.parse(),
            None => Ok(Method::Get),
        }
    }
}
