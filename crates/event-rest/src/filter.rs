//! Per-record driver: resolve, request, normalize, merge, or fall back.

use std::fmt;
use std::sync::Arc;

use reqwest::header::{HeaderName, HeaderValue};
use serde_json::{Map, Value};

use crate::config::{AuthConfig, FilterConfig};
use crate::error::{RestError, RestResult};
use crate::merge::{merge, MergeTarget};
use crate::record::Record;
use crate::request::{build_request, parse_url, Method, RequestSpec};
use crate::response::normalize;
use crate::template::{resolve, resolve_value, Template};
use crate::transport::HttpTransport;

/// How a record left the filter. Exactly one per record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Response data merged at the target.
    Enriched,
    /// The request failed and the fallback payload was merged instead.
    Fallback,
    /// The request failed, no fallback: target untouched, failure tag added.
    Tagged,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Enriched => "enriched",
            Outcome::Fallback => "fallback",
            Outcome::Tagged => "tagged",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The enrichment filter. Read-only after construction, safe to share
/// across workers.
pub struct RestFilter {
    method: Method,
    url: Template,
    headers: Vec<(String, String)>,
    params: Map<String, Value>,
    auth: Option<AuthConfig>,
    json: bool,
    sprintf: bool,
    target: MergeTarget,
    fallback: Option<Map<String, Value>>,
    failure_tag: String,
    transport: Arc<dyn HttpTransport>,
}

impl fmt::Debug for RestFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestFilter")
            .field("method", &self.method)
            .field("url", &self.url.source())
            .field("json", &self.json)
            .field("sprintf", &self.sprintf)
            .field("target", &self.target)
            .field("fallback", &self.fallback.is_some())
            .field("failure_tag", &self.failure_tag)
            .finish()
    }
}

impl RestFilter {
    /// Validate `config` and build a filter around `transport`.
    ///
    /// A URL that does not depend on record fields is checked here; templated
    /// URLs are checked per record. Header names are always checked, header
    /// values only when templating is off.
    pub fn new(config: FilterConfig, transport: Arc<dyn HttpTransport>) -> RestResult<Self> {
        let method = config.method()?;
        let url = Template::new(config.request.url.trim());
        if url.source().is_empty() {
            return Err(RestError::Configuration("request.url is required".into()));
        }
        if !(config.sprintf && url.is_dynamic()) {
            parse_url(url.source())?;
        }
        for (name, value) in &config.request.headers {
            HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
                RestError::Configuration(format!("invalid header name: {name:?}"))
            })?;
            if !config.sprintf {
                HeaderValue::from_str(value).map_err(|_| {
                    RestError::Configuration(format!("invalid value for header {name}"))
                })?;
            }
        }

        tracing::debug!(
            method = %method,
            url = url.source(),
            merge_target = config.target.as_str(),
            "rest filter configured"
        );

        Ok(Self {
            method,
            url,
            headers: config.request.headers.into_iter().collect(),
            params: config.request.params,
            auth: config.request.auth,
            json: config.json,
            sprintf: config.sprintf,
            target: MergeTarget::from_config(&config.target),
            fallback: config.fallback,
            failure_tag: config.tag_on_rest_failure,
            transport,
        })
    }

    pub fn target(&self) -> &MergeTarget {
        &self.target
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn failure_tag(&self) -> &str {
        &self.failure_tag
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    /// Enrich one record in place.
    ///
    /// Only template errors are returned; the record is untouched in that
    /// case. Every other failure ends in [`Outcome::Fallback`] or
    /// [`Outcome::Tagged`].
    pub async fn filter(&self, record: &mut Record) -> RestResult<Outcome> {
        let (url, headers, params) = self.resolve(record)?;

        let result = match build_request(self.method, &url, headers, params, self.auth.as_ref()) {
            Ok(spec) => self.execute(&spec).await,
            Err(e) => Err(e),
        };

        match result.and_then(|payload| merge(record, &self.target, payload)) {
            Ok(()) => {
                tracing::debug!(url = url.as_str(), "record enriched");
                Ok(Outcome::Enriched)
            }
            Err(e) => Ok(self.fail(record, &url, e)),
        }
    }

    /// Build the request this filter would send for `record`.
    pub fn prepare(&self, record: &Record) -> RestResult<RequestSpec> {
        let (url, headers, params) = self.resolve(record)?;
        build_request(self.method, &url, headers, params, self.auth.as_ref())
    }

    fn resolve(
        &self,
        record: &Record,
    ) -> RestResult<(String, Vec<(String, String)>, Map<String, Value>)> {
        if !self.sprintf {
            return Ok((
                self.url.source().to_string(),
                self.headers.clone(),
                self.params.clone(),
            ));
        }

        let url = self.url.render(record)?;
        let headers = self
            .headers
            .iter()
            .map(|(name, value)| Ok((name.clone(), resolve(value, record)?)))
            .collect::<RestResult<Vec<_>>>()?;
        let params = self
            .params
            .iter()
            .map(|(key, value)| Ok((key.clone(), resolve_value(value, record)?)))
            .collect::<RestResult<Map<_, _>>>()?;
        Ok((url, headers, params))
    }

    async fn execute(&self, spec: &RequestSpec) -> RestResult<Value> {
        tracing::debug!(method = %spec.method, url = spec.url.as_str(), "sending request");
        let envelope = self.transport.perform(spec).await?;
        normalize(&envelope, self.json)
    }

    fn fail(&self, record: &mut Record, url: &str, error: RestError) -> Outcome {
        tracing::warn!(
            kind = error.kind(),
            url,
            fallback = self.fallback.is_some(),
            "rest request failed: {error}"
        );

        if let Some(fallback) = &self.fallback {
            match merge(record, &self.target, Value::Object(fallback.clone())) {
                Ok(()) => return Outcome::Fallback,
                Err(e) => tracing::warn!("fallback merge failed: {e}"),
            }
        }

        record.add_tag(&self.failure_tag);
        Outcome::Tagged
    }
}
