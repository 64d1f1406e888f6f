//! HTTP transport abstraction and the reqwest-backed implementation.
//!
//! The filter only needs "perform this request, give me status, headers and
//! body". Connection pooling, TLS and DNS belong to the transport. No retries:
//! one call, one outcome.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{RestError, RestResult};
use crate::request::{Method, RequestBody, RequestSpec};
use crate::response::ResponseEnvelope;

/// Default per-call timeout.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

const USER_AGENT: &str = concat!("event-rest/", env!("CARGO_PKG_VERSION"));

/// Capability to perform one fully resolved request.
///
/// Implementations report every failure that happens before a status line is
/// received as [`RestError::Transport`].
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn perform(&self, request: &RequestSpec) -> RestResult<ResponseEnvelope>;
}

/// Transport backed by a shared [`reqwest::Client`].
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport with the given per-call timeout.
    pub fn new(timeout_ms: u64) -> RestResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| RestError::Configuration(format!("cannot build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Wrap an existing client, e.g. one with custom TLS settings.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn perform(&self, request: &RequestSpec) -> RestResult<ResponseEnvelope> {
        let mut builder = self
            .client
            .request(to_reqwest_method(request.method), request.url.as_str());

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match &request.body {
            Some(RequestBody::Json(value)) => builder.json(value),
            Some(RequestBody::Form(encoded)) => builder.body(encoded.clone()),
            None => builder,
        };

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
            .collect();
        let body = response.bytes().await.map_err(transport_error)?.to_vec();

        Ok(ResponseEnvelope {
            status,
            headers,
            body,
        })
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
        Method::Head => reqwest::Method::HEAD,
    }
}

fn transport_error(e: reqwest::Error) -> RestError {
    let reason = if e.is_timeout() {
        "timed out"
    } else if e.is_connect() {
        "connection failed"
    } else {
        "request failed"
    };
    RestError::Transport(format!("{reason}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_creation() {
        assert!(ReqwestTransport::new(DEFAULT_TIMEOUT_MS).is_ok());
    }

    #[test]
    fn test_method_mapping() {
        assert_eq!(to_reqwest_method(Method::Patch), reqwest::Method::PATCH);
        assert_eq!(to_reqwest_method(Method::Head), reqwest::Method::HEAD);
    }
}
