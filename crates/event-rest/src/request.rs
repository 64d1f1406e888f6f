//! Assembles a concrete HTTP request from configuration and resolved templates.

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use serde_json::{Map, Value};
use url::Url;

use crate::config::AuthConfig;
use crate::error::{RestError, RestResult};
use crate::template::render_value;

const CONTENT_TYPE: &str = "Content-Type";
const AUTHORIZATION: &str = "Authorization";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// HTTP methods the filter can issue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
        }
    }

    /// POST, PUT and PATCH carry parameters in the body.
    pub fn has_body(&self) -> bool {
        matches!(self, Method::Post | Method::Put | Method::Patch)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = RestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "" | "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            "HEAD" => Ok(Method::Head),
            other => Err(RestError::Configuration(format!(
                "unsupported HTTP method: {other}"
            ))),
        }
    }
}

/// How parameters travel with the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyEncoding {
    QueryString,
    JsonBody,
    FormBody,
}

/// A serialized request body.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Form(String),
}

/// A fully resolved request, built fresh for every record.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub method: Method,
    /// Absolute URL including any query-string parameters.
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub params: Map<String, Value>,
    pub encoding: BodyEncoding,
    pub body: Option<RequestBody>,
}

impl RequestSpec {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// Build a [`RequestSpec`] from resolved pieces.
pub fn build_request(
    method: Method,
    url: &str,
    mut headers: Vec<(String, String)>,
    params: Map<String, Value>,
    auth: Option<&AuthConfig>,
) -> RestResult<RequestSpec> {
    let mut url = parse_url(url)?;
    let encoding = choose_encoding(method, &headers);

    let body = match encoding {
        BodyEncoding::QueryString => {
            if !params.is_empty() {
                let mut pairs = url.query_pairs_mut();
                for (key, value) in flatten_params(&params) {
                    pairs.append_pair(&key, &value);
                }
            }
            None
        }
        BodyEncoding::JsonBody => {
            (!params.is_empty()).then(|| RequestBody::Json(Value::Object(params.clone())))
        }
        BodyEncoding::FormBody => {
            if find_header(&headers, CONTENT_TYPE).is_none() {
                headers.push((CONTENT_TYPE.to_string(), FORM_CONTENT_TYPE.to_string()));
            }
            (!params.is_empty()).then(|| {
                let encoded = url::form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(flatten_params(&params))
                    .finish();
                RequestBody::Form(encoded)
            })
        }
    };

    if let Some(auth) = auth {
        if find_header(&headers, AUTHORIZATION).is_none() {
            headers.push((AUTHORIZATION.to_string(), basic_auth(auth)));
        }
    }

    Ok(RequestSpec {
        method,
        url: url.to_string(),
        headers,
        params,
        encoding,
        body,
    })
}

/// Parse and validate an absolute http(s) URL.
pub fn parse_url(raw: &str) -> RestResult<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(RestError::Configuration("request url is empty".into()));
    }
    let url = Url::parse(raw)
        .map_err(|e| RestError::Configuration(format!("invalid request url {raw:?}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(RestError::Configuration(format!(
            "unsupported url scheme {scheme:?} in {raw:?}"
        ))),
    }
}

fn choose_encoding(method: Method, headers: &[(String, String)]) -> BodyEncoding {
    if !method.has_body() {
        return BodyEncoding::QueryString;
    }
    match find_header(headers, CONTENT_TYPE) {
        Some(ct) if ct.to_ascii_lowercase().contains("json") => BodyEncoding::JsonBody,
        _ => BodyEncoding::FormBody,
    }
}

/// Flatten nested parameters into `key[sub]` / `key[]` pairs.
pub fn flatten_params(params: &Map<String, Value>) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for (key, value) in params {
        flatten_into(key.clone(), value, &mut out);
    }
    out
}

fn flatten_into(prefix: String, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, inner) in map {
                flatten_into(format!("{prefix}[{key}]"), inner, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                flatten_into(format!("{prefix}[]"), item, out);
            }
        }
        scalar => out.push((prefix, render_value(scalar))),
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

fn basic_auth(auth: &AuthConfig) -> String {
    let credentials = format!("{}:{}", auth.user, auth.password);
    format!(
        "Basic {}",
        base64::engine::general_purpose::STANDARD.encode(credentials)
    )
}
