//! Event REST — per-record HTTP enrichment for structured event streams.
//!
//! A [`RestFilter`] takes one [`Record`] at a time, builds an HTTP request
//! from static configuration plus fields of that record, performs it through
//! an [`HttpTransport`], and merges the parsed response back into the record.
//! Failed requests fall back to a static payload or tag the record.

pub mod config;
pub mod error;
pub mod filter;
pub mod merge;
pub mod record;
pub mod request;
pub mod response;
pub mod template;
pub mod transport;

pub use config::{AuthConfig, FilterConfig, RequestConfig};
pub use error::{RestError, RestResult};
pub use filter::{Outcome, RestFilter};
pub use merge::MergeTarget;
pub use record::Record;
pub use request::{BodyEncoding, Method, RequestBody, RequestSpec};
pub use response::ResponseEnvelope;
pub use template::Template;
pub use transport::{HttpTransport, ReqwestTransport};
