//! Event REST host pipeline — NDJSON records in, enriched records out.

pub mod config;
pub mod framing;
pub mod pipeline;

pub use config::resolve_config_path;
pub use pipeline::{run_pipeline, LineStatus, PipelineStats};
