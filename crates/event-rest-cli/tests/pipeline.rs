//! Pipeline tests: NDJSON in, NDJSON out, through a canned transport.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use event_rest::{
    FilterConfig, HttpTransport, Outcome, RequestSpec, ResponseEnvelope, RestFilter, RestResult,
};
use event_rest_cli::pipeline::{process_line, process_segment};
use event_rest_cli::{run_pipeline, LineStatus, PipelineStats};

// ─────────────────────── helpers ───────────────────────

/// Echoes the last URL path segment back as `{"id": <segment>}`; segment
/// "missing" answers 404. Earlier ids answer later to shake the ordering.
struct EchoTransport {
    calls: AtomicUsize,
}

#[async_trait]
impl HttpTransport for EchoTransport {
    async fn perform(&self, request: &RequestSpec) -> RestResult<ResponseEnvelope> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let segment = request.url.rsplit('/').next().unwrap_or_default().to_string();
        if segment == "missing" {
            return Ok(ResponseEnvelope::new(404, ""));
        }
        let delay = 40u64.saturating_sub(segment.parse::<u64>().unwrap_or(0) * 10);
        tokio::time::sleep(Duration::from_millis(delay)).await;
        Ok(ResponseEnvelope::new(200, json!({"id": segment}).to_string()))
    }
}

fn echo_filter(extra: impl FnOnce(&mut FilterConfig)) -> (Arc<RestFilter>, Arc<EchoTransport>) {
    let transport = Arc::new(EchoTransport {
        calls: AtomicUsize::new(0),
    });
    let mut cfg = FilterConfig::new("http://api.test/users/%{id}");
    cfg.sprintf = true;
    extra(&mut cfg);
    let filter = RestFilter::new(cfg, transport.clone()).unwrap();
    (Arc::new(filter), transport)
}

async fn run_lines(filter: Arc<RestFilter>, input: &str, workers: usize) -> (Vec<Value>, PipelineStats) {
    let mut out = Vec::new();
    let stats = run_pipeline(filter, input.as_bytes(), &mut out, workers)
        .await
        .unwrap();
    let lines = String::from_utf8(out)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    (lines, stats)
}

// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_enriches_every_line_in_order() {
    let (filter, transport) = echo_filter(|_| {});
    let input = "{\"id\": 1}\n{\"id\": 2}\n{\"id\": 3}\n{\"id\": 4}\n";

    let (lines, stats) = run_lines(filter, input, 4).await;

    assert_eq!(lines.len(), 4);
    for (i, line) in lines.iter().enumerate() {
        let id = (i + 1).to_string();
        assert_eq!(line["rest"]["id"], json!(id));
    }
    assert_eq!(stats.enriched, 4);
    assert_eq!(transport.calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_mixed_outcomes_are_counted() {
    let (filter, _) = echo_filter(|_| {});
    let input = concat!(
        "{\"id\": 1}\n",
        "\n",
        "{\"id\": \"missing\"}\n",
        "not json at all\n",
    );

    let (lines, stats) = run_pipeline_raw(filter, input).await;

    assert_eq!(
        stats,
        PipelineStats {
            enriched: 1,
            fallback: 0,
            tagged: 1,
            invalid: 1,
            failed: 0,
        }
    );
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[2], "not json at all");
}

#[tokio::test]
async fn test_undecodable_line_does_not_halt_stream() {
    let (filter, transport) = echo_filter(|_| {});
    let input: &[u8] = b"{\"id\":1}\n{\"id\":\"\xff\"}\n{\"id\":2}\n";

    let mut out = Vec::new();
    let stats = run_pipeline(filter, input, &mut out, 2).await.unwrap();

    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[1], "{\"id\":\"\u{FFFD}\"}");
    let last: Value = serde_json::from_str(lines[2]).unwrap();
    assert_eq!(last["rest"]["id"], json!("2"));
    assert_eq!(stats.enriched, 2);
    assert_eq!(stats.invalid, 1);
    assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_segment_with_crlf_is_decoded() {
    let (filter, _) = echo_filter(|_| {});
    let processed = process_segment(&filter, b"{\"id\": 3}\r".to_vec()).await;
    assert_eq!(processed.status, LineStatus::Done(Outcome::Enriched));
}

#[tokio::test]
async fn test_fallback_counted_separately() {
    let (filter, _) = echo_filter(|cfg| {
        cfg.fallback = json!({"unknown": true}).as_object().cloned();
    });

    let (lines, stats) = run_lines(filter, "{\"id\": \"missing\"}\n", 1).await;

    assert_eq!(stats.fallback, 1);
    assert_eq!(lines[0]["rest"], json!({"unknown": true}));
    assert!(lines[0].get("tags").is_none());
}

#[tokio::test]
async fn test_template_error_passes_record_through() {
    let transport = Arc::new(EchoTransport {
        calls: AtomicUsize::new(0),
    });
    let mut cfg = FilterConfig::new("http://api.test/users/%{[id}");
    cfg.sprintf = true;
    let filter = RestFilter::new(cfg, transport.clone()).unwrap();

    let processed = process_line(&filter, "{\"id\": 1}").await;

    assert_eq!(processed.status, LineStatus::Failed);
    assert_eq!(processed.output.as_deref(), Some("{\"id\": 1}\n"));
    assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_blank_line_writes_nothing() {
    let (filter, _) = echo_filter(|_| {});
    let processed = process_line(&filter, "   ").await;
    assert_eq!(processed.status, LineStatus::Blank);
    assert!(processed.output.is_none());
}

#[tokio::test]
async fn test_single_worker_matches_parallel_output() {
    let input = "{\"id\": 1}\n{\"id\": 2}\n{\"id\": 3}\n";
    let (sequential, _) = run_lines(echo_filter(|_| {}).0, input, 1).await;
    let (parallel, _) = run_lines(echo_filter(|_| {}).0, input, 8).await;
    assert_eq!(sequential, parallel);
}

#[tokio::test]
async fn test_outcome_tagged_line_keeps_target_absent() {
    let (filter, _) = echo_filter(|_| {});
    let processed = process_line(&filter, "{\"id\": \"missing\", \"message\": \"m\"}").await;

    assert_eq!(processed.status, LineStatus::Done(Outcome::Tagged));
    let value: Value = serde_json::from_str(processed.output.as_deref().unwrap()).unwrap();
    assert_eq!(
        value,
        json!({"id": "missing", "message": "m", "tags": ["_restfailure"]})
    );
}

/// Run and return raw output lines (some may not be JSON).
async fn run_pipeline_raw(filter: Arc<RestFilter>, input: &str) -> (Vec<String>, PipelineStats) {
    let mut out = Vec::new();
    let stats = run_pipeline(filter, input.as_bytes(), &mut out, 2).await.unwrap();
    let lines = String::from_utf8(out)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect();
    (lines, stats)
}
