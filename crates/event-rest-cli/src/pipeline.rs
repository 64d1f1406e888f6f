//! The host pipeline: reads records, dispatches them to the filter with
//! bounded concurrency, and writes them back in input order.

use std::sync::Arc;

use futures::StreamExt;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio_stream::wrappers::SplitStream;

use event_rest::{Outcome, RestFilter};

use crate::framing;

/// What happened to one input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStatus {
    /// Blank line, nothing written.
    Blank,
    /// Record went through the filter.
    Done(Outcome),
    /// Line was not UTF-8 or not a JSON object; passed through unchanged.
    Invalid,
    /// The filter rejected the record; passed through unchanged.
    Failed,
}

/// Output for one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Processed {
    pub output: Option<String>,
    pub status: LineStatus,
}

/// Per-run outcome counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub enriched: usize,
    pub fallback: usize,
    pub tagged: usize,
    pub invalid: usize,
    pub failed: usize,
}

impl PipelineStats {
    pub fn record(&mut self, status: LineStatus) {
        match status {
            LineStatus::Blank => {}
            LineStatus::Done(Outcome::Enriched) => self.enriched += 1,
            LineStatus::Done(Outcome::Fallback) => self.fallback += 1,
            LineStatus::Done(Outcome::Tagged) => self.tagged += 1,
            LineStatus::Invalid => self.invalid += 1,
            LineStatus::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.enriched + self.fallback + self.tagged + self.invalid + self.failed
    }
}

/// Run one line through the filter.
pub async fn process_line(filter: &RestFilter, line: &str) -> Processed {
    if line.trim().is_empty() {
        return Processed {
            output: None,
            status: LineStatus::Blank,
        };
    }

    let passthrough = || Some(format!("{}\n", line.trim_end_matches(['\r', '\n'])));

    let mut record = match framing::parse_record(line) {
        Ok(record) => record,
        Err(e) => {
            tracing::warn!("Skipping invalid record: {e}");
            return Processed {
                output: passthrough(),
                status: LineStatus::Invalid,
            };
        }
    };

    match filter.filter(&mut record).await {
        Ok(outcome) => match framing::frame_record(&record) {
            Ok(framed) => Processed {
                output: Some(framed),
                status: LineStatus::Done(outcome),
            },
            Err(e) => {
                tracing::error!("Cannot serialize record: {e}");
                Processed {
                    output: passthrough(),
                    status: LineStatus::Failed,
                }
            }
        },
        Err(e) => {
            tracing::error!(kind = e.kind(), "Record processing failed: {e}");
            Processed {
                output: passthrough(),
                status: LineStatus::Failed,
            }
        }
    }
}

/// Decode one raw input line and run it through the filter.
///
/// Bytes that are not UTF-8 are written back lossily and never reach the
/// filter.
pub async fn process_segment(filter: &RestFilter, segment: Vec<u8>) -> Processed {
    match String::from_utf8(segment) {
        Ok(line) => process_line(filter, &line).await,
        Err(e) => {
            tracing::warn!("Skipping line that is not UTF-8: {}", e.utf8_error());
            let lossy = String::from_utf8_lossy(e.as_bytes());
            Processed {
                output: Some(format!("{}\n", lossy.trim_end_matches(['\r', '\n']))),
                status: LineStatus::Invalid,
            }
        }
    }
}

/// Read NDJSON records from `reader`, enrich up to `workers` at a time, and
/// write them to `writer` in input order.
pub async fn run_pipeline<R, W>(
    filter: Arc<RestFilter>,
    reader: R,
    mut writer: W,
    workers: usize,
) -> anyhow::Result<PipelineStats>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut stats = PipelineStats::default();
    let workers = workers.max(1);

    tracing::info!(workers, "Pipeline started");

    let mut processed = SplitStream::new(reader.split(b'\n'))
        .map(|segment| {
            let filter = Arc::clone(&filter);
            async move {
                let segment = segment?;
                Ok::<_, std::io::Error>(process_segment(&filter, segment).await)
            }
        })
        .buffered(workers);

    while let Some(item) = processed.next().await {
        let item = item?;
        stats.record(item.status);
        if let Some(output) = item.output {
            writer.write_all(output.as_bytes()).await?;
        }
    }
    writer.flush().await?;

    tracing::info!(
        total = stats.total(),
        enriched = stats.enriched,
        fallback = stats.fallback,
        tagged = stats.tagged,
        invalid = stats.invalid,
        failed = stats.failed,
        "EOF on input, pipeline finished"
    );

    Ok(stats)
}
