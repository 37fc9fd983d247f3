//! Single-threaded baseline: fetch and write one document at a time, in source order.
//! Total time is bounded below by the sum of all fetch latencies.

use anyhow::{Result, anyhow};
use log::{debug, warn};
use std::time::Instant;

use super::consumer::write_record;
use super::context::{CancelToken, PipelineHooks};
use super::error_handler::log_skipped;
use crate::archive::ArchiveSink;
use crate::metrics::Metrics;
use crate::provider::AttachmentProvider;
use crate::{Document, FetchFailurePolicy, Record, RunSummary, SkippedDocument};

pub fn run_sequential<I, S>(
    documents: I,
    provider: &dyn AttachmentProvider,
    sink: &mut S,
    on_fetch_error: FetchFailurePolicy,
    cancel: &CancelToken,
    hooks: PipelineHooks,
) -> Result<RunSummary>
where
    I: IntoIterator<Item = Document>,
    S: ArchiveSink + ?Sized,
{
    let metrics = Metrics::new();
    let mut summary = RunSummary::default();
    let mut sequence = 0_u64;

    for document in documents {
        if cancel.is_cancelled() {
            summary.cancelled = true;
            break;
        }
        sequence += 1;
        let mut record = Record::new(document, sequence);
        metrics.fetch_window().record_start(Instant::now());
        match provider.fetch(&record.document.attachment_key, cancel) {
            Ok(attachment) => {
                metrics.fetch_window().record_finish(Instant::now());
                metrics.observe_fetch(attachment.length());
                record.attach(attachment);
                write_record(sink, record, &metrics)?;
                summary.written += 1;
            }
            Err(_) if cancel.is_cancelled() => {
                summary.cancelled = true;
                break;
            }
            Err(err) => {
                metrics.inc_fetch_failures();
                match on_fetch_error {
                    FetchFailurePolicy::Abort => {
                        // Close what was written so the partial archive stays readable.
                        let _ = sink.finish();
                        provider.shutdown();
                        return Err(anyhow!(
                            "fetch {} ({}): {}",
                            record.document.name,
                            sequence,
                            err
                        ));
                    }
                    FetchFailurePolicy::Skip => {
                        warn!(
                            "fetch {} ({}): {}; leaving it out of the archive",
                            record.document.name, sequence, err
                        );
                        summary.skipped.push(SkippedDocument {
                            sequence,
                            name: record.document.name,
                            reason: err.to_string(),
                        });
                    }
                }
            }
        }
        if let Some(f) = &hooks.on_written {
            f(1);
        }
    }
    summary.documents = sequence;
    if let Some(f) = &hooks.on_total {
        f(sequence);
    }
    sink.finish()?;
    provider.shutdown();
    debug!("sequential run wrote {} of {} documents", summary.written, sequence);
    log_skipped(&summary.skipped);
    summary.metrics = metrics.snapshot();
    Ok(summary)
}
