use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::{debug, error, warn};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use super::context::{PipelineContext, WorkerGuard};
use crate::provider::AttachmentProvider;
use crate::{FetchFailurePolicy, Fetched, Record, SkippedDocument};

/// Single fetch worker: take records from intake_rx, fetch each attachment, insert into the reorder buffer.
/// Exits when the intake is closed and drained, when cancelled, or on a fetch failure under
/// [`FetchFailurePolicy::Abort`].
fn fetch_worker_loop(
    worker_id: usize,
    intake_rx: Receiver<Record>,
    provider: Arc<dyn AttachmentProvider>,
    ctx: PipelineContext,
    _guard: WorkerGuard,
) {
    debug!("fetch worker {} started", worker_id);
    while !ctx.cancel.is_cancelled() {
        let mut record = match intake_rx.recv_timeout(ctx.poll_interval) {
            Ok(record) => record,
            Err(RecvTimeoutError::Timeout) => {
                ctx.metrics.inc_intake_empty();
                continue;
            }
            Err(RecvTimeoutError::Disconnected) => break,
        };

        let sequence = record.sequence;
        ctx.metrics.fetch_window().record_start(Instant::now());
        let fetched = match provider.fetch(&record.document.attachment_key, &ctx.cancel) {
            Ok(attachment) => {
                ctx.metrics.fetch_window().record_finish(Instant::now());
                ctx.metrics.observe_fetch(attachment.length());
                record.attach(attachment);
                Fetched::Complete(record)
            }
            Err(_) if ctx.cancel.is_cancelled() => break,
            Err(err) => {
                ctx.metrics.inc_fetch_failures();
                let msg = format!("fetch {} ({}): {}", record.document.name, sequence, err);
                match ctx.on_fetch_error {
                    FetchFailurePolicy::Abort => {
                        error!("{}", msg);
                        ctx.record_first_error(msg);
                        ctx.cancel.cancel();
                        break;
                    }
                    FetchFailurePolicy::Skip => {
                        warn!("{}; leaving it out of the archive", msg);
                        ctx.record_skipped(SkippedDocument {
                            sequence,
                            name: record.document.name.clone(),
                            reason: err.to_string(),
                        });
                        Fetched::Skipped {
                            document: record.document,
                            reason: err.to_string(),
                        }
                    }
                }
            }
        };

        if !insert_with_retry(&ctx, sequence, fetched) {
            break;
        }
    }
    debug!("fetch worker {} exiting", worker_id);
}

/// Insert into the reorder buffer, waiting and retrying while it is full. Never drops the item.
/// Returns false only when the run is cancelled first.
fn insert_with_retry(ctx: &PipelineContext, sequence: u64, mut item: Fetched) -> bool {
    loop {
        match ctx.buffer.insert_timeout(sequence, item, ctx.poll_interval) {
            Ok(()) => return true,
            Err(back) => {
                ctx.metrics.inc_buffer_full();
                if ctx.cancel.is_cancelled() {
                    return false;
                }
                debug!("reorder buffer full; retrying {}", back.document().name);
                item = back;
            }
        }
    }
}

/// Spawn the fetch pool: `num_threads` workers sharing `intake_rx` and the context's reorder buffer.
pub fn spawn_fetch_workers(
    intake_rx: Receiver<Record>,
    provider: &Arc<dyn AttachmentProvider>,
    ctx: &PipelineContext,
    num_threads: usize,
) -> std::io::Result<Vec<JoinHandle<()>>> {
    (0..num_threads)
        .map(|worker_id| {
            let intake_rx = intake_rx.clone();
            let provider = Arc::clone(provider);
            let ctx = ctx.clone();
            let guard = WorkerGuard::register(&ctx.live_workers);
            thread::Builder::new()
                .name(format!("{}-fetch-{}", env!("CARGO_PKG_NAME"), worker_id))
                .spawn(move || fetch_worker_loop(worker_id, intake_rx, provider, ctx, guard))
        })
        .collect()
}
