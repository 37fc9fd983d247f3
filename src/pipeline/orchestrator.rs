use anyhow::{Result, anyhow};
use crossbeam_channel::{Receiver, never, select};
use log::{debug, info, warn};
use std::sync::Arc;
use std::thread::JoinHandle;

use super::consumer::{ConsumerOutcome, spawn_consumer_thread};
use super::context::{
    CancelToken, PipelineChannels, PipelineContext, PipelineHandles, PipelineHooks,
    create_pipeline_channels,
};
use super::enqueue::spawn_enqueue_thread;
use super::error_handler::check_for_first_error_or_skipped;
use super::fetch::spawn_fetch_workers;
use crate::archive::ArchiveSink;
use crate::metrics::Metrics;
use crate::provider::AttachmentProvider;
use crate::{Document, PipelineOpts, RunSummary};

/// Main orchestrator: build the ordered archive from `documents` with a pool of fetch workers.
///
/// Enqueue thread → intake queue → fetch workers (parallel) → reorder buffer → archive thread → `sink`.
///
/// Every thread started here is joined before returning. `cancel` is the caller's token (e.g. Ctrl+C);
/// when it fires the run stops promptly and the summary comes back with `cancelled` set.
/// Errors: a fatal fetch under [`FetchFailurePolicy::Abort`](crate::FetchFailurePolicy::Abort),
/// any sink failure, or a stall (no fetch workers left while the next record is missing).
pub fn run_pipeline<I, S>(
    documents: I,
    provider: Arc<dyn AttachmentProvider>,
    sink: S,
    opts: &PipelineOpts,
    cancel: &CancelToken,
    hooks: PipelineHooks,
) -> Result<RunSummary>
where
    I: IntoIterator<Item = Document>,
    I::IntoIter: Send + 'static,
    S: ArchiveSink + Send + 'static,
{
    let metrics = Arc::new(Metrics::new());
    let ctx = PipelineContext::new(opts, Arc::clone(&metrics));
    let channels = create_pipeline_channels(opts.capacity);
    debug!(
        "pipeline: {} fetch workers, buffer capacity {}",
        opts.threads, opts.capacity
    );

    let PipelineHooks {
        on_total,
        on_written,
    } = hooks;

    let started = start_pipeline_threads(documents, &provider, sink, &ctx, opts, channels, on_written);
    let (handles, count_rx, done_rx) = match started {
        Ok(parts) => parts,
        Err(e) => {
            ctx.cancel.cancel();
            return Err(e);
        }
    };

    let outcome = wait_for_completion(&ctx, cancel, count_rx, done_rx, on_total.as_deref());

    // Consumer is done (or failed): stop whatever is still running and join it all.
    ctx.cancel.cancel();
    let joined = shutdown_pipeline_handles(handles);
    provider.shutdown();

    // A stall or sink failure explains an enqueue panic better than the panic itself.
    let outcome = outcome?;
    let documents = joined?;
    let skipped = check_for_first_error_or_skipped(&ctx)?;
    if !outcome.cancelled && outcome.written + outcome.skipped != documents {
        warn!(
            "archive holds {} entries and {} skipped of {} documents",
            outcome.written, outcome.skipped, documents
        );
    }

    Ok(RunSummary {
        documents,
        written: outcome.written,
        skipped,
        cancelled: outcome.cancelled,
        metrics: metrics.snapshot(),
    })
}

/// Spawn fetch workers, the enqueue thread and the archive thread, in that order.
fn start_pipeline_threads<I, S>(
    documents: I,
    provider: &Arc<dyn AttachmentProvider>,
    sink: S,
    ctx: &PipelineContext,
    opts: &PipelineOpts,
    channels: PipelineChannels,
    on_written: Option<Box<dyn Fn(usize) + Send>>,
) -> Result<(
    PipelineHandles,
    Receiver<u64>,
    Receiver<Result<ConsumerOutcome>>,
)>
where
    I: IntoIterator<Item = Document>,
    I::IntoIter: Send + 'static,
    S: ArchiveSink + Send + 'static,
{
    let PipelineChannels {
        intake_tx,
        intake_rx,
        count_tx,
        count_rx,
        done_tx,
        done_rx,
    } = channels;
    let worker_handles = spawn_fetch_workers(intake_rx, provider, ctx, opts.threads)?;
    let enqueue_handle = spawn_enqueue_thread(documents, intake_tx, count_tx, ctx.clone())?;
    let consumer_handle = spawn_consumer_thread(sink, ctx.clone(), on_written, done_tx)?;
    Ok((
        PipelineHandles {
            enqueue_handle,
            worker_handles,
            consumer_handle,
        },
        count_rx,
        done_rx,
    ))
}

/// Wait for the archive thread's result. Meanwhile: forward the enqueue count into the reorder
/// buffer as soon as it arrives, propagate external cancellation, and fail on a stall.
fn wait_for_completion(
    ctx: &PipelineContext,
    external: &CancelToken,
    count_rx: Receiver<u64>,
    done_rx: Receiver<Result<ConsumerOutcome>>,
    on_total: Option<&(dyn Fn(u64) + Send)>,
) -> Result<ConsumerOutcome> {
    let no_more_totals = never::<u64>();
    let mut total_known = false;
    let apply_total = |total: u64| {
        ctx.buffer.set_total(total);
        if let Some(f) = on_total {
            f(total);
        }
    };
    loop {
        let totals = if total_known {
            &no_more_totals
        } else {
            &count_rx
        };
        select! {
            recv(totals) -> msg => {
                if let Ok(total) = msg {
                    apply_total(total);
                }
                total_known = true;
            }
            recv(done_rx) -> msg => {
                return msg.unwrap_or_else(|_| Err(anyhow!("archive thread panicked")));
            }
            default(ctx.poll_interval) => {
                if external.is_cancelled() && !ctx.cancel.is_cancelled() {
                    info!("Cancel requested; stopping pipeline");
                    ctx.cancel.cancel();
                }
                if ctx.cancel.is_cancelled() || ctx.live_workers() > 0 {
                    continue;
                }
                // Workers exit normally only after the intake closes, which happens after the
                // count is sent; pick it up before deciding anything is stuck.
                if let Ok(total) = totals.try_recv() {
                    apply_total(total);
                    total_known = true;
                    continue;
                }
                if ctx.buffer.is_waiting_for_next() {
                    ctx.cancel.cancel();
                    return Err(anyhow!(
                        "pipeline stalled: no fetch workers left and record {} never arrived ({} of {} delivered)",
                        ctx.buffer.next_sequence(),
                        ctx.buffer.items_returned(),
                        ctx.buffer
                            .total_items()
                            .map(|t| t.to_string())
                            .unwrap_or_else(|| "unknown".to_string())
                    ));
                }
            }
        }
    }
}

/// Join the enqueue, fetch and archive threads. Returns the enqueued document count.
/// Every handle is joined before an enqueue panic is reported.
pub fn shutdown_pipeline_handles(handles: PipelineHandles) -> Result<u64> {
    let PipelineHandles {
        enqueue_handle,
        worker_handles,
        consumer_handle,
    } = handles;
    let count = enqueue_handle.join();
    let mut panicked = 0;
    for h in worker_handles {
        if h.join().is_err() {
            panicked += 1;
        }
    }
    if panicked > 0 {
        warn!("{} fetch workers panicked", panicked);
    }
    join_quietly(consumer_handle);
    count.map_err(|_| anyhow!("enqueue thread panicked"))
}

/// The archive thread reports through its channel; a panic there is already surfaced as an error.
fn join_quietly(handle: JoinHandle<()>) {
    let _ = handle.join();
}
