//! Pipeline context: shared state handed to the enqueue, fetch and archive threads, plus the channels between them.

use anyhow::Result;
use crossbeam_channel::{Receiver, Sender, bounded};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use super::consumer::ConsumerOutcome;
use super::reorder::ReorderBuffer;
use crate::metrics::Metrics;
use crate::{FetchFailurePolicy, Fetched, PipelineOpts, Record, SkippedDocument};

/// Cooperative cancellation flag. Cheap to clone; all clones share one flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Decrements the live worker count when a fetch worker exits, including by panic.
pub struct WorkerGuard {
    live: Arc<AtomicUsize>,
}

impl WorkerGuard {
    pub fn register(live: &Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::SeqCst);
        Self {
            live: Arc::clone(live),
        }
    }
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Shared context for one pipeline run. Cloned into every thread.
#[derive(Clone)]
pub struct PipelineContext {
    pub buffer: Arc<ReorderBuffer<Fetched>>,
    pub metrics: Arc<Metrics>,
    /// Pipeline-internal token: set on abort, on external cancel, and at teardown.
    pub cancel: CancelToken,
    pub poll_interval: Duration,
    pub on_fetch_error: FetchFailurePolicy,
    pub first_error: Arc<Mutex<Option<String>>>,
    pub skipped: Arc<Mutex<Vec<SkippedDocument>>>,
    pub live_workers: Arc<AtomicUsize>,
}

impl PipelineContext {
    pub fn new(opts: &PipelineOpts, metrics: Arc<Metrics>) -> Self {
        Self {
            buffer: Arc::new(ReorderBuffer::new(opts.capacity)),
            metrics,
            cancel: CancelToken::new(),
            poll_interval: opts.poll_interval,
            on_fetch_error: opts.on_fetch_error,
            first_error: Arc::new(Mutex::new(None)),
            skipped: Arc::new(Mutex::new(Vec::new())),
            live_workers: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn live_workers(&self) -> usize {
        self.live_workers.load(Ordering::SeqCst)
    }

    /// Keep the first error only; later ones are usually fallout from the same failure.
    pub fn record_first_error(&self, msg: String) {
        let mut first = self
            .first_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        first.get_or_insert(msg);
    }

    pub fn take_first_error(&self) -> Option<String> {
        self.first_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    pub fn record_skipped(&self, skipped: SkippedDocument) {
        self.skipped
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(skipped);
    }

    /// Skipped documents in archive order.
    pub fn take_skipped(&self) -> Vec<SkippedDocument> {
        let mut skipped = std::mem::take(
            &mut *self.skipped.lock().unwrap_or_else(PoisonError::into_inner),
        );
        skipped.sort_by_key(|s| s.sequence);
        skipped
    }
}

/// Optional callbacks for progress reporting. Called from pipeline threads; keep them fast.
#[derive(Default)]
pub struct PipelineHooks {
    /// Called once with the total document count when the source is exhausted.
    pub on_total: Option<Box<dyn Fn(u64) + Send>>,
    /// Called with the number of entries just written.
    pub on_written: Option<Box<dyn Fn(usize) + Send>>,
}

/// Channels between the pipeline threads. Enqueue thread gets intake_tx and count_tx; workers get
/// intake_rx; the archive thread reports through done_tx.
pub struct PipelineChannels {
    pub intake_tx: Sender<Record>,
    pub intake_rx: Receiver<Record>,
    pub count_tx: Sender<u64>,
    pub count_rx: Receiver<u64>,
    pub done_tx: Sender<Result<ConsumerOutcome>>,
    pub done_rx: Receiver<Result<ConsumerOutcome>>,
}

/// `intake_cap` bounds the intake queue between the enqueue thread and the fetch pool.
pub fn create_pipeline_channels(intake_cap: usize) -> PipelineChannels {
    let (intake_tx, intake_rx) = bounded::<Record>(intake_cap);
    let (count_tx, count_rx) = bounded::<u64>(1);
    let (done_tx, done_rx) = bounded::<Result<ConsumerOutcome>>(1);
    PipelineChannels {
        intake_tx,
        intake_rx,
        count_tx,
        count_rx,
        done_tx,
        done_rx,
    }
}

/// Thread handles for one run. The orchestrator joins all of them before returning.
pub struct PipelineHandles {
    pub enqueue_handle: JoinHandle<u64>,
    pub worker_handles: Vec<JoinHandle<()>>,
    pub consumer_handle: JoinHandle<()>,
}
