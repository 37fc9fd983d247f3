//! Intake enqueuer: reads the document source, numbers each document and feeds the intake queue.

use crossbeam_channel::{SendTimeoutError, Sender};
use log::{debug, info};
use std::thread::{self, JoinHandle};

use super::context::PipelineContext;
use crate::{Document, Record};

/// Spawn the enqueue thread. Returns the number of records enqueued when joined.
pub fn spawn_enqueue_thread<I>(
    documents: I,
    intake_tx: Sender<Record>,
    count_tx: Sender<u64>,
    ctx: PipelineContext,
) -> std::io::Result<JoinHandle<u64>>
where
    I: IntoIterator<Item = Document>,
    I::IntoIter: Send + 'static,
{
    let documents = documents.into_iter();
    thread::Builder::new()
        .name(format!("{}-enqueue", env!("CARGO_PKG_NAME")))
        .spawn(move || run_enqueue_loop(intake_tx, count_tx, &ctx, documents))
}

/// Run the enqueue loop: wrap each document in a [`Record`] with the next sequence number (from 1)
/// and send it to `intake_tx`. A full queue is retried every poll interval, never dropped.
/// Stops early when cancelled. Sends the count on `count_tx`, drops `intake_tx` so idle
/// workers see the intake close, and returns the count.
pub fn run_enqueue_loop<I>(
    intake_tx: Sender<Record>,
    count_tx: Sender<u64>,
    ctx: &PipelineContext,
    documents: I,
) -> u64
where
    I: Iterator<Item = Document>,
{
    let mut count = 0_u64;
    'documents: for document in documents {
        if ctx.cancel.is_cancelled() {
            break;
        }
        let mut record = Record::new(document, count + 1);
        loop {
            match intake_tx.send_timeout(record, ctx.poll_interval) {
                Ok(()) => break,
                Err(SendTimeoutError::Timeout(back)) => {
                    ctx.metrics.inc_intake_full();
                    debug!("intake queue full at {}", back.document.name);
                    if ctx.cancel.is_cancelled() {
                        break 'documents;
                    }
                    record = back;
                }
                Err(SendTimeoutError::Disconnected(_)) => break 'documents,
            }
        }
        count += 1;
    }
    if ctx.cancel.is_cancelled() {
        info!("Enqueue interrupted after {} documents", count);
    } else {
        debug!("Enqueued {} documents", count);
    }
    let _ = count_tx.send(count);
    drop(intake_tx);
    count
}
