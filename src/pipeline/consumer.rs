//! Archive consumer: drains the reorder buffer in sequence order into the archive sink.

use anyhow::{Context, Result, anyhow};
use crossbeam_channel::Sender;
use log::{debug, info};
use std::thread::{self, JoinHandle};
use std::time::SystemTime;

use super::context::PipelineContext;
use super::reorder::TakeOutcome;
use crate::archive::ArchiveSink;
use crate::metrics::Metrics;
use crate::{Fetched, Record};

/// How the consumer loop ended (errors are returned separately).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConsumerOutcome {
    pub written: u64,
    pub skipped: u64,
    /// Stopped on cancellation before end-of-stream.
    pub cancelled: bool,
}

/// Spawn the archive thread. Its result (including sink errors) is sent on `done_tx`.
pub fn spawn_consumer_thread<S>(
    mut sink: S,
    ctx: PipelineContext,
    on_written: Option<Box<dyn Fn(usize) + Send>>,
    done_tx: Sender<Result<ConsumerOutcome>>,
) -> std::io::Result<JoinHandle<()>>
where
    S: ArchiveSink + Send + 'static,
{
    thread::Builder::new()
        .name(format!("{}-archive", env!("CARGO_PKG_NAME")))
        .spawn(move || {
            let result = run_consumer_loop(&mut sink, &ctx, on_written.as_deref());
            let _ = done_tx.send(result);
        })
}

/// Take records in order until end-of-stream and write each one to `sink`, then finish the sink.
/// On cancellation the sink is still finished so the partial archive is readable.
/// Any sink error ends the loop and is returned.
pub fn run_consumer_loop<S>(
    sink: &mut S,
    ctx: &PipelineContext,
    on_written: Option<&(dyn Fn(usize) + Send)>,
) -> Result<ConsumerOutcome>
where
    S: ArchiveSink + ?Sized,
{
    let mut outcome = ConsumerOutcome::default();
    loop {
        if ctx.cancel.is_cancelled() {
            info!(
                "Archive stopped after {} entries (cancelled)",
                outcome.written
            );
            outcome.cancelled = true;
            break;
        }
        match ctx.buffer.take_timeout(ctx.poll_interval) {
            TakeOutcome::Item(Fetched::Complete(record)) => {
                write_record(sink, record, &ctx.metrics)?;
                outcome.written += 1;
                if let Some(f) = on_written {
                    f(1);
                }
            }
            TakeOutcome::Item(Fetched::Skipped { document, reason }) => {
                debug!("skipping {}: {}", document.name, reason);
                outcome.skipped += 1;
                if let Some(f) = on_written {
                    f(1);
                }
            }
            TakeOutcome::EndOfStream => {
                debug!("end of stream after {} entries", outcome.written);
                break;
            }
            TakeOutcome::Pending => {}
        }
    }
    sink.finish()?;
    Ok(outcome)
}

/// Stream one record's attachment into the sink, then close the attachment.
pub fn write_record<S>(sink: &mut S, record: Record, metrics: &Metrics) -> Result<u64>
where
    S: ArchiveSink + ?Sized,
{
    let Record {
        document,
        sequence,
        attachment,
    } = record;
    let attachment = attachment.ok_or_else(|| {
        anyhow!(
            "record {} ({}) reached the archive without an attachment",
            sequence,
            document.name
        )
    })?;
    let length = attachment.length();
    let mut content = attachment.into_reader();
    sink.write_entry(&document.name, length, SystemTime::now(), &mut content)
        .with_context(|| format!("write archive entry {}", document.name))?;
    // Closing the stream releases the backing resource (staged files are deleted here).
    drop(content);
    metrics.observe_written(length);
    debug!("wrote {} ({} bytes)", document.name, length);
    Ok(length)
}
