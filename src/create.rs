//! Top-level archive run: wire the selected source, provider and sink into the chosen scenario.

use anyhow::{Context, Result};
use log::{debug, info};

use crate::archive::TarGzSink;
use crate::engine::progress::{create_counter, progress_callback, refresh_bar, total_callback};
use crate::pipeline::{CancelToken, PipelineHooks, run_pipeline, run_sequential};
use crate::provider::provider_from_opts;
use crate::source::documents_from_opts;
use crate::utils::Colors;
use crate::{Opts, PipelineOpts, RunSummary, Scenario};

/// Validate `opts`, then fetch every document's attachment and write the archive at
/// `opts.archive_path` in source order.
///
/// A cancelled run returns `Ok` with [`RunSummary::cancelled`] set; the archive holds the
/// entries written so far and is properly closed.
pub fn create_archive(opts: &Opts, cancel: &CancelToken) -> Result<RunSummary> {
    opts.validate().context("invalid configuration")?;
    debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_uppercase(),
        opts
    );

    let provider = provider_from_opts(opts)?;
    let documents = documents_from_opts(opts);
    let sink = TarGzSink::create(&opts.archive_path)?;

    let bar = opts.verbose.then(|| {
        let b = create_counter("Archiving");
        refresh_bar(&b);
        b
    });
    let hooks = PipelineHooks {
        on_total: total_callback(&bar),
        on_written: progress_callback(&bar),
    };

    info!(
        "Writing {} ({:?}, {} fetch threads)",
        opts.archive_path.display(),
        opts.scenario,
        opts.threads
    );
    let summary = match opts.scenario {
        Scenario::Multi => run_pipeline(
            documents,
            provider,
            sink,
            &PipelineOpts::from(opts),
            cancel,
            hooks,
        )?,
        Scenario::Single => {
            let mut sink = sink;
            run_sequential(
                documents,
                provider.as_ref(),
                &mut sink,
                opts.on_fetch_error,
                cancel,
                hooks,
            )?
        }
    };
    if bar.is_some() {
        eprintln!();
    }

    summary.metrics.log_summary();
    let status = if summary.cancelled {
        Colors::colorize(Colors::FAILED, "cancelled")
    } else {
        Colors::colorize(Colors::WRITTEN, "done")
    };
    info!(
        "Archive {}: {} entries of {} documents",
        status, summary.written, summary.documents
    );
    if !summary.skipped.is_empty() {
        info!(
            "{}",
            Colors::colorize(
                Colors::SKIPPED,
                &format!("{} documents skipped", summary.skipped.len())
            )
        );
    }
    Ok(summary)
}
