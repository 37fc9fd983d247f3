use anyhow::Result;

use super::context::PipelineContext;
use crate::SkippedDocument;
use crate::utils::config::SKIPPED_LIST_THRESHOLD;

/// Check pipeline result: if a worker recorded a fatal fetch error, return it.
/// Otherwise return the skipped documents (logged). Call after joining every thread.
pub fn check_for_first_error_or_skipped(ctx: &PipelineContext) -> Result<Vec<SkippedDocument>> {
    if let Some(msg) = ctx.take_first_error() {
        return Err(anyhow::anyhow!("{}", msg));
    }
    let skipped = ctx.take_skipped();
    log_skipped(&skipped);
    Ok(skipped)
}

/// Warn about skipped documents; list them at debug level (up to a threshold).
pub fn log_skipped(skipped: &[SkippedDocument]) {
    if skipped.is_empty() {
        return;
    }
    log::warn!(
        "Skipped {} documents whose attachments could not be fetched",
        skipped.len()
    );
    for s in skipped.iter().take(SKIPPED_LIST_THRESHOLD) {
        log::debug!("  skipped #{} {}: {}", s.sequence, s.name, s.reason);
    }
    if skipped.len() > SKIPPED_LIST_THRESHOLD {
        log::debug!("  ... and {} more", skipped.len() - SKIPPED_LIST_THRESHOLD);
    }
}
