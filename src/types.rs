//! Public and internal types for the conveyor API and pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::metrics::MetricsSnapshot;
use crate::utils::config::{FakeTransfer, PipelineDefaults};

/// A document descriptor from the metadata store. The attachment lives elsewhere, under `attachment_key`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    pub id: u64,
    /// Entry name in the archive.
    pub name: String,
    pub attachment_key: String,
}

impl Document {
    pub fn new(id: u64, name: impl Into<String>, attachment_key: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            attachment_key: attachment_key.into(),
        }
    }
}

/// A fetched attachment: declared length plus a byte stream over the content.
///
/// Dropping the attachment closes the stream and releases whatever backs it (a staged temp file is deleted).
pub struct Attachment {
    length: u64,
    reader: Box<dyn Read + Send>,
}

impl Attachment {
    pub fn new(length: u64, reader: impl Read + Send + 'static) -> Self {
        Self {
            length,
            reader: Box::new(reader),
        }
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    /// Open the byte stream. Consumes the attachment; dropping the reader closes it.
    pub fn into_reader(self) -> Box<dyn Read + Send> {
        self.reader
    }
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}

/// A document, its intake sequence number and (once fetched) its attachment.
#[derive(Debug)]
pub struct Record {
    pub document: Document,
    /// 1-based position in the document source; defines archive order.
    pub sequence: u64,
    pub attachment: Option<Attachment>,
}

impl Record {
    pub fn new(document: Document, sequence: u64) -> Self {
        Self {
            document,
            sequence,
            attachment: None,
        }
    }

    pub fn attach(&mut self, attachment: Attachment) {
        self.attachment = Some(attachment);
    }
}

/// What a fetch worker hands to the reorder buffer for one sequence number.
#[derive(Debug)]
pub enum Fetched {
    Complete(Record),
    /// Fetch failed under [`FetchFailurePolicy::Skip`]; holds the slot so ordering continues.
    Skipped { document: Document, reason: String },
}

impl Fetched {
    pub fn document(&self) -> &Document {
        match self {
            Fetched::Complete(record) => &record.document,
            Fetched::Skipped { document, .. } => document,
        }
    }
}

/// A document left out of the archive because its attachment could not be fetched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SkippedDocument {
    pub sequence: u64,
    pub name: String,
    pub reason: String,
}

/// Result of one archive run.
#[derive(Debug, Default, Serialize)]
pub struct RunSummary {
    /// Documents taken from the source.
    pub documents: u64,
    /// Entries written to the archive.
    pub written: u64,
    /// In archive order.
    pub skipped: Vec<SkippedDocument>,
    /// Stopped on cancellation; the archive holds a prefix of the documents.
    pub cancelled: bool,
    pub metrics: MetricsSnapshot,
}

/// What happens when the attachment provider fails for one record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FetchFailurePolicy {
    /// Record the first error, cancel the run and fail it.
    #[default]
    Abort,
    /// Leave the document out of the archive, report it at the end, keep going.
    Skip,
}

/// Sequential baseline or the concurrent ordered pipeline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Scenario {
    Single,
    #[default]
    Multi,
}

/// Attachment backend selected at startup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Synthetic attachments with simulated transfer time.
    #[default]
    Fake,
    /// Files under `source_dir`, staged to a temp file per fetch.
    Dir,
}

/// Lib-only options for [`run_pipeline`](crate::pipeline::run_pipeline). Only what the pipeline itself needs.
#[derive(Clone, Debug)]
pub struct PipelineOpts {
    /// Fetch pool size.
    pub threads: usize,
    /// Reorder buffer capacity (also used for the intake queue bound). Must be >= 2.
    pub capacity: usize,
    /// Upper bound on every blocking wait before cancellation is re-checked.
    pub poll_interval: Duration,
    pub on_fetch_error: FetchFailurePolicy,
}

impl Default for PipelineOpts {
    fn default() -> Self {
        Self {
            threads: PipelineDefaults::THREADS,
            capacity: PipelineDefaults::CAPACITY,
            poll_interval: PipelineDefaults::POLL_INTERVAL,
            on_fetch_error: FetchFailurePolicy::default(),
        }
    }
}

impl From<&Opts> for PipelineOpts {
    fn from(o: &Opts) -> Self {
        PipelineOpts {
            threads: o.threads,
            capacity: o.capacity,
            poll_interval: Duration::from_millis(o.poll_interval_ms),
            on_fetch_error: o.on_fetch_error,
        }
    }
}

/// Full options (CLI and config file). Use [`PipelineOpts`] for lib.
#[derive(Clone, Debug, Serialize)]
pub struct Opts {
    /// Output `.tar.gz` path. Parent directory must exist.
    pub archive_path: PathBuf,
    pub scenario: Scenario,
    pub provider: ProviderKind,
    /// Documents to generate with the fake provider; upper bound on files taken from `source_dir`.
    pub document_count: u64,
    /// Attachment size range for the fake provider (bytes, inclusive).
    pub binary_size_min: u64,
    pub binary_size_max: u64,
    /// Directory backing the `dir` provider.
    pub source_dir: Option<PathBuf>,
    pub threads: usize,
    pub capacity: usize,
    pub poll_interval_ms: u64,
    pub on_fetch_error: FetchFailurePolicy,
    /// Progress bar and debug logging.
    pub verbose: bool,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            archive_path: PathBuf::new(),
            scenario: Scenario::default(),
            provider: ProviderKind::default(),
            document_count: PipelineDefaults::DOCUMENT_COUNT,
            binary_size_min: FakeTransfer::DEFAULT_SIZE,
            binary_size_max: FakeTransfer::DEFAULT_SIZE,
            source_dir: None,
            threads: PipelineDefaults::THREADS,
            capacity: PipelineDefaults::CAPACITY,
            poll_interval_ms: PipelineDefaults::POLL_INTERVAL.as_millis() as u64,
            on_fetch_error: FetchFailurePolicy::default(),
            verbose: false,
        }
    }
}

impl Opts {
    /// Reject option combinations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threads == 0 {
            return Err(ConfigError::Threads(self.threads));
        }
        if self.capacity < 2 {
            return Err(ConfigError::Capacity(self.capacity));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::PollInterval);
        }
        if self.binary_size_min > self.binary_size_max {
            return Err(ConfigError::SizeRange {
                min: self.binary_size_min,
                max: self.binary_size_max,
            });
        }
        match (self.provider, &self.source_dir) {
            (ProviderKind::Dir, None) => return Err(ConfigError::MissingSourceDir),
            (ProviderKind::Dir, Some(dir)) if !dir.is_dir() => {
                return Err(ConfigError::NotADirectory(dir.clone()));
            }
            _ => {}
        }
        if self.archive_path.as_os_str().is_empty() {
            return Err(ConfigError::MissingArchivePath);
        }
        let parent = match self.archive_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        if !parent.is_dir() {
            return Err(ConfigError::NotADirectory(parent.to_path_buf()));
        }
        Ok(())
    }
}
