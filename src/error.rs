//! Typed errors at the crate's seams: attachment providers and option validation.
//!
//! Everything above these boundaries uses `anyhow` with context.

use std::path::PathBuf;
use thiserror::Error;

/// Failure of an [`AttachmentProvider`](crate::provider::AttachmentProvider) to produce one attachment.
#[derive(Debug, Error)]
pub enum FetchError {
    /// No object stored under the key
    #[error("attachment not found: {0}")]
    NotFound(String),

    /// Reading from the store or staging to local disk failed
    #[error("I/O error fetching {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// The provider gave up because the run is shutting down
    #[error("fetch of {0} cancelled")]
    Cancelled(String),
}

impl FetchError {
    pub fn io(key: impl Into<String>, source: std::io::Error) -> Self {
        FetchError::Io {
            key: key.into(),
            source,
        }
    }
}

/// Invalid option combination, reported before any thread is started.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("fetch pool needs at least one thread (got {0})")]
    Threads(usize),

    /// One slot is reserved for the next in-order record, so anything below 2 cannot reorder.
    #[error("buffer capacity must be at least 2 (got {0})")]
    Capacity(usize),

    #[error("poll interval must be greater than zero")]
    PollInterval,

    #[error("invalid attachment size range: min {min} > max {max}")]
    SizeRange { min: u64, max: u64 },

    #[error("the dir provider requires --source-dir")]
    MissingSourceDir,

    #[error("missing archive output path")]
    MissingArchivePath,

    #[error("not an existing directory: {0}")]
    NotADirectory(PathBuf),
}
