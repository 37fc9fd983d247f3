//! Conveyor: concurrent attachment fetching into an archive that preserves source order

pub mod archive;
pub mod create;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod provider;
pub mod source;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

pub use create::create_archive;
pub use error::{ConfigError, FetchError};
pub use pipeline::{CancelToken, PipelineHooks, ReorderBuffer, run_pipeline, run_sequential};

/// Result alias used by public conveyor API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;
