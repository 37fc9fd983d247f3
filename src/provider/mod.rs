//! Attachment providers: pluggable backends that turn an attachment key into bytes.

pub mod directory;
pub mod fake;

pub use directory::DirectoryProvider;
pub use fake::{FakeProvider, KeyPattern};

use anyhow::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::FetchError;
use crate::pipeline::CancelToken;
use crate::utils::config::{PackagePaths, PipelineDefaults};
use crate::{Attachment, Opts, ProviderKind};

/// A backend holding document attachments (object store, local directory, simulation).
///
/// Called concurrently from every fetch worker. `fetch` may block; long fetches should watch
/// `cancel` and return [`FetchError::Cancelled`] once it is set.
pub trait AttachmentProvider: Send + Sync {
    fn fetch(&self, key: &str, cancel: &CancelToken) -> Result<Attachment, FetchError>;

    /// Release pooled resources. Called once after every worker has exited.
    fn shutdown(&self) {}
}

/// Build the provider selected in `opts`.
pub fn provider_from_opts(opts: &Opts) -> Result<Arc<dyn AttachmentProvider>> {
    match opts.provider {
        ProviderKind::Fake => Ok(Arc::new(FakeProvider::new(
            opts.binary_size_min,
            opts.binary_size_max,
        ))),
        ProviderKind::Dir => {
            let root = opts
                .source_dir
                .as_deref()
                .ok_or(crate::error::ConfigError::MissingSourceDir)?;
            let staging = PackagePaths::get().default_staging_dir();
            Ok(Arc::new(DirectoryProvider::new(root, &staging)?))
        }
    }
}

/// Sleep for `total`, waking at least every poll interval to check `cancel`.
/// Returns false if cancelled before the time was up.
pub(crate) fn sleep_unless_cancelled(total: Duration, cancel: &CancelToken) -> bool {
    let deadline = Instant::now() + total;
    loop {
        if cancel.is_cancelled() {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        std::thread::sleep((deadline - now).min(PipelineDefaults::POLL_INTERVAL));
    }
}
