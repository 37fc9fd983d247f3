//! Application configuration constants.
//! Tuning and defaults in one place.

use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    config_filename: String,
    staging_dir_name: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                config_filename: format!(".{pkg}.toml"),
                staging_dir_name: format!("{pkg}_staging"),
            }
        })
    }

    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }

    pub fn staging_dir_name(&self) -> &str {
        &self.staging_dir_name
    }

    /// Default staging directory for downloaded attachments: `<tmp>/<pkg>_staging`.
    pub fn default_staging_dir(&self) -> PathBuf {
        std::env::temp_dir().join(self.staging_dir_name())
    }
}

// ---- Pipeline ----

/// Defaults for the concurrent pipeline when neither CLI nor config file sets them.
pub struct PipelineDefaults;

impl PipelineDefaults {
    /// Fetch pool size.
    pub const THREADS: usize = 10;
    /// Reorder buffer and intake queue capacity.
    pub const CAPACITY: usize = 10_000;
    /// Documents produced by the synthetic source.
    pub const DOCUMENT_COUNT: u64 = 50_000;
    /// Bounded wait for every suspension point (queue put/take, buffer insert/take).
    pub const POLL_INTERVAL: Duration = Duration::from_millis(100);
}

// ---- Fake provider ----

/// Simulated object-store transfer characteristics.
pub struct FakeTransfer;

impl FakeTransfer {
    /// Simulated transfer rate (bytes per second). 1.4 MB/s.
    pub const BYTES_PER_SEC: f64 = 1_400_000.0;
    /// Every simulated fetch takes at least this long.
    pub const MIN_TRANSFER: Duration = Duration::from_millis(500);
    /// Attachment size when none is configured (bytes).
    pub const DEFAULT_SIZE: u64 = 1000;
}

// ---- Archive ----

/// Unix permission bits for archive entries.
pub const ENTRY_MODE: u32 = 0o644;

/// When --verbose, list skipped documents individually only up to this many.
pub const SKIPPED_LIST_THRESHOLD: usize = 100;
