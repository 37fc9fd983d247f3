//! Load `.conveyor.toml` from a directory (CLI only). Lib callers pass options directly.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::utils::config::PackagePaths;
use crate::{FetchFailurePolicy, Opts, ProviderKind, Scenario};

#[derive(Debug, Default, Deserialize)]
pub struct ConveyorToml {
    #[serde(default)]
    settings: SettingsSection,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsSection {
    archive: Option<String>,
    scenario: Option<Scenario>,
    provider: Option<ProviderKind>,
    document_count: Option<u64>,
    /// One size, or `[min, max]`.
    binary_size: Option<SizeSetting>,
    source_dir: Option<String>,
    threads: Option<usize>,
    capacity: Option<usize>,
    poll_interval_ms: Option<u64>,
    on_fetch_error: Option<FetchFailurePolicy>,
    verbose: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SizeSetting {
    Fixed(u64),
    Range(Vec<u64>),
}

/// Parse config text. Errors are returned so callers can report them with the file path.
pub fn parse_conveyor_toml(s: &str) -> Result<ConveyorToml, toml::de::Error> {
    toml::from_str(s)
}

/// Load the package config file from `dir` if present. Returns None if missing, unreadable or invalid (invalid is logged).
pub fn load_conveyor_toml(dir: &Path) -> Option<ConveyorToml> {
    let path = dir.join(PackagePaths::get().config_filename());
    let s = std::fs::read_to_string(&path).ok()?;
    parse_conveyor_toml(&s)
        .map_err(|e| log::warn!("{}: {}", path.display(), e))
        .ok()
}

/// Overwrite opts field from file when present.
macro_rules! apply_file_opt {
    ($set:expr, $opts:expr, $set_field:ident => $opts_field:ident) => {
        if let Some(v) = $set.$set_field {
            $opts.$opts_field = v;
        }
    };
}

/// Apply file config to opts (only fields present in the file). Call before applying CLI.
pub fn apply_file_to_opts(file: &ConveyorToml, opts: &mut Opts) {
    let set = &file.settings;
    if let Some(ref p) = set.archive {
        opts.archive_path = PathBuf::from(p);
    }
    if let Some(ref p) = set.source_dir {
        opts.source_dir = Some(PathBuf::from(p));
    }
    match &set.binary_size {
        Some(SizeSetting::Fixed(n)) => {
            opts.binary_size_min = *n;
            opts.binary_size_max = *n;
        }
        Some(SizeSetting::Range(v)) => match v.as_slice() {
            [n] => {
                opts.binary_size_min = *n;
                opts.binary_size_max = *n;
            }
            [min, max] => {
                opts.binary_size_min = *min;
                opts.binary_size_max = *max;
            }
            _ => log::warn!("binary_size: expected one or two values, got {}", v.len()),
        },
        None => {}
    }
    apply_file_opt!(set, opts, scenario => scenario);
    apply_file_opt!(set, opts, provider => provider);
    apply_file_opt!(set, opts, document_count => document_count);
    apply_file_opt!(set, opts, threads => threads);
    apply_file_opt!(set, opts, capacity => capacity);
    apply_file_opt!(set, opts, poll_interval_ms => poll_interval_ms);
    apply_file_opt!(set, opts, on_fetch_error => on_fetch_error);
    apply_file_opt!(set, opts, verbose => verbose);
}
