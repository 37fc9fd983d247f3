use clap::Parser;
use std::path::PathBuf;

use crate::{FetchFailurePolicy, ProviderKind, Scenario};

/// Build an ordered archive of document attachments fetched concurrently.
///
/// Every setting also reads from `.conveyor.toml` in the working directory; flags win.
#[derive(Clone, Debug, Parser)]
#[command(name = "conveyor")]
#[command(about = "Fetch document attachments concurrently and write them to a .tar.gz in source order.")]
pub struct Cli {
    /// Output archive (.tar.gz). Parent directory must exist.
    #[arg(long, short = 'a', value_name = "FILE")]
    pub archive: Option<PathBuf>,

    /// `multi` runs the concurrent pipeline; `single` fetches one document at a time.
    #[arg(long, short = 's', value_enum)]
    pub scenario: Option<Scenario>,

    /// Attachment backend.
    #[arg(long, short = 'p', value_enum)]
    pub provider: Option<ProviderKind>,

    /// Documents to generate (fake provider) or the most files to take (dir provider).
    #[arg(long, short = 'n')]
    pub document_count: Option<u64>,

    /// Fake attachment size in bytes: `SIZE` or `MIN,MAX`.
    #[arg(long, short = 'b', value_delimiter = ',', num_args = 1..=2)]
    pub binary_size: Option<Vec<u64>>,

    /// Directory holding attachments for the dir provider.
    #[arg(long, short = 'd', value_name = "DIR")]
    pub source_dir: Option<PathBuf>,

    /// Fetch pool size.
    #[arg(long, short = 't')]
    pub threads: Option<usize>,

    /// Reorder buffer capacity (at least 2).
    #[arg(long, short = 'c')]
    pub capacity: Option<usize>,

    /// Longest blocking wait before cancellation is re-checked (milliseconds).
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,

    /// What to do when an attachment cannot be fetched.
    #[arg(long, value_enum)]
    pub on_fetch_error: Option<FetchFailurePolicy>,

    /// Verbose output with a progress bar.
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,

    /// Print the effective configuration as JSON and exit.
    #[arg(long)]
    pub show_config: bool,
}
