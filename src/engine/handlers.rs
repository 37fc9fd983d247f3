//! CLI command handler: merge defaults, `.conveyor.toml` and flags, then build the archive.

use anyhow::{Context, Result, bail};
use log::{debug, warn};
use std::path::{Path, PathBuf};

use crate::create::create_archive;
use crate::engine::arg_parser::Cli;
use crate::pipeline::CancelToken;
use crate::utils::{apply_file_to_opts, load_conveyor_toml, setup_logging};
use crate::Opts;

/// Overwrite opts field from CLI when the flag was given.
macro_rules! apply_cli_opt {
    ($cli:expr, $opts:expr, $field:ident) => {
        if let Some(v) = $cli.$field {
            $opts.$field = v;
        }
    };
}

/// Defaults, then the config file in `config_dir` (if any), then CLI flags.
pub fn resolve_opts(cli: &Cli, config_dir: &Path) -> Opts {
    let mut opts = Opts::default();
    if let Some(file) = load_conveyor_toml(config_dir) {
        apply_file_to_opts(&file, &mut opts);
    }
    if let Some(ref p) = cli.archive {
        opts.archive_path = p.clone();
    }
    if let Some(ref p) = cli.source_dir {
        opts.source_dir = Some(p.clone());
    }
    if let Some(ref sizes) = cli.binary_size {
        match sizes.as_slice() {
            [n] => {
                opts.binary_size_min = *n;
                opts.binary_size_max = *n;
            }
            [min, max] => {
                opts.binary_size_min = *min;
                opts.binary_size_max = *max;
            }
            _ => warn!("--binary-size: expected SIZE or MIN,MAX"),
        }
    }
    apply_cli_opt!(cli, opts, scenario);
    apply_cli_opt!(cli, opts, provider);
    apply_cli_opt!(cli, opts, document_count);
    apply_cli_opt!(cli, opts, threads);
    apply_cli_opt!(cli, opts, capacity);
    apply_cli_opt!(cli, opts, poll_interval_ms);
    apply_cli_opt!(cli, opts, on_fetch_error);
    apply_cli_opt!(cli, opts, verbose);
    opts
}

/// Build the archive, or print the effective configuration with --show-config.
/// Ctrl+C cancels the run; the partial archive is left in place and the command fails.
pub fn handle_run(cli: &Cli) -> Result<()> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let opts = resolve_opts(cli, &cwd);
    setup_logging(opts.verbose);

    if cli.show_config {
        let json = serde_json::to_string_pretty(&opts).context("serialize configuration")?;
        println!("{}", json);
        return Ok(());
    }

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || handler_token.cancel()).context("install Ctrl+C handler")?;

    let summary = create_archive(&opts, &cancel)?;
    if summary.cancelled {
        bail!(
            "cancelled by user; partial archive left at {}",
            opts.archive_path.display()
        );
    }
    debug!(
        "{} written, {} skipped",
        summary.written,
        summary.skipped.len()
    );
    Ok(())
}
