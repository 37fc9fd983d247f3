use clap::Parser;
use conveyor::engine::{Cli, resolve_opts};
use conveyor::error::ConfigError;
use conveyor::utils::conveyor_toml::{apply_file_to_opts, load_conveyor_toml, parse_conveyor_toml};
use conveyor::{FetchFailurePolicy, Opts, PipelineOpts, ProviderKind, Scenario};
use std::path::PathBuf;
use std::time::Duration;

fn valid_opts(dir: &std::path::Path) -> Opts {
    Opts {
        archive_path: dir.join("out.tar.gz"),
        ..Opts::default()
    }
}

// --- defaults ---

#[test]
fn test_default_opts() {
    let opts = Opts::default();
    assert_eq!(opts.threads, 10);
    assert_eq!(opts.capacity, 10_000);
    assert_eq!(opts.document_count, 50_000);
    assert_eq!(opts.poll_interval_ms, 100);
    assert_eq!(opts.scenario, Scenario::Multi);
    assert_eq!(opts.provider, ProviderKind::Fake);
    assert_eq!(opts.on_fetch_error, FetchFailurePolicy::Abort);
}

#[test]
fn test_pipeline_opts_from_opts() {
    let opts = Opts {
        threads: 3,
        capacity: 7,
        poll_interval_ms: 25,
        on_fetch_error: FetchFailurePolicy::Skip,
        ..Opts::default()
    };
    let p = PipelineOpts::from(&opts);
    assert_eq!(p.threads, 3);
    assert_eq!(p.capacity, 7);
    assert_eq!(p.poll_interval, Duration::from_millis(25));
    assert_eq!(p.on_fetch_error, FetchFailurePolicy::Skip);
}

// --- .conveyor.toml ---

#[test]
fn test_parse_and_apply_settings() {
    let file = parse_conveyor_toml(
        r#"
        [settings]
        archive = "docs.tar.gz"
        scenario = "single"
        provider = "dir"
        source_dir = "/srv/attachments"
        document_count = 12
        binary_size = [100, 200]
        threads = 4
        capacity = 32
        poll_interval_ms = 50
        on_fetch_error = "skip"
        verbose = true
        "#,
    )
    .unwrap();
    let mut opts = Opts::default();
    apply_file_to_opts(&file, &mut opts);
    assert_eq!(opts.archive_path, PathBuf::from("docs.tar.gz"));
    assert_eq!(opts.scenario, Scenario::Single);
    assert_eq!(opts.provider, ProviderKind::Dir);
    assert_eq!(opts.source_dir, Some(PathBuf::from("/srv/attachments")));
    assert_eq!(opts.document_count, 12);
    assert_eq!((opts.binary_size_min, opts.binary_size_max), (100, 200));
    assert_eq!(opts.threads, 4);
    assert_eq!(opts.capacity, 32);
    assert_eq!(opts.poll_interval_ms, 50);
    assert_eq!(opts.on_fetch_error, FetchFailurePolicy::Skip);
    assert!(opts.verbose);
}

#[test]
fn test_fixed_binary_size_and_partial_settings() {
    let file = parse_conveyor_toml("[settings]\nbinary_size = 4096\n").unwrap();
    let mut opts = Opts::default();
    apply_file_to_opts(&file, &mut opts);
    assert_eq!((opts.binary_size_min, opts.binary_size_max), (4096, 4096));
    assert_eq!(opts.threads, 10);
}

#[test]
fn test_empty_and_invalid_toml() {
    assert!(parse_conveyor_toml("").is_ok());
    assert!(parse_conveyor_toml("[settings]\nthreads = \"many\"\n").is_err());
    assert!(parse_conveyor_toml("[settings]\nscenario = \"both\"\n").is_err());
}

#[test]
fn test_load_missing_or_invalid_file() {
    let dir = tempfile::tempdir().unwrap();
    assert!(load_conveyor_toml(dir.path()).is_none());
    std::fs::write(dir.path().join(".conveyor.toml"), "not = [valid").unwrap();
    assert!(load_conveyor_toml(dir.path()).is_none());
}

// --- CLI over file ---

#[test]
fn test_cli_overrides_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(".conveyor.toml"),
        "[settings]\nthreads = 4\ncapacity = 64\nbinary_size = 10\n",
    )
    .unwrap();
    let cli = Cli::parse_from([
        "conveyor",
        "--archive",
        "a.tar.gz",
        "--threads",
        "2",
        "--binary-size",
        "5,9",
        "--on-fetch-error",
        "skip",
    ]);
    let opts = resolve_opts(&cli, dir.path());
    assert_eq!(opts.threads, 2);
    assert_eq!(opts.capacity, 64);
    assert_eq!((opts.binary_size_min, opts.binary_size_max), (5, 9));
    assert_eq!(opts.on_fetch_error, FetchFailurePolicy::Skip);
    assert_eq!(opts.archive_path, PathBuf::from("a.tar.gz"));
}

#[test]
fn test_cli_verbose_flag_without_value() {
    let dir = tempfile::tempdir().unwrap();
    let cli = Cli::parse_from(["conveyor", "-v", "--scenario", "single"]);
    let opts = resolve_opts(&cli, dir.path());
    assert!(opts.verbose);
    assert_eq!(opts.scenario, Scenario::Single);
}

// --- validate ---

#[test]
fn test_validate_accepts_defaults_with_archive() {
    let dir = tempfile::tempdir().unwrap();
    assert!(valid_opts(dir.path()).validate().is_ok());
}

#[test]
fn test_validate_rejects_bad_values() {
    let dir = tempfile::tempdir().unwrap();
    let base = valid_opts(dir.path());

    let opts = Opts { threads: 0, ..base.clone() };
    assert!(matches!(opts.validate(), Err(ConfigError::Threads(0))));

    let opts = Opts { capacity: 1, ..base.clone() };
    assert!(matches!(opts.validate(), Err(ConfigError::Capacity(1))));

    let opts = Opts { poll_interval_ms: 0, ..base.clone() };
    assert!(matches!(opts.validate(), Err(ConfigError::PollInterval)));

    let opts = Opts {
        binary_size_min: 10,
        binary_size_max: 5,
        ..base.clone()
    };
    assert!(matches!(
        opts.validate(),
        Err(ConfigError::SizeRange { min: 10, max: 5 })
    ));

    let opts = Opts {
        archive_path: PathBuf::new(),
        ..base.clone()
    };
    assert!(matches!(opts.validate(), Err(ConfigError::MissingArchivePath)));
}

#[test]
fn test_validate_dir_provider_and_parent() {
    let dir = tempfile::tempdir().unwrap();
    let base = valid_opts(dir.path());

    let opts = Opts {
        provider: ProviderKind::Dir,
        ..base.clone()
    };
    assert!(matches!(opts.validate(), Err(ConfigError::MissingSourceDir)));

    let opts = Opts {
        provider: ProviderKind::Dir,
        source_dir: Some(dir.path().join("missing")),
        ..base.clone()
    };
    assert!(matches!(opts.validate(), Err(ConfigError::NotADirectory(_))));

    let opts = Opts {
        archive_path: dir.path().join("no").join("such").join("out.tar.gz"),
        ..base
    };
    assert!(matches!(opts.validate(), Err(ConfigError::NotADirectory(_))));
}
