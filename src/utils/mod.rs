pub mod config;
pub mod conveyor_toml;
pub mod logger;
pub mod staging;

pub use config::*;
pub use conveyor_toml::{apply_file_to_opts, load_conveyor_toml};
pub use logger::{Colors, setup_logging};
pub use staging::{prepare_staging_dir, remove_staging_dir_if_empty, stage_to_temp};
