//! Engine module: command line surface and progress display

pub mod arg_parser;
pub mod handlers;
pub mod progress;

pub use arg_parser::Cli;
pub use handlers::{handle_run, resolve_opts};
