//! Conveyor CLI: fetch attachments concurrently and archive them in source order.

use anyhow::Result;
use clap::Parser;
use conveyor::engine::arg_parser::Cli;
use conveyor::engine::handle_run;
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
