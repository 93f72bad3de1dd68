use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use prose_detector::cli::{self, Cli};

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    cli::run(&cli)
}
