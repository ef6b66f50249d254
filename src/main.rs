//! CLI entry point for training-image simulation

use clap::Parser;
use snesim::io::cli::{Cli, RunProcessor};

fn main() -> snesim::Result<()> {
    let cli = Cli::parse();
    let processor = RunProcessor::new(cli);
    processor.process()
}
