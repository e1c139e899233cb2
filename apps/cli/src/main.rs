//! lawsite CLI — update-stage runner for the tribal-law publishing
//! pipeline.
//!
//! Each subcommand is one pipeline stage: it reads a JSON state envelope
//! from stdin, does its work, and writes the state back to stdout for
//! the orchestrating update framework. Logs go to stderr.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli)
}
