//! # Repo Mirror CLI
//!
//! Binary entry point for the `repo-mirror` command-line tool. It parses
//! arguments, sets up logging and dispatches to a subcommand; the mirroring
//! itself lives in the `repo_mirror` library crate.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
