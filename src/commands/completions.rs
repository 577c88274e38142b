//! # Completions Command Implementation
//!
//! Prints a shell completion script for `repo-mirror` to stdout.
//!
//! ```bash
//! repo-mirror completions bash > ~/.local/share/bash-completion/completions/repo-mirror
//! repo-mirror completions zsh > ~/.zfunc/_repo-mirror
//! ```

use std::io::{self, Write};

use anyhow::Result;
use clap::{Args, CommandFactory};
use clap_complete::{generate, Shell};

use crate::cli::Cli;

/// Generate shell completion scripts
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// The shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Execute the `completions` command.
pub fn execute(args: CompletionsArgs) -> Result<()> {
    write_completions(args.shell, &mut io::stdout())
}

fn write_completions(shell: Shell, out: &mut dyn Write) -> Result<()> {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "repo-mirror", out);
    out.flush()?;
    Ok(())
}
