//! CLI argument parsing and command dispatch

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::LevelFilter;

use crate::commands;

/// Repo Mirror - Keep bare git mirrors of GitHub repositories and gists
#[derive(Parser, Debug)]
#[command(name = "repo-mirror")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Path to the INI configuration file
    #[arg(
        short,
        long,
        global = true,
        value_name = "FILE",
        env = "REPO_MIRROR_CONFIG"
    )]
    config: Option<PathBuf>,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "info")]
    log_level: LevelFilter,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Mirror the selected sources into the repository directory
    Sync(commands::sync::SyncArgs),

    /// List the mirrors in the repository directory
    List(commands::list::ListArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        self.init_logging();
        let config = self
            .config
            .unwrap_or_else(repo_mirror::defaults::default_config_path);

        match self.command {
            Commands::Sync(args) => commands::sync::execute(&config, args),
            Commands::List(args) => commands::list::execute(&config, args),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }

    fn init_logging(&self) {
        let level = if self.quiet {
            LevelFilter::Warn.min(self.log_level)
        } else {
            self.log_level
        };
        // RUST_LOG, when set, takes precedence over the flags.
        let _ = env_logger::Builder::new()
            .filter_level(level)
            .parse_default_env()
            .format_timestamp_secs()
            .try_init();
    }
}
