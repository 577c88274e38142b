//! # List Command Implementation
//!
//! This module implements the `list` subcommand, which prints every mirror
//! found in the configured repository directory. Only mirrors inside an owner
//! directory are listed. It is a read-only operation.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use repo_mirror::config::Settings;
use repo_mirror::store::{MirrorEntry, MirrorStore};

/// List the mirrors in the repository directory
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Print a JSON array instead of one mirror per line
    #[arg(long)]
    pub json: bool,
}

/// Execute the `list` command.
pub fn execute(config: &Path, args: ListArgs) -> Result<()> {
    let settings = Settings::from_file(config)
        .with_context(|| format!("Failed to load config from {}", config.display()))?;
    let store = MirrorStore::new(settings.repo_dir.clone()).with_owner_dirs(settings.owner_dirs);
    let mirrors: Vec<MirrorEntry> = store.each_mirror().collect();
    print!("{}", render(&mirrors, args.json)?);
    Ok(())
}

fn render(mirrors: &[MirrorEntry], json: bool) -> Result<String> {
    if json {
        return Ok(format!("{}\n", serde_json::to_string_pretty(mirrors)?));
    }
    Ok(mirrors
        .iter()
        .map(|m| format!("{}/{}\t{}\n", m.owner, m.name, m.path.display()))
        .collect())
}
