//! # Sync Command Implementation
//!
//! This module implements the `sync` subcommand, which mirrors the selected
//! GitHub sources into the configured repository directory.
//!
//! ## Sources
//!
//! - **`--starred-repos`**: repositories starred by the configured user
//! - **`--user-repos`**: repositories of the authenticated user
//! - **`--user-gists`**: gists of the configured user
//! - **`--starred-gists`**: gists starred by the authenticated user
//!
//! At least one source is required. SIGINT or SIGTERM stops the run after
//! the items currently being cloned or fetched.

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::builder::RangedU64ValueParser;
use clap::Args;
use log::warn;

use repo_mirror::cancel;
use repo_mirror::config::Settings;
use repo_mirror::github::Source;
use repo_mirror::item::ItemFilter;
use repo_mirror::notify;
use repo_mirror::sync::{self, SyncOptions};

/// Mirror the selected sources into the repository directory
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Mirror repositories starred by the configured user
    #[arg(short = 's', long)]
    pub starred_repos: bool,

    /// Mirror repositories of the authenticated user
    #[arg(short = 'r', long)]
    pub user_repos: bool,

    /// Mirror gists of the configured user
    #[arg(short = 'g', long)]
    pub user_gists: bool,

    /// Mirror gists starred by the authenticated user
    #[arg(short = 'f', long)]
    pub starred_gists: bool,

    /// Skip repositories of this size or larger, in MB
    #[arg(short = 'm', long, value_name = "MB")]
    pub max_size: Option<u64>,

    /// Only mirror repositories tagged with this topic
    #[arg(short = 't', long, value_name = "TOPIC")]
    pub topic: Option<String>,

    /// Number of parallel workers (overrides `workers` in the config file)
    #[arg(
        short = 'w',
        long,
        value_name = "N",
        value_parser = RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub workers: Option<usize>,

    /// Delete existing mirrors and clone them again
    #[arg(long)]
    pub redo: bool,
}

impl SyncArgs {
    /// Selected sources, in a fixed order.
    pub fn sources(&self) -> Vec<Source> {
        [
            (self.starred_repos, Source::StarredRepos),
            (self.user_repos, Source::UserRepos),
            (self.user_gists, Source::UserGists),
            (self.starred_gists, Source::StarredGists),
        ]
        .into_iter()
        .filter_map(|(selected, source)| selected.then_some(source))
        .collect()
    }

    fn options(&self) -> SyncOptions {
        SyncOptions {
            sources: self.sources(),
            filter: ItemFilter {
                topic: self.topic.clone(),
                max_size_kb: None,
            }
            .with_max_size_mb(self.max_size),
            workers: self.workers,
            redo: self.redo,
        }
    }
}

/// Execute the `sync` command.
pub fn execute(config: &Path, args: SyncArgs) -> Result<()> {
    let options = args.options();
    if options.sources.is_empty() {
        bail!(
            "No source selected. Pass at least one of --starred-repos, --user-repos, \
             --user-gists or --starred-gists"
        );
    }

    let settings = Settings::from_file(config)
        .with_context(|| format!("Failed to load config from {}", config.display()))?;
    let notifier = notify::from_settings(settings.webhook_url.as_deref())
        .context("Invalid webhook_url in [notify]")?;

    cancel::install_signal_handlers()?;
    let report = sync::run(&settings, &options, notifier.as_ref(), &cancel::stop_requested)?;

    println!("{} items mirrored", report.successes);
    if report.cancelled {
        warn!("run was stopped before all items were processed");
    }
    if report.has_failures() {
        bail!("{} items failed", report.failures.len());
    }
    Ok(())
}
