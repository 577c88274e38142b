//! One mirroring run: every selected source, every worker, one report.

use std::fs;

use log::{info, warn};

use crate::config::Settings;
use crate::coordinator::Coordinator;
use crate::error::{Error, Result};
use crate::github::{GitHubClient, GitHubLister, Source};
use crate::item::{ItemFilter, RemoteRecord};
use crate::lister::PagedLister;
use crate::metadata::SqliteMetadataSink;
use crate::notify::{self, Notifier};
use crate::report::{RunReport, WorkerOutcome};
use crate::store::MirrorStore;
use crate::worker::run_worker;

/// What to mirror in this run.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    pub sources: Vec<Source>,
    pub filter: ItemFilter,
    /// Overrides `options.workers` from the config file.
    pub workers: Option<usize>,
    /// Delete existing mirrors and clone them again.
    pub redo: bool,
}

/// Mirror every selected source, then send the report to `notifier`.
pub fn run(
    settings: &Settings,
    options: &SyncOptions,
    notifier: &dyn Notifier,
    stop_requested: &dyn Fn() -> bool,
) -> Result<RunReport> {
    if options.sources.is_empty() {
        return Err(Error::Config {
            message: "no source selected".to_string(),
            hint: Some(
                "Pass at least one of --starred-repos, --user-repos, --user-gists, --starred-gists"
                    .to_string(),
            ),
        });
    }

    fs::create_dir_all(&settings.repo_dir)?;
    let client = GitHubClient::new(&settings.api_url, &settings.username, &settings.token)?;
    let workers = options.workers.unwrap_or(settings.workers);

    let report = mirror_sources(
        &options.sources,
        workers,
        &options.filter,
        |source| GitHubLister::new(&client, source),
        |step| build_store(settings, options.redo, step),
        stop_requested,
    )?;

    info!(
        target: "coordinator",
        "{} items mirrored, {} errors",
        report.successes,
        report.failures.len()
    );
    notify::deliver(notifier, &report);
    Ok(report)
}

/// A worker's store, with its own database connection if one is configured.
fn build_store(settings: &Settings, redo: bool, step: usize) -> Result<MirrorStore> {
    let mut store = MirrorStore::new(settings.repo_dir.clone())
        .with_owner_dirs(settings.owner_dirs)
        .with_redo(redo)
        .with_log_target(format!("worker-{}", step));
    if let Some(path) = &settings.database {
        store = store.with_metadata_sink(Box::new(SqliteMetadataSink::open(path)?));
    }
    Ok(store)
}

/// Run the worker set over each source in turn.
///
/// Every worker builds its own lister and store; only the factories are
/// shared. A stop request ends the current source and skips the rest.
pub(crate) fn mirror_sources<M, L, S>(
    sources: &[Source],
    workers: usize,
    filter: &ItemFilter,
    make_lister: M,
    make_store: S,
    stop_requested: &dyn Fn() -> bool,
) -> Result<RunReport>
where
    M: Fn(Source) -> L + Sync,
    L: PagedLister<Record = RemoteRecord>,
    S: Fn(usize) -> Result<MirrorStore> + Sync,
{
    let coordinator = Coordinator::new(workers)?;
    let mut total = RunReport::default();

    for &source in sources {
        if total.cancelled || stop_requested() {
            warn!(target: "coordinator", "skipping {} after stop request", source.label());
            total.cancelled = true;
            continue;
        }
        info!(target: "coordinator", "mirroring {}", source.label());

        let report = coordinator.run(
            |assignment, watcher| {
                let step = assignment.step();
                let store = match make_store(step) {
                    Ok(store) => store,
                    Err(e) => return WorkerOutcome::failed(format!("worker {} could not start: {}", step, e)),
                };
                let lister = make_lister(source);
                run_worker(lister.items(), assignment, &store, filter, watcher)
            },
            stop_requested,
        )?;
        total.absorb(report);
    }

    Ok(total)
}
