//! # Mirror Store
//!
//! This module provides the `MirrorStore`, which owns the on-disk layout of
//! the mirrors and reconciles one remote item at a time against it.
//!
//! ## Layout
//!
//! Mirrors live at `<root>/<owner>/<name>.git`. The owner segment is dropped
//! when owner directories are disabled or the item has no owner. Whether that
//! path exists is the only thing that decides between cloning and fetching.
//!
//! ## Reconciliation
//!
//! `create_or_update` runs these steps for one item:
//!
//! 1.  If the mirror is missing (or a redo was requested and it was removed),
//!     bare-clone it. A failed attempt removes whatever the clone left behind
//!     and is retried, up to `MAX_ATTEMPTS` in total.
//! 2.  For every remote, fetch all branch heads in one call. If that fails,
//!     fetch the local branches one at a time, each with its own retries. A
//!     branch deleted upstream is logged and skipped without using up an
//!     attempt.
//! 3.  Refresh the server-info files and record the owner in the mirror's
//!     config, whether or not every branch came through.
//!
//! ## Design
//!
//! Git access goes through the `GitOperations` trait. `DefaultGitOperations`
//! wraps the system `git` binary; tests substitute a scripted mock so the
//! retry and fallback behaviour can be exercised without a network.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};
use serde::Serialize;
use walkdir::WalkDir;

use crate::error::{BackupFailure, Operation};
use crate::git::{self, BranchName, GitError};
use crate::item::RemoteItem;
use crate::metadata::MetadataSink;

/// Attempts per clone and per branch fetch.
pub const MAX_ATTEMPTS: u32 = 3;

/// Config key holding the mirror's owner.
pub const OWNER_CONFIG_KEY: &str = "gitweb.owner";

/// Trait for git operations - allows mocking in tests
pub trait GitOperations: Send + Sync {
    /// Bare-clones `url` into `target_dir`.
    fn clone_bare(&self, url: &str, target_dir: &Path) -> Result<(), GitError>;

    /// Lists local branch names; names that are not UTF-8 come back as `Err`.
    fn list_local_branches(&self, repo_dir: &Path) -> Result<Vec<BranchName>, GitError>;

    fn list_remotes(&self, repo_dir: &Path) -> Result<Vec<String>, GitError>;

    fn fetch(&self, repo_dir: &Path, remote: &str, refspec: &str) -> Result<(), GitError>;

    fn update_server_info(&self, repo_dir: &Path) -> Result<(), GitError>;

    fn set_config(&self, repo_dir: &Path, key: &str, value: &str) -> Result<(), GitError>;
}

/// The default implementation of `GitOperations`, which uses the system's
/// `git` command.
pub struct DefaultGitOperations;

impl GitOperations for DefaultGitOperations {
    fn clone_bare(&self, url: &str, target_dir: &Path) -> Result<(), GitError> {
        git::clone_bare(url, target_dir)
    }

    fn list_local_branches(&self, repo_dir: &Path) -> Result<Vec<BranchName>, GitError> {
        git::list_local_branches(repo_dir)
    }

    fn list_remotes(&self, repo_dir: &Path) -> Result<Vec<String>, GitError> {
        git::list_remotes(repo_dir)
    }

    fn fetch(&self, repo_dir: &Path, remote: &str, refspec: &str) -> Result<(), GitError> {
        git::fetch(repo_dir, remote, refspec)
    }

    fn update_server_info(&self, repo_dir: &Path) -> Result<(), GitError> {
        git::update_server_info(repo_dir)
    }

    fn set_config(&self, repo_dir: &Path, key: &str, value: &str) -> Result<(), GitError> {
        git::set_config(repo_dir, key, value)
    }
}

/// A mirror found on disk by `MirrorStore::each_mirror`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MirrorEntry {
    pub path: PathBuf,
    pub owner: String,
    pub name: String,
}

/// Owns the mirror directory tree and reconciles items against it.
pub struct MirrorStore {
    root: PathBuf,
    owner_dirs: bool,
    redo: bool,
    git_ops: Box<dyn GitOperations>,
    metadata: Option<Box<dyn MetadataSink>>,
    log_target: String,
}

impl MirrorStore {
    /// Creates a store rooted at `root` using the system git, with owner
    /// directories enabled and no metadata sink.
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            owner_dirs: true,
            redo: false,
            git_ops: Box::new(DefaultGitOperations),
            metadata: None,
            log_target: "store".to_string(),
        }
    }

    /// Replaces the git implementation, e.g. with a mock.
    pub fn with_operations(mut self, git_ops: Box<dyn GitOperations>) -> Self {
        self.git_ops = git_ops;
        self
    }

    pub fn with_owner_dirs(mut self, owner_dirs: bool) -> Self {
        self.owner_dirs = owner_dirs;
        self
    }

    /// When set, existing mirrors are deleted and cloned again.
    pub fn with_redo(mut self, redo: bool) -> Self {
        self.redo = redo;
        self
    }

    pub fn with_metadata_sink(mut self, sink: Box<dyn MetadataSink>) -> Self {
        self.metadata = Some(sink);
        self
    }

    /// Log target used for everything this store (and the items it backs
    /// up) logs.
    pub fn with_log_target(mut self, target: impl Into<String>) -> Self {
        self.log_target = target.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn log_target(&self) -> &str {
        &self.log_target
    }

    fn owner_segment<'a>(&self, owner: Option<&'a str>) -> Option<&'a str> {
        owner.filter(|_| self.owner_dirs)
    }

    /// Maps an item to its mirror path, appending `.git` unless present.
    pub fn get_path(&self, name: &str, owner: Option<&str>) -> PathBuf {
        let dir_name = if name.ends_with(".git") {
            name.to_string()
        } else {
            format!("{}.git", name)
        };
        match self.owner_segment(owner) {
            Some(owner) => self.root.join(owner).join(dir_name),
            None => self.root.join(dir_name),
        }
    }

    /// Creates the directory that will hold the item's mirror.
    pub fn ensure_owner_dir(&self, name: &str, owner: Option<&str>) -> Result<(), BackupFailure> {
        let dir = match self.owner_segment(owner) {
            Some(owner) => self.root.join(owner),
            None => self.root.clone(),
        };
        if dir.is_dir() {
            return Ok(());
        }
        info!(target: self.log_target.as_str(), "creating directory {}", dir.display());
        fs::create_dir_all(&dir).map_err(|e| {
            BackupFailure::new(Operation::CreateOwnerDir, name, owner, e.to_string())
        })
    }

    /// Clones the mirror if it is missing, then brings every branch up to
    /// date.
    pub fn create_or_update(
        &self,
        name: &str,
        remote_url: &str,
        owner: Option<&str>,
    ) -> Result<(), BackupFailure> {
        let path = self.get_path(name, owner);

        if self.redo && path.exists() {
            info!(target: self.log_target.as_str(), "removing {} to clone it again", path.display());
            fs::remove_dir_all(&path).map_err(|e| {
                BackupFailure::new(Operation::Remove, name, owner, e.to_string())
            })?;
        }

        if !path.exists() {
            info!(target: self.log_target.as_str(), "creating local mirror {}", path.display());
            self.clone_with_retry(name, remote_url, owner, &path)?;
        }

        info!(target: self.log_target.as_str(), "checking all remote branches of {}", path.display());
        let reconciled = self.reconcile_branches(name, owner, &path);
        self.finish_mirror(owner, &path);
        reconciled
    }

    fn clone_with_retry(
        &self,
        name: &str,
        remote_url: &str,
        owner: Option<&str>,
        path: &Path,
    ) -> Result<(), BackupFailure> {
        let url = git::normalize_clone_url(remote_url);
        let mut last_error = String::new();

        for attempt in 1..=MAX_ATTEMPTS {
            match self.git_ops.clone_bare(&url, path) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(
                        target: self.log_target.as_str(),
                        "clone attempt {}/{} of {} failed: {}",
                        attempt,
                        MAX_ATTEMPTS,
                        url,
                        e
                    );
                    if path.exists() {
                        if let Err(rm) = fs::remove_dir_all(path) {
                            warn!(
                                target: self.log_target.as_str(),
                                "could not remove partial clone {}: {}",
                                path.display(),
                                rm
                            );
                        }
                    }
                    last_error = e.message;
                }
            }
        }

        Err(BackupFailure::new(Operation::Clone, name, owner, last_error).with_remote(&url))
    }

    fn reconcile_branches(
        &self,
        name: &str,
        owner: Option<&str>,
        path: &Path,
    ) -> Result<(), BackupFailure> {
        let inspect_failure =
            |e: GitError| BackupFailure::new(Operation::Inspect, name, owner, e.message);

        let branches: Vec<String> = self
            .git_ops
            .list_local_branches(path)
            .map_err(inspect_failure)?
            .into_iter()
            .filter_map(|branch| match branch {
                Ok(branch) => Some(branch),
                Err(raw) => {
                    warn!(
                        target: self.log_target.as_str(),
                        "ignoring branch with undecodable name {:?} in {}",
                        String::from_utf8_lossy(&raw),
                        path.display()
                    );
                    None
                }
            })
            .collect();
        let remotes = self.git_ops.list_remotes(path).map_err(inspect_failure)?;

        for remote in &remotes {
            match self.git_ops.fetch(path, remote, git::ALL_HEADS_REFSPEC) {
                Ok(()) => {
                    debug!(target: self.log_target.as_str(), "fetched all heads from {}", remote);
                    continue;
                }
                Err(e) => {
                    info!(
                        target: self.log_target.as_str(),
                        "bulk fetch from {} failed, fetching branches one by one: {}",
                        remote,
                        e
                    );
                }
            }

            for branch in &branches {
                self.fetch_branch(name, owner, path, remote, branch)?;
            }
        }

        Ok(())
    }

    fn fetch_branch(
        &self,
        name: &str,
        owner: Option<&str>,
        path: &Path,
        remote: &str,
        branch: &str,
    ) -> Result<(), BackupFailure> {
        let refspec = format!("refs/heads/{0}:refs/heads/{0}", branch);
        let mut failures = 0;

        loop {
            debug!(target: self.log_target.as_str(), "fetching {} from {}", branch, remote);
            match self.git_ops.fetch(path, remote, &refspec) {
                Ok(()) => return Ok(()),
                Err(e) if e.is_dead_ref() => {
                    debug!(
                        target: self.log_target.as_str(),
                        "branch {} no longer exists on {}: {}",
                        branch,
                        remote,
                        e.message
                    );
                    return Ok(());
                }
                Err(e) => {
                    failures += 1;
                    warn!(
                        target: self.log_target.as_str(),
                        "fetch attempt {}/{} of {} from {} failed: {}",
                        failures,
                        MAX_ATTEMPTS,
                        branch,
                        remote,
                        e
                    );
                    if failures >= MAX_ATTEMPTS {
                        return Err(BackupFailure::new(Operation::Fetch, name, owner, e.message)
                            .with_remote(remote)
                            .with_branch(branch));
                    }
                }
            }
        }
    }

    /// Server-info and owner annotation are best effort; a failure here does
    /// not fail the item.
    fn finish_mirror(&self, owner: Option<&str>, path: &Path) {
        if let Err(e) = self.git_ops.update_server_info(path) {
            warn!(target: self.log_target.as_str(), "update-server-info failed for {}: {}", path.display(), e);
        }
        if let Some(owner) = owner {
            if let Err(e) = self.git_ops.set_config(path, OWNER_CONFIG_KEY, owner) {
                warn!(target: self.log_target.as_str(), "could not record owner of {}: {}", path.display(), e);
            }
        }
    }

    /// Appends a metadata row for `item`. Never fails; errors are logged.
    pub fn update_metadata(&self, item: &RemoteItem) {
        let Some(sink) = &self.metadata else {
            return;
        };
        if let Err(e) = sink.insert(&item.metadata_row()) {
            error!(
                target: self.log_target.as_str(),
                "could not record metadata for {}: {}",
                item.display_name(),
                e
            );
        }
    }

    /// Walks `<root>/<owner>/<name>.git`, lazily and read-only.
    ///
    /// Anything else at those two levels is skipped with a warning. Each call
    /// walks the filesystem again.
    pub fn each_mirror(&self) -> impl Iterator<Item = MirrorEntry> + '_ {
        WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(2)
            .sort_by_file_name()
            .into_iter()
            // Mirrors stored without an owner directory are not descended into.
            .filter_entry(move |entry| {
                let top_level_mirror = entry.depth() == 1
                    && entry.file_type().is_dir()
                    && entry.file_name().to_string_lossy().ends_with(".git");
                if top_level_mirror {
                    debug!(target: self.log_target.as_str(), "not listing ownerless {}", entry.path().display());
                }
                !top_level_mirror
            })
            .filter_map(move |entry| {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!(target: self.log_target.as_str(), "cannot read mirror tree: {}", e);
                        return None;
                    }
                };
                let is_dir = entry.file_type().is_dir();

                if entry.depth() == 1 {
                    if !is_dir {
                        warn!(target: self.log_target.as_str(), "skipping non-directory {}", entry.path().display());
                    }
                    return None;
                }

                let file_name = entry.file_name().to_string_lossy();
                let name = match file_name.strip_suffix(".git") {
                    Some(name) if is_dir => name.to_string(),
                    _ => {
                        warn!(target: self.log_target.as_str(), "skipping non-mirror {}", entry.path().display());
                        return None;
                    }
                };
                let owner = entry
                    .path()
                    .parent()
                    .and_then(Path::file_name)?
                    .to_string_lossy()
                    .into_owned();

                Some(MirrorEntry {
                    path: entry.path().to_path_buf(),
                    owner,
                    name,
                })
            })
    }
}
