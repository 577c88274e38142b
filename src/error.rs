//! # Error Handling
//!
//! This module defines the centralized error type for `repo-mirror`. It uses
//! the `thiserror` library to create an `Error` enum covering every failure
//! mode the library anticipates, each variant carrying enough context to be
//! reported on its own.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum. Variants cover configuration loading, the
//!   remote inventory API, the metadata database and worker pool setup.
//!   Failed git commands surface as `BackupFailure`s instead.
//!
//! - **`BackupFailure`**: The failure of a single item after its retries
//!   were exhausted. It names the failed operation and carries the arguments
//!   of that operation (owner, name, remote, branch) so the end-of-run report
//!   can say exactly what went wrong.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.
//!
//! A `BackupFailure` is caught at the per-item boundary of a worker and never
//! becomes an `Error`; every `Error` is fatal for the worker that raised it.

use std::fmt;

use thiserror::Error;

/// Main error type for repo-mirror operations
#[derive(Error, Debug)]
pub enum Error {
    /// The configuration file is missing, unreadable, or lacks a required key.
    #[error("Configuration error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    Config {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// The remote inventory API could not be reached.
    #[error("Network operation error: {url} - {message}")]
    Network { url: String, message: String },

    /// The remote inventory API answered with a non-success status.
    #[error("HTTP {status} from {url}: {message}")]
    Http {
        url: String,
        status: u16,
        message: String,
    },

    /// The metadata database rejected an operation.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The worker pool could not be started.
    #[error("Worker pool error: {message}")]
    Worker { message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A URL parsing error, wrapped from `url::ParseError`.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Network {
            url: err
                .url()
                .map(|u| u.to_string())
                .unwrap_or_else(|| "<unknown>".to_string()),
            message: err.to_string(),
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// The operation that failed for an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Creating the owner directory
    CreateOwnerDir,
    /// Removing a mirror ahead of a redo
    Remove,
    /// Initial bare clone
    Clone,
    /// Per-branch fetch
    Fetch,
    /// Enumerating local branches or remotes
    Inspect,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::CreateOwnerDir => "mkdir",
            Operation::Remove => "remove",
            Operation::Clone => "clone",
            Operation::Fetch => "fetch",
            Operation::Inspect => "inspect",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An item that failed to back up.
///
/// The fields mirror the argument set of the operation that failed: `remote`
/// is the clone URL for clones and the remote name for fetches, `branch` is
/// only set for per-branch fetches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupFailure {
    pub op: Operation,
    pub message: String,
    pub owner: Option<String>,
    pub name: String,
    pub remote: Option<String>,
    pub branch: Option<String>,
}

impl BackupFailure {
    pub fn new(op: Operation, name: &str, owner: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            op,
            message: message.into(),
            owner: owner.map(str::to_string),
            name: name.to_string(),
            remote: None,
            branch: None,
        }
    }

    pub fn with_remote(mut self, remote: &str) -> Self {
        self.remote = Some(remote.to_string());
        self
    }

    pub fn with_branch(mut self, branch: &str) -> Self {
        self.branch = Some(branch.to_string());
        self
    }

    /// `owner/name`, or just `name` for items stored without an owner.
    pub fn item(&self) -> String {
        match &self.owner {
            Some(owner) => format!("{}/{}", owner, self.name),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for BackupFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed for {}", self.op, self.item())?;
        if let Some(remote) = &self.remote {
            write!(f, " (remote: {})", remote)?;
        }
        if let Some(branch) = &self.branch {
            write!(f, " (branch: {})", branch)?;
        }
        write!(f, ": {}", self.message)
    }
}

impl std::error::Error for BackupFailure {}
