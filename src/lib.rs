//! # Repo Mirror Library
//!
//! Keeps local bare git mirrors of GitHub repositories and gists up to date.
//! The `repo-mirror` binary is a thin wrapper around this crate.
//!
//! ## Quick Example
//!
//! ```
//! use repo_mirror::partition::WorkAssignment;
//!
//! // Worker 1 of 2 takes every odd item of the listing.
//! let assignment = WorkAssignment::new(2, 1).unwrap();
//! let mine: Vec<usize> = assignment.partition(0..5).collect();
//! assert_eq!(mine, vec![1, 3]);
//! ```
//!
//! ## Core Concepts
//!
//! - **Items (`item`)**: typed repository and gist records from the API. A
//!   `RemoteItem` applies the topic and size filters and mirrors itself.
//! - **Store (`store`, `git`)**: maps items to `<root>/<owner>/<name>.git`,
//!   clones or fetches with retries, tolerates branches deleted upstream and
//!   refreshes the dumb-HTTP server info.
//! - **Inventory (`lister`, `github`)**: lazy, cursor-paged listings.
//! - **Parallelism (`partition`, `cancel`, `worker`, `coordinator`,
//!   `report`)**: N workers each take a residue class of the listing; the
//!   coordinator forwards stop requests and folds worker results into one
//!   report.
//! - **Outputs (`metadata`, `notify`)**: an optional SQLite metadata table
//!   and the end-of-run notification.
//!
//! ## Execution Flow
//!
//! `sync::run` drives a run:
//!
//! 1.  For each selected source, start one worker per assignment.
//! 2.  Each worker pages through the full listing, keeps its share and backs
//!     every item up into its own `MirrorStore`.
//! 3.  Workers send their failures and success count to the coordinator.
//! 4.  The aggregated report goes to the notifier once at the end.

pub mod cancel;
pub mod config;
pub mod coordinator;
pub mod defaults;
pub mod error;
pub mod git;
pub mod github;
pub mod item;
pub mod lister;
pub mod metadata;
pub mod notify;
pub mod partition;
pub mod report;
pub mod store;
pub mod sync;
pub mod worker;

#[cfg(test)]
mod partition_proptest;
