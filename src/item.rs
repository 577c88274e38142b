//! # Remote Items
//!
//! Typed views of the records the GitHub API returns for repositories and
//! gists, and the `RemoteItem` wrapper that decides whether an item should be
//! mirrored and hands it to the `MirrorStore`.
//!
//! Fields the mirroring logic depends on are named and typed. Everything else
//! in the API response is kept in an `extra` map so nothing is silently lost
//! when a record is re-serialized.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::BackupFailure;
use crate::metadata::MetadataRow;
use crate::store::MirrorStore;

/// The account that owns a repository or gist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub login: String,
}

/// A repository as listed by the GitHub API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoRecord {
    pub id: u64,
    pub name: String,
    pub owner: Owner,
    pub git_url: String,
    /// Repository size in KB, as reported by the API.
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub topics: Option<Vec<String>>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RepoRecord {
    pub fn has_topic(&self, topic: &str) -> bool {
        self.topics
            .as_ref()
            .is_some_and(|topics| topics.iter().any(|t| t == topic))
    }
}

/// A gist as listed by the GitHub API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GistRecord {
    pub id: String,
    /// Absent for anonymous gists.
    #[serde(default)]
    pub owner: Option<Owner>,
    pub git_pull_url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A record produced by a paged listing, before filters are attached.
#[derive(Debug, Clone)]
pub enum RemoteRecord {
    Repo(RepoRecord),
    Gist(GistRecord),
}

/// Which repositories to keep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFilter {
    /// Only repositories carrying this topic are mirrored.
    pub topic: Option<String>,
    /// Repositories at or above this size (KB) are skipped.
    pub max_size_kb: Option<u64>,
}

impl ItemFilter {
    /// Builds a filter from a size limit given in MB, as on the command line.
    pub fn with_max_size_mb(mut self, max_size_mb: Option<u64>) -> Self {
        self.max_size_kb = max_size_mb.map(|mb| mb.saturating_mul(1024));
        self
    }
}

/// One item to mirror.
///
/// Repositories carry the filter they are checked against; gists are always
/// mirrored.
#[derive(Debug, Clone)]
pub enum RemoteItem {
    Repo { record: RepoRecord, filter: ItemFilter },
    Gist(GistRecord),
}

impl RemoteItem {
    pub fn from_record(record: RemoteRecord, filter: &ItemFilter) -> Self {
        match record {
            RemoteRecord::Repo(record) => RemoteItem::Repo {
                record,
                filter: filter.clone(),
            },
            RemoteRecord::Gist(record) => RemoteItem::Gist(record),
        }
    }

    pub fn owner(&self) -> Option<&str> {
        match self {
            RemoteItem::Repo { record, .. } => Some(&record.owner.login),
            RemoteItem::Gist(gist) => gist.owner.as_ref().map(|o| o.login.as_str()),
        }
    }

    /// Repository name, or gist id.
    pub fn name(&self) -> &str {
        match self {
            RemoteItem::Repo { record, .. } => &record.name,
            RemoteItem::Gist(gist) => &gist.id,
        }
    }

    pub fn clone_url(&self) -> &str {
        match self {
            RemoteItem::Repo { record, .. } => &record.git_url,
            RemoteItem::Gist(gist) => &gist.git_pull_url,
        }
    }

    pub fn remote_id(&self) -> String {
        match self {
            RemoteItem::Repo { record, .. } => record.id.to_string(),
            RemoteItem::Gist(gist) => gist.id.clone(),
        }
    }

    pub fn topics(&self) -> &[String] {
        match self {
            RemoteItem::Repo { record, .. } => record.topics.as_deref().unwrap_or_default(),
            RemoteItem::Gist(_) => &[],
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            RemoteItem::Repo { record, .. } => record.description.as_deref(),
            RemoteItem::Gist(gist) => gist.description.as_deref(),
        }
    }

    /// `owner/name`, or just `name` when there is no owner.
    pub fn display_name(&self) -> String {
        match self.owner() {
            Some(owner) => format!("{}/{}", owner, self.name()),
            None => self.name().to_string(),
        }
    }

    pub fn metadata_row(&self) -> MetadataRow {
        MetadataRow {
            owner: self.owner().map(str::to_string),
            name: self.name().to_string(),
            remote_id: self.remote_id(),
            topics: serde_json::to_string(self.topics()).unwrap_or_else(|_| "[]".to_string()),
            description: self.description().map(str::to_string),
        }
    }

    /// `false` when a filter excludes the item.
    fn passes_filter(&self, log_target: &str) -> bool {
        let RemoteItem::Repo { record, filter } = self else {
            return true;
        };

        if let Some(topic) = &filter.topic {
            if !record.has_topic(topic) {
                debug!(target: log_target, "{} lacks topic {}", self.display_name(), topic);
                return false;
            }
        }

        info!(target: log_target, "{} ({})", self.display_name(), record.id);
        info!(target: log_target, "repo size: {} KB", record.size);

        if let Some(max_size) = filter.max_size_kb {
            if record.size >= max_size {
                warn!(
                    target: log_target,
                    "skipping repo {} larger than {} KB ({} KB)",
                    self.display_name(),
                    max_size,
                    record.size
                );
                return false;
            }
        }

        true
    }

    /// Mirror this item into `store`.
    ///
    /// Returns `Ok(true)` when the mirror was created or updated and
    /// `Ok(false)` when a filter skipped the item.
    pub fn backup(&self, store: &MirrorStore) -> Result<bool, BackupFailure> {
        let log_target = store.log_target();
        if !self.passes_filter(log_target) {
            return Ok(false);
        }
        if let RemoteItem::Gist(_) = self {
            info!(target: log_target, "{}", self.display_name());
        }

        store.ensure_owner_dir(self.name(), self.owner())?;
        store.create_or_update(self.name(), self.clone_url(), self.owner())?;
        store.update_metadata(self);
        Ok(true)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::store::tests::{MockGitOperations, RecordingSink};
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    pub(crate) fn repo(owner: &str, name: &str, size: u64, topics: Option<&[&str]>) -> RepoRecord {
        RepoRecord {
            id: 42,
            name: name.to_string(),
            owner: Owner {
                login: owner.to_string(),
            },
            git_url: format!("git://github.com/{}/{}.git", owner, name),
            size,
            topics: topics.map(|t| t.iter().map(|s| s.to_string()).collect()),
            description: Some("a test repo".to_string()),
            extra: serde_json::Map::new(),
        }
    }

    fn filter(topic: Option<&str>, max_size_kb: Option<u64>) -> ItemFilter {
        ItemFilter {
            topic: topic.map(str::to_string),
            max_size_kb,
        }
    }

    fn store_in(root: &Path, git_ops: MockGitOperations) -> MirrorStore {
        MirrorStore::new(root.to_path_buf()).with_operations(Box::new(git_ops))
    }

    /// A store whose metadata rows land in the returned vector.
    fn recording_store(
        root: &Path,
        git_ops: MockGitOperations,
    ) -> (MirrorStore, Arc<Mutex<Vec<MetadataRow>>>) {
        let rows = Arc::new(Mutex::new(Vec::new()));
        let store = store_in(root, git_ops).with_metadata_sink(Box::new(RecordingSink {
            rows: Arc::clone(&rows),
        }));
        (store, rows)
    }

    fn is_empty_dir(path: &Path) -> bool {
        std::fs::read_dir(path).unwrap().next().is_none()
    }

    #[test]
    fn test_backup_matching_topic_and_size() {
        let temp = TempDir::new().unwrap();
        let git_ops = MockGitOperations::new();
        let clones = git_ops.clone_calls.clone();
        let (store, rows) = recording_store(temp.path(), git_ops);

        let item = RemoteItem::Repo {
            record: repo("alice", "repo1", 500, Some(&["x"])),
            filter: filter(Some("x"), Some(1000)),
        };

        assert!(item.backup(&store).unwrap());
        assert!(temp.path().join("alice/repo1.git").is_dir());
        assert_eq!(rows.lock().unwrap().len(), 1);
        let clones = clones.lock().unwrap();
        assert_eq!(clones.len(), 1);
        // git:// is rewritten before cloning
        assert_eq!(clones[0].0, "https://github.com/alice/repo1.git");
    }

    #[test]
    fn test_backup_topic_mismatch_touches_nothing() {
        let temp = TempDir::new().unwrap();
        let git_ops = MockGitOperations::new();
        let clones = git_ops.clone_calls.clone();
        let (store, rows) = recording_store(temp.path(), git_ops);

        let item = RemoteItem::Repo {
            record: repo("alice", "repo1", 500, Some(&["x"])),
            filter: filter(Some("y"), Some(1000)),
        };

        assert!(!item.backup(&store).unwrap());
        assert!(is_empty_dir(temp.path()));
        assert!(rows.lock().unwrap().is_empty());
        assert!(clones.lock().unwrap().is_empty());
    }

    #[test]
    fn test_backup_topic_filter_with_no_topics() {
        let temp = TempDir::new().unwrap();
        let (store, rows) = recording_store(temp.path(), MockGitOperations::new());

        let item = RemoteItem::Repo {
            record: repo("alice", "repo1", 500, None),
            filter: filter(Some("x"), None),
        };

        assert!(!item.backup(&store).unwrap());
        assert!(is_empty_dir(temp.path()));
        assert!(rows.lock().unwrap().is_empty());
    }

    #[test]
    fn test_backup_oversize_is_skipped_with_warning() {
        testing_logger::setup();
        let temp = TempDir::new().unwrap();
        let (store, rows) = recording_store(temp.path(), MockGitOperations::new());

        let item = RemoteItem::Repo {
            record: repo("alice", "repo1", 2000, None),
            filter: filter(None, Some(1000)),
        };

        assert!(!item.backup(&store).unwrap());
        assert!(is_empty_dir(temp.path()));
        assert!(rows.lock().unwrap().is_empty());

        testing_logger::validate(|captured_logs| {
            let warnings: Vec<_> = captured_logs
                .iter()
                .filter(|log| log.level == log::Level::Warn)
                .collect();
            assert_eq!(warnings.len(), 1);
            assert!(warnings[0].body.contains("skipping repo alice/repo1"));
        });
    }

    #[test]
    fn test_backup_size_equal_to_limit_is_skipped() {
        let temp = TempDir::new().unwrap();
        let (store, rows) = recording_store(temp.path(), MockGitOperations::new());

        let item = RemoteItem::Repo {
            record: repo("alice", "repo1", 1000, None),
            filter: filter(None, Some(1000)),
        };

        assert!(!item.backup(&store).unwrap());
        assert!(is_empty_dir(temp.path()));
        assert!(rows.lock().unwrap().is_empty());
    }

    #[test]
    fn test_backup_gist_ignores_filters_and_uses_pull_url() {
        let temp = TempDir::new().unwrap();
        let git_ops = MockGitOperations::new();
        let clones = git_ops.clone_calls.clone();
        let store = store_in(temp.path(), git_ops);

        let gist = GistRecord {
            id: "abc123".to_string(),
            owner: Some(Owner {
                login: "alice".to_string(),
            }),
            git_pull_url: "https://gist.github.com/abc123.git".to_string(),
            description: None,
            extra: serde_json::Map::new(),
        };
        let item = RemoteItem::from_record(RemoteRecord::Gist(gist), &filter(Some("y"), Some(1)));

        assert!(item.backup(&store).unwrap());
        assert!(temp.path().join("alice/abc123.git").is_dir());
        assert_eq!(
            clones.lock().unwrap()[0].0,
            "https://gist.github.com/abc123.git"
        );
    }

    #[test]
    fn test_backup_anonymous_gist_lands_at_root() {
        let temp = TempDir::new().unwrap();
        let store = store_in(temp.path(), MockGitOperations::new());

        let item = RemoteItem::Gist(GistRecord {
            id: "feedbeef".to_string(),
            owner: None,
            git_pull_url: "https://gist.github.com/feedbeef.git".to_string(),
            description: None,
            extra: serde_json::Map::new(),
        });

        assert!(item.backup(&store).unwrap());
        assert!(temp.path().join("feedbeef.git").is_dir());
    }

    #[test]
    fn test_backup_clone_failure_propagates() {
        let temp = TempDir::new().unwrap();
        let store = store_in(temp.path(), MockGitOperations::failing_clone("no route to host"));

        let item = RemoteItem::Repo {
            record: repo("alice", "repo1", 10, None),
            filter: ItemFilter::default(),
        };

        let failure = item.backup(&store).unwrap_err();
        assert_eq!(failure.op, crate::error::Operation::Clone);
        assert!(!temp.path().join("alice/repo1.git").exists());
    }

    #[test]
    fn test_metadata_row() {
        let item = RemoteItem::Repo {
            record: repo("alice", "repo1", 10, Some(&["x", "y"])),
            filter: ItemFilter::default(),
        };
        let row = item.metadata_row();
        assert_eq!(row.owner.as_deref(), Some("alice"));
        assert_eq!(row.name, "repo1");
        assert_eq!(row.remote_id, "42");
        assert_eq!(row.topics, r#"["x","y"]"#);
        assert_eq!(row.description.as_deref(), Some("a test repo"));
    }

    #[test]
    fn test_filter_max_size_mb_conversion() {
        let filter = ItemFilter::default().with_max_size_mb(Some(2));
        assert_eq!(filter.max_size_kb, Some(2048));
        assert_eq!(ItemFilter::default().with_max_size_mb(None).max_size_kb, None);
    }

    #[test]
    fn test_repo_record_keeps_unknown_fields() {
        let json = r#"{
            "id": 7,
            "name": "repo1",
            "owner": {"login": "alice", "type": "User"},
            "git_url": "git://github.com/alice/repo1.git",
            "size": 12,
            "topics": ["x"],
            "description": null,
            "stargazers_count": 3
        }"#;
        let record: RepoRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.owner.login, "alice");
        assert!(record.has_topic("x"));
        assert_eq!(record.description, None);
        assert_eq!(record.extra.get("stargazers_count"), Some(&serde_json::json!(3)));
    }

    #[test]
    fn test_gist_record_without_owner() {
        let json = r#"{"id": "abc", "git_pull_url": "https://gist.github.com/abc.git"}"#;
        let record: GistRecord = serde_json::from_str(json).unwrap();
        assert!(record.owner.is_none());
    }
}
