//! Durable record of mirrored items.
//!
//! Every successful backup appends one row. Rows are never updated or
//! deleted here, and duplicates are not filtered: a repository mirrored on
//! ten runs has ten rows.

use std::path::Path;
use std::time::Duration;

use rusqlite::{params, Connection};

use crate::error::Result;

/// One mirrored item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRow {
    pub owner: Option<String>,
    pub name: String,
    pub remote_id: String,
    /// JSON array of topic labels.
    pub topics: String,
    pub description: Option<String>,
}

/// Somewhere to append metadata rows.
pub trait MetadataSink {
    fn insert(&self, row: &MetadataRow) -> Result<()>;
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS mirrored_items (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    owner       TEXT,
    name        TEXT NOT NULL,
    remote_id   TEXT NOT NULL,
    topics      TEXT NOT NULL,
    description TEXT,
    recorded_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);";

/// SQLite-backed sink. Each worker opens its own.
pub struct SqliteMetadataSink {
    conn: Connection,
}

impl SqliteMetadataSink {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        // Workers write to the same file concurrently.
        conn.busy_timeout(Duration::from_secs(30))?;
        conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
        Self::init(conn)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Rows in insertion order.
    pub fn rows(&self) -> Result<Vec<MetadataRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT owner, name, remote_id, topics, description
             FROM mirrored_items ORDER BY id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(MetadataRow {
                    owner: row.get(0)?,
                    name: row.get(1)?,
                    remote_id: row.get(2)?,
                    topics: row.get(3)?,
                    description: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

impl MetadataSink for SqliteMetadataSink {
    fn insert(&self, row: &MetadataRow) -> Result<()> {
        self.conn.execute(
            "INSERT INTO mirrored_items (owner, name, remote_id, topics, description)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![row.owner, row.name, row.remote_id, row.topics, row.description],
        )?;
        Ok(())
    }
}
