//! The seen-id store: a durable, strictly growing set of row fingerprints.
//!
//! The driver asks [`SeenStore::contains`] before building a row and calls
//! [`SeenStore::record_all`] after the batch has reached the CSV. Ids are never
//! updated or removed; recording a known id is a no-op.
//!
//! [`SqliteSeenStore`] is the production backend (one file shared by every
//! feed of a pipeline). Tests use an in-memory set.

use crate::error::StoreError;
use rusqlite::{Connection, OptionalExtension, params};
use std::fs;
use std::path::Path;
use tracing::{debug, info, instrument};

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS seen_feed_ids (
    id TEXT PRIMARY KEY,
    first_seen_at TEXT NOT NULL
);
"#;

/// Key-set of fingerprints that have already been written to the CSV.
pub trait SeenStore {
    /// `true` iff `id` was previously recorded.
    fn contains(&self, id: &str) -> Result<bool, StoreError>;

    /// Insert `id`; does nothing when it is already present.
    fn record(&mut self, id: &str, first_seen_at: &str) -> Result<(), StoreError>;

    /// Record a batch. Backends that support transactions make this atomic.
    fn record_all(&mut self, ids: &[String], first_seen_at: &str) -> Result<(), StoreError> {
        for id in ids {
            self.record(id, first_seen_at)?;
        }
        Ok(())
    }
}

/// SQLite-backed store with a single `seen_feed_ids` table.
pub struct SqliteSeenStore {
    conn: Connection,
}

impl SqliteSeenStore {
    /// Open (or create) the database file, creating its parent directory and
    /// the table when missing.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;

        let store = Self { conn };
        info!(known_ids = store.count()?, "Opened seen-id store");
        Ok(store)
    }

    /// Number of recorded ids.
    pub fn count(&self) -> Result<u64, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM seen_feed_ids", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

#[cfg(test)]
impl SqliteSeenStore {
    /// The `first_seen_at` recorded for `id`, if any.
    pub fn first_seen_at(&self, id: &str) -> Result<Option<String>, StoreError> {
        let at = self
            .conn
            .query_row(
                "SELECT first_seen_at FROM seen_feed_ids WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(at)
    }
}

impl SeenStore for SqliteSeenStore {
    fn contains(&self, id: &str) -> Result<bool, StoreError> {
        let hit = self
            .conn
            .query_row(
                "SELECT 1 FROM seen_feed_ids WHERE id = ?1",
                params![id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(hit.is_some())
    }

    fn record(&mut self, id: &str, first_seen_at: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR IGNORE INTO seen_feed_ids (id, first_seen_at) VALUES (?1, ?2)",
            params![id, first_seen_at],
        )?;
        Ok(())
    }

    fn record_all(&mut self, ids: &[String], first_seen_at: &str) -> Result<(), StoreError> {
        if ids.is_empty() {
            return Ok(());
        }
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR IGNORE INTO seen_feed_ids (id, first_seen_at) VALUES (?1, ?2)",
            )?;
            for id in ids {
                stmt.execute(params![id, first_seen_at])?;
            }
        }
        tx.commit()?;
        debug!(count = ids.len(), "Recorded seen ids");
        Ok(())
    }
}
