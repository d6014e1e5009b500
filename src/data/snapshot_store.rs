//! Snapshot store: one snapshot per route, last write wins

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use super::database::Database;
use super::error::StorageError;
use super::models::{Snapshot, SnapshotSummary, StyleRecord};

/// Route-keyed snapshot persistence
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Fetch the snapshot for `route`, if any
    async fn get(&self, route: &str) -> Result<Option<Snapshot>, StorageError>;

    /// Store `snapshot`, replacing any existing snapshot for its route
    async fn put(&self, snapshot: &Snapshot) -> Result<(), StorageError>;

    /// Remove the snapshot for `route`. Returns whether one existed.
    async fn delete(&self, route: &str) -> Result<bool, StorageError>;

    /// All stored snapshots, newest first
    async fn list(&self) -> Result<Vec<SnapshotSummary>, StorageError>;

    /// Remove snapshots older than `max_age` at `now`. Returns how many were removed.
    async fn prune_expired(
        &self,
        max_age: Duration,
        now: DateTime<Utc>,
    ) -> Result<usize, StorageError>;

    /// Remove every snapshot. Returns how many were removed.
    async fn clear(&self) -> Result<usize, StorageError>;
}

/// Opens short-lived store handles.
///
/// Callers drop the handle as soon as the operation that needed it finishes.
#[async_trait]
pub trait StoreOpener: Send + Sync {
    async fn open(&self) -> Result<Box<dyn SnapshotStore>, StorageError>;
}

/// SQLite-backed snapshot store
#[derive(Clone, Debug)]
pub struct SqliteSnapshotStore {
    db: Database,
}

impl SqliteSnapshotStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Run `f` against the connection on the blocking pool
    async fn blocking<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || db.with_connection(f))
            .await
            .map_err(|e| StorageError::Unknown(format!("Storage task failed: {}", e)))?
    }

    fn row_to_snapshot(row: &rusqlite::Row) -> Result<Snapshot, StorageError> {
        let route: String = row.get(0)?;
        let body: String = row.get(1)?;
        let timestamp_us: i64 = row.get(2)?;
        let styles_raw: String = row.get(3)?;

        let timestamp = DateTime::from_timestamp_micros(timestamp_us).ok_or_else(|| {
            StorageError::Corrupted(format!("Invalid timestamp {} for {}", timestamp_us, route))
        })?;
        let styles: Vec<StyleRecord> = serde_json::from_str(&styles_raw)?;

        Ok(Snapshot {
            route,
            body,
            timestamp,
            styles,
        })
    }
}

#[async_trait]
impl SnapshotStore for SqliteSnapshotStore {
    async fn get(&self, route: &str) -> Result<Option<Snapshot>, StorageError> {
        let route = route.to_string();
        self.blocking(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT route, body, timestamp_us, styles FROM snapshots WHERE route = ?1",
            )?;
            let mut rows = stmt.query(params![route])?;
            match rows.next()? {
                Some(row) => Ok(Some(Self::row_to_snapshot(row)?)),
                None => Ok(None),
            }
        })
        .await
    }

    async fn put(&self, snapshot: &Snapshot) -> Result<(), StorageError> {
        let snapshot = snapshot.clone();
        let styles = serde_json::to_string(&snapshot.styles)?;
        let hash = snapshot.content_hash();
        self.blocking(move |conn| {
            let existing: Option<String> = conn
                .query_row(
                    "SELECT content_hash FROM snapshots WHERE route = ?1",
                    params![snapshot.route],
                    |row| row.get(0),
                )
                .optional()?;

            if existing.as_deref() == Some(hash.as_str()) {
                // Unchanged content; only refresh the capture time
                conn.execute(
                    "UPDATE snapshots SET timestamp_us = ?2 WHERE route = ?1",
                    params![snapshot.route, snapshot.timestamp.timestamp_micros()],
                )?;
                return Ok(());
            }

            conn.execute(
                "INSERT INTO snapshots (route, body, timestamp_us, styles, content_hash)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(route) DO UPDATE SET
                    body = excluded.body,
                    timestamp_us = excluded.timestamp_us,
                    styles = excluded.styles,
                    content_hash = excluded.content_hash",
                params![
                    snapshot.route,
                    snapshot.body,
                    snapshot.timestamp.timestamp_micros(),
                    styles,
                    hash,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, route: &str) -> Result<bool, StorageError> {
        let route = route.to_string();
        self.blocking(move |conn| {
            let removed = conn.execute("DELETE FROM snapshots WHERE route = ?1", params![route])?;
            Ok(removed > 0)
        })
        .await
    }

    async fn list(&self) -> Result<Vec<SnapshotSummary>, StorageError> {
        self.blocking(|conn| {
            let mut stmt = conn.prepare(
                "SELECT route, body, timestamp_us, styles FROM snapshots
                 ORDER BY timestamp_us DESC, route",
            )?;
            let mut rows = stmt.query([])?;
            let mut summaries = Vec::new();
            while let Some(row) = rows.next()? {
                match Self::row_to_snapshot(row) {
                    Ok(snapshot) => summaries.push(SnapshotSummary::from(&snapshot)),
                    Err(e) => tracing::warn!(error = %e, "Skipping unreadable snapshot row"),
                }
            }
            Ok(summaries)
        })
        .await
    }

    async fn prune_expired(
        &self,
        max_age: Duration,
        now: DateTime<Utc>,
    ) -> Result<usize, StorageError> {
        // Ages reaching before the earliest representable time keep everything
        let Some(cutoff) = now.checked_sub_signed(max_age) else {
            return Ok(0);
        };
        let cutoff = cutoff.timestamp_micros();
        self.blocking(move |conn| {
            let removed = conn.execute(
                "DELETE FROM snapshots WHERE timestamp_us < ?1",
                params![cutoff],
            )?;
            Ok(removed)
        })
        .await
    }

    async fn clear(&self) -> Result<usize, StorageError> {
        self.blocking(|conn| Ok(conn.execute("DELETE FROM snapshots", [])?))
            .await
    }
}

/// Opens the SQLite snapshot database at a fixed path for each operation
#[derive(Debug, Clone)]
pub struct SqliteStoreOpener {
    path: PathBuf,
}

impl SqliteStoreOpener {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[async_trait]
impl StoreOpener for SqliteStoreOpener {
    async fn open(&self) -> Result<Box<dyn SnapshotStore>, StorageError> {
        let path = self.path.clone();
        let db = tokio::task::spawn_blocking(move || Database::open(path))
            .await
            .map_err(|e| StorageError::Unknown(format!("Storage task failed: {}", e)))??;
        Ok(Box::new(SqliteSnapshotStore::new(db)))
    }
}

/// Shared in-memory snapshot store.
///
/// Clones share the same contents, so the store doubles as its own opener.
#[derive(Clone, Default)]
pub struct MemorySnapshotStore {
    snapshots: Arc<Mutex<HashMap<String, Snapshot>>>,
    writes: Arc<AtomicUsize>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `put` calls
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Synchronous peek for tests and tooling
    pub fn snapshot(&self, route: &str) -> Option<Snapshot> {
        self.snapshots.lock().get(route).cloned()
    }

    pub fn len(&self) -> usize {
        self.snapshots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.lock().is_empty()
    }

    /// Insert a snapshot directly, bypassing write accounting
    pub fn seed(&self, snapshot: Snapshot) {
        self.snapshots.lock().insert(snapshot.route.clone(), snapshot);
    }
}

impl std::fmt::Debug for MemorySnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySnapshotStore")
            .field("len", &self.len())
            .field("writes", &self.write_count())
            .finish()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn get(&self, route: &str) -> Result<Option<Snapshot>, StorageError> {
        Ok(self.snapshots.lock().get(route).cloned())
    }

    async fn put(&self, snapshot: &Snapshot) -> Result<(), StorageError> {
        self.snapshots
            .lock()
            .insert(snapshot.route.clone(), snapshot.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, route: &str) -> Result<bool, StorageError> {
        Ok(self.snapshots.lock().remove(route).is_some())
    }

    async fn list(&self) -> Result<Vec<SnapshotSummary>, StorageError> {
        let mut summaries: Vec<SnapshotSummary> = self
            .snapshots
            .lock()
            .values()
            .map(SnapshotSummary::from)
            .collect();
        summaries.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| a.route.cmp(&b.route))
        });
        Ok(summaries)
    }

    async fn prune_expired(
        &self,
        max_age: Duration,
        now: DateTime<Utc>,
    ) -> Result<usize, StorageError> {
        let mut snapshots = self.snapshots.lock();
        let before = snapshots.len();
        snapshots.retain(|_, snapshot| snapshot.is_fresh(now, max_age));
        Ok(before - snapshots.len())
    }

    async fn clear(&self) -> Result<usize, StorageError> {
        let mut snapshots = self.snapshots.lock();
        let removed = snapshots.len();
        snapshots.clear();
        Ok(removed)
    }
}

#[async_trait]
impl StoreOpener for MemorySnapshotStore {
    async fn open(&self) -> Result<Box<dyn SnapshotStore>, StorageError> {
        Ok(Box::new(self.clone()))
    }
}
