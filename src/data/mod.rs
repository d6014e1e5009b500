//! Data persistence layer for prepaint
//!
//! This module provides SQLite-based storage for route snapshots, an
//! in-memory store for embedders and tests, and the storage error taxonomy.

mod database;
mod error;
mod migrations;
mod models;
mod snapshot_store;

pub use database::Database;
pub use error::StorageError;
pub use models::{Snapshot, SnapshotSummary, StyleRecord, MAX_SNAPSHOT_AGE_DAYS};
pub use snapshot_store::{
    MemorySnapshotStore, SnapshotStore, SqliteSnapshotStore, SqliteStoreOpener, StoreOpener,
};
