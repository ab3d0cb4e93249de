//! Snapshot persistence boundary.
//!
//! # Responsibility
//! - Define the `load` / `save` contract between the agenda and storage.
//! - Provide in-memory and SQLite-backed implementations.
//!
//! # Invariants
//! - `save` replaces the whole snapshot; there is no partial save.
//! - `load` returns raw record values; validating them is the caller's job
//!   so one bad record never hides the rest.

pub mod memory_store;
pub mod sqlite_store;

use crate::db::DbError;
use crate::model::record::NoteRecord;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub use memory_store::MemoryNoteStore;
pub use sqlite_store::{SnapshotInfo, SqliteNoteStore};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    Serialization(serde_json::Error),
    /// Stored data or connection state the store cannot work with.
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Serialization(err) => write!(f, "snapshot serialization failed: {err}"),
            Self::InvalidData(message) => write!(f, "invalid snapshot data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Serialization(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

/// Storage collaborator for full note snapshots.
pub trait NoteStore {
    /// Returns every stored note record in saved order.
    fn load(&self) -> StoreResult<Vec<Value>>;
    /// Replaces the stored snapshot with `records`.
    fn save(&mut self, records: &[NoteRecord]) -> StoreResult<()>;
}
