//! Storage traits and error types
//!
//! This module defines the trait interface for snapshot backends and
//! associated error types.

use crate::state::JobStates;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for snapshot backend implementations
///
/// A snapshot is written as a whole and overwrites whatever was stored under
/// the same key. Implementations decide how durable the write is.
pub trait SnapshotStore: Send {
    /// Reads the snapshot stored under `key`
    ///
    /// # Returns
    ///
    /// * `Ok(Some(states))` - A snapshot was found
    /// * `Ok(None)` - Nothing has been stored under this key yet
    /// * `Err(StorageError)` - The backend failed or the snapshot is corrupt
    fn read(&self, key: &str) -> StorageResult<Option<JobStates>>;

    /// Replaces the snapshot stored under `key`
    fn write(&mut self, key: &str, states: &JobStates) -> StorageResult<()>;
}
