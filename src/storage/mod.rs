//! Storage module for persisting crawler snapshots
//!
//! This module handles durable storage of job states, including:
//! - The `SnapshotStore` trait the crawler reads and writes through
//! - A JSON file backend (one file per crawler, atomic replace)
//! - A SQLite backend (one row per crawler)

mod json_file;
mod schema;
mod sqlite;
mod traits;

pub use json_file::JsonFileStore;
pub(crate) use json_file::write_atomic;
pub use sqlite::SqliteStore;
pub use traits::{SnapshotStore, StorageError, StorageResult};

use crate::config::{StorageBackend, StorageConfig};
use std::path::Path;

/// Opens the snapshot store described by the storage configuration
///
/// # Arguments
///
/// * `config` - The storage section of the configuration
/// * `key` - The crawler id, used to name the SQLite database file
///
/// # Returns
///
/// * `Ok(Box<dyn SnapshotStore>)` - Successfully opened store
/// * `Err(StorageError)` - Failed to create the data directory or database
pub fn open_store(config: &StorageConfig, key: &str) -> StorageResult<Box<dyn SnapshotStore>> {
    let data_dir = Path::new(&config.data_dir);

    match config.backend {
        StorageBackend::Json => Ok(Box::new(JsonFileStore::new(data_dir)?)),
        StorageBackend::Sqlite => {
            std::fs::create_dir_all(data_dir)?;
            let path = data_dir.join(format!("{}-crawler.db", key));
            Ok(Box::new(SqliteStore::new(&path)?))
        }
    }
}
