//! JSON file storage implementation
//!
//! Each key maps to `{dir}/{key}-crawler.json`. Writes go to a temporary file
//! that is renamed over the target, so a crash mid-write leaves the previous
//! snapshot intact.

use crate::state::JobStates;
use crate::storage::traits::{SnapshotStore, StorageResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// File-per-crawler JSON snapshot backend
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Creates a store rooted at `dir`, creating the directory if needed
    pub fn new(dir: &Path) -> StorageResult<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// Path of the snapshot file for `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}-crawler.json", key))
    }
}

impl SnapshotStore for JsonFileStore {
    fn read(&self, key: &str) -> StorageResult<Option<JobStates>> {
        let content = match std::fs::read_to_string(self.path_for(key)) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Ok(Some(serde_json::from_str(&content)?))
    }

    fn write(&mut self, key: &str, states: &JobStates) -> StorageResult<()> {
        let json = serde_json::to_string_pretty(states)?;
        write_atomic(&self.path_for(key), json.as_bytes())?;
        Ok(())
    }
}

/// Writes `contents` next to `path` and renames it into place
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    std::fs::write(&tmp, contents)?;
    std::fs::rename(&tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{HistoryItem, JobState};
    use tempfile::TempDir;

    #[test]
    fn test_read_missing_returns_none() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path()).unwrap();

        assert!(store.read("feeds").unwrap().is_none());
    }

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonFileStore::new(dir.path()).unwrap();

        let mut state = JobState::new();
        state.record(HistoryItem::success(4.0, 2));
        let mut states = JobStates::new();
        states.insert("fetch".to_string(), state);

        store.write("feeds", &states).unwrap();

        assert!(dir.path().join("feeds-crawler.json").exists());
        assert!(!dir.path().join("feeds-crawler.json.tmp").exists());

        let loaded = store.read("feeds").unwrap().unwrap();
        assert_eq!(loaded, states);
    }

    #[test]
    fn test_keys_are_isolated() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonFileStore::new(dir.path()).unwrap();

        let mut states = JobStates::new();
        states.insert("a".to_string(), JobState::new());
        store.write("one", &states).unwrap();

        assert!(store.read("two").unwrap().is_none());
    }

    #[test]
    fn test_corrupt_snapshot_is_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("feeds-crawler.json"), "{ not json").unwrap();
        let store = JsonFileStore::new(dir.path()).unwrap();

        assert!(store.read("feeds").is_err());
    }

    #[test]
    fn test_creates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        let mut store = JsonFileStore::new(&nested).unwrap();

        store.write("x", &JobStates::new()).unwrap();
        assert!(nested.join("x-crawler.json").exists());
    }
}
