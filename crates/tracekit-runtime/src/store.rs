//! File-backed state store
//!
//! One JSON file per key under a state directory. Writes go through a
//! temporary file followed by a rename, so a crash mid-write leaves either
//! the previous blob or the new one, never a torn file.

use std::fs;
use std::path::{Path, PathBuf};

use tracekit_core::{StateStore, StorageError};

// ----------------------------------------------------------------------------
// File State Store
// ----------------------------------------------------------------------------

/// Durable [`StateStore`] persisting each key as a file in one directory.
#[derive(Debug)]
pub struct FileStateStore {
    dir: PathBuf,
}

impl FileStateStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Directory holding the persisted state files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl StateStore for FileStateStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        let tmp = self.dir.join(format!("{key}.json.tmp"));
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error.into()),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tracekit_core::QUEUE_KEY;

    #[test]
    fn test_round_trip_and_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path()).unwrap();

        assert_eq!(store.get(QUEUE_KEY).unwrap(), None);

        store.put(QUEUE_KEY, "[]").unwrap();
        assert_eq!(store.get(QUEUE_KEY).unwrap().as_deref(), Some("[]"));

        store.put(QUEUE_KEY, "[1,2]").unwrap();
        assert_eq!(store.get(QUEUE_KEY).unwrap().as_deref(), Some("[1,2]"));

        // No stray temp file left behind
        assert!(!dir.path().join(format!("{QUEUE_KEY}.json.tmp")).exists());

        store.remove(QUEUE_KEY).unwrap();
        assert_eq!(store.get(QUEUE_KEY).unwrap(), None);
        store.remove(QUEUE_KEY).unwrap();
    }

    #[test]
    fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileStateStore::new(dir.path()).unwrap();
            store.put("tracekit.user_state", "{\"session_count\":3}").unwrap();
        }

        let store = FileStateStore::new(dir.path()).unwrap();
        assert_eq!(
            store.get("tracekit.user_state").unwrap().as_deref(),
            Some("{\"session_count\":3}")
        );
    }
}
