use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use snafu::ResultExt;

use super::LocalStore;
use super::error::{
    CreateStoreDirectorySnafu, ParseStoreSnafu, ReadStoreSnafu, RenameTempStoreSnafu,
    SerializeStoreSnafu, StorageError, StorageResult, WriteStoreSnafu,
};

type Entries = BTreeMap<String, String>;

/// Key-value storage persisted as one JSON object on disk.
///
/// Every write rewrites the whole file through a temporary sibling and an atomic
/// rename, so a crash never leaves a half-written map behind.
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<Entries>,
}

impl JsonFileStore {
    /// Opens the store at `path`; a missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        let entries = Self::load_from_disk(&path)?;
        tracing::debug!(path = ?path, keys = entries.len(), "opened local storage");
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_from_disk(path: &Path) -> StorageResult<Entries> {
        if !path.exists() {
            return Ok(Entries::new());
        }

        let content = std::fs::read_to_string(path).context(ReadStoreSnafu {
            stage: "read-local-storage",
            path: path.to_path_buf(),
        })?;
        if content.trim().is_empty() {
            return Ok(Entries::new());
        }

        serde_json::from_str(&content).context(ParseStoreSnafu {
            stage: "parse-local-storage",
            path: path.to_path_buf(),
        })
    }

    fn persist(&self, entries: &Entries) -> StorageResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).context(CreateStoreDirectorySnafu {
                stage: "create-local-storage-directory",
                path: parent.to_path_buf(),
            })?;
        }

        let content = serde_json::to_string_pretty(entries).context(SerializeStoreSnafu {
            stage: "serialize-local-storage",
        })?;

        let temp_path = self.path.with_extension("json.tmp");
        std::fs::write(&temp_path, content).context(WriteStoreSnafu {
            stage: "write-temporary-local-storage",
            path: temp_path.clone(),
        })?;

        std::fs::rename(&temp_path, &self.path).context(RenameTempStoreSnafu {
            stage: "rename-temporary-local-storage",
            from: temp_path,
            to: self.path.clone(),
        })?;

        Ok(())
    }

    fn update<F>(&self, stage: &'static str, mutate: F) -> StorageResult<()>
    where
        F: FnOnce(&mut Entries),
    {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Unavailable {
            stage,
            details: "local storage lock poisoned".to_string(),
        })?;

        // Persist a staged copy first so memory never runs ahead of disk.
        let mut staged = entries.clone();
        mutate(&mut staged);
        self.persist(&staged)?;
        *entries = staged;
        Ok(())
    }
}

impl LocalStore for JsonFileStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let entries = self.entries.lock().map_err(|_| StorageError::Unavailable {
            stage: "file-store-get",
            details: "local storage lock poisoned".to_string(),
        })?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.update("file-store-set", |entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.update("file-store-remove", |entries| {
            entries.remove(key);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_survive_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("local_storage.json");

        let store = JsonFileStore::open(&path).expect("open fresh store");
        assert_eq!(store.get("chat_session_id").expect("get"), None);
        store.set("chat_session_id", "room_abc123xyz").expect("set");

        let reopened = JsonFileStore::open(&path).expect("reopen store");
        assert_eq!(
            reopened.get("chat_session_id").expect("get"),
            Some("room_abc123xyz".to_string())
        );
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn remove_drops_key_on_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("local_storage.json");

        let store = JsonFileStore::open(&path).expect("open");
        store.set("a", "1").expect("set a");
        store.set("b", "2").expect("set b");
        store.remove("a").expect("remove a");

        let reopened = JsonFileStore::open(&path).expect("reopen");
        assert_eq!(reopened.get("a").expect("get a"), None);
        assert_eq!(reopened.get("b").expect("get b"), Some("2".to_string()));
    }

    #[test]
    fn corrupted_file_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("local_storage.json");
        std::fs::write(&path, "not json").expect("write garbage");

        let error = JsonFileStore::open(&path).err().expect("open should fail");
        assert!(matches!(error, StorageError::ParseStore { .. }));
    }
}
