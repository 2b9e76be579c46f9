use std::collections::HashMap;
use std::sync::Mutex;

use super::LocalStore;
use super::error::{StorageError, StorageResult};

/// Non-durable storage, used when no storage file is configured and in tests.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(
        &self,
        stage: &'static str,
    ) -> StorageResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries.lock().map_err(|_| StorageError::Unavailable {
            stage,
            details: "memory storage lock poisoned".to_string(),
        })
    }
}

impl LocalStore for MemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.lock("memory-store-get")?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.lock("memory-store-set")?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.lock("memory-store-remove")?.remove(key);
        Ok(())
    }
}
