pub mod error;
pub mod file;
pub mod ids;
pub mod memory;

pub use error::{StorageError, StorageResult};
pub use file::JsonFileStore;
pub use ids::{SESSION_ID_PREFIX, SESSION_ID_RANDOM_LEN, SessionId};
pub use memory::MemoryStore;

/// Storage key holding the persisted session identifier.
pub const SESSION_ID_KEY: &str = "chat_session_id";

/// Durable, per-client string key-value storage.
pub trait LocalStore: Send + Sync {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;
    fn remove(&self, key: &str) -> StorageResult<()>;
}

impl<T> LocalStore for std::sync::Arc<T>
where
    T: LocalStore + ?Sized,
{
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        (**self).remove(key)
    }
}
