use zova_storage::{LocalStore, SESSION_ID_KEY, SessionId};

/// Resolves the client's session identifier from durable local storage.
///
/// The first successful resolution is cached, so repeated calls return the same
/// identifier even when the store cannot persist it.
pub struct SessionIdentityProvider<S> {
    store: S,
    resolved: Option<SessionId>,
}

impl<S: LocalStore> SessionIdentityProvider<S> {
    /// Wraps `store`; nothing is read until the id is first requested.
    pub fn new(store: S) -> Self {
        Self {
            store,
            resolved: None,
        }
    }

    /// Returns the stored identifier, generating and persisting one if absent.
    ///
    /// Never fails: storage errors degrade to an identifier that lives only as
    /// long as this provider.
    pub fn get_or_create_session_id(&mut self) -> SessionId {
        if let Some(id) = &self.resolved {
            return id.clone();
        }

        let id = match self.store.get(SESSION_ID_KEY) {
            Ok(Some(raw)) => match SessionId::parse(&raw) {
                Ok(id) => {
                    tracing::debug!(room = %id, "reusing stored session id");
                    id
                }
                Err(error) => {
                    tracing::warn!(error = %error, "discarding unusable stored session id");
                    self.create_and_persist()
                }
            },
            Ok(None) => self.create_and_persist(),
            Err(error) => {
                let id = SessionId::generate();
                tracing::warn!(
                    room = %id,
                    error = %error,
                    "local storage unavailable; session id will not survive a restart"
                );
                id
            }
        };

        self.resolved = Some(id.clone());
        id
    }

    fn create_and_persist(&self) -> SessionId {
        let id = SessionId::generate();
        match self.store.set(SESSION_ID_KEY, id.as_str()) {
            Ok(()) => tracing::info!(room = %id, "created new session id"),
            Err(error) => tracing::warn!(
                room = %id,
                error = %error,
                "failed to persist new session id; using it for this run only"
            ),
        }
        id
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use zova_storage::{MemoryStore, StorageError, StorageResult};

    use super::*;

    struct BrokenStore;

    impl LocalStore for BrokenStore {
        fn get(&self, _key: &str) -> StorageResult<Option<String>> {
            Err(StorageError::Unavailable {
                stage: "test-get",
                details: "storage disabled".to_string(),
            })
        }

        fn set(&self, _key: &str, _value: &str) -> StorageResult<()> {
            Err(StorageError::Unavailable {
                stage: "test-set",
                details: "storage disabled".to_string(),
            })
        }

        fn remove(&self, _key: &str) -> StorageResult<()> {
            Ok(())
        }
    }

    #[test]
    fn creates_and_persists_on_first_run() {
        let store = Arc::new(MemoryStore::new());
        let mut provider = SessionIdentityProvider::new(store.clone());

        let id = provider.get_or_create_session_id();
        assert!(id.as_str().starts_with("room_"));
        assert_eq!(
            store.get(SESSION_ID_KEY).expect("get"),
            Some(id.to_string())
        );
    }

    #[test]
    fn resolution_is_idempotent_within_one_storage_scope() {
        let store = Arc::new(MemoryStore::new());

        let first = SessionIdentityProvider::new(store.clone()).get_or_create_session_id();
        let second = SessionIdentityProvider::new(store.clone()).get_or_create_session_id();
        assert_eq!(first, second);

        let mut provider = SessionIdentityProvider::new(store);
        assert_eq!(
            provider.get_or_create_session_id(),
            provider.get_or_create_session_id()
        );
    }

    #[test]
    fn cleared_storage_yields_a_new_identity() {
        let store = Arc::new(MemoryStore::new());
        let first = SessionIdentityProvider::new(store.clone()).get_or_create_session_id();

        store.remove(SESSION_ID_KEY).expect("remove");
        let second = SessionIdentityProvider::new(store).get_or_create_session_id();
        assert_ne!(first, second);
    }

    #[test]
    fn unavailable_storage_still_produces_a_stable_runtime_id() {
        let mut provider = SessionIdentityProvider::new(BrokenStore);

        let first = provider.get_or_create_session_id();
        let second = provider.get_or_create_session_id();
        assert!(first.as_str().starts_with("room_"));
        assert_eq!(first, second);
    }

    #[test]
    fn blank_stored_value_is_replaced() {
        let store = Arc::new(MemoryStore::new());
        store.set(SESSION_ID_KEY, "  ").expect("seed blank id");

        let id = SessionIdentityProvider::new(store.clone()).get_or_create_session_id();
        assert!(id.as_str().starts_with("room_"));
        assert_eq!(
            store.get(SESSION_ID_KEY).expect("get"),
            Some(id.to_string())
        );
    }
}
