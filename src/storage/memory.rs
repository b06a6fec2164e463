//! In-memory credential store.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::services::{CredentialStore, SessionResult};

/// Keeps credentials in process memory only.
///
/// Used where the OS keychain must not be touched, such as tests.
#[derive(Debug, Default)]
pub struct MemoryCredentials {
    store: Mutex<HashMap<String, String>>,
}

impl MemoryCredentials {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.store
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentials {
    async fn store(&self, key: &str, value: &str) -> SessionResult<()> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn retrieve(&self, key: &str) -> SessionResult<Option<String>> {
        Ok(self.lock().get(key).cloned())
    }

    async fn delete(&self, key: &str) -> SessionResult<()> {
        self.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn store_retrieve_delete_cycle() {
        let store = MemoryCredentials::new();

        store.store("key", "value").await.unwrap();
        assert_eq!(store.retrieve("key").await.unwrap(), Some("value".to_string()));

        store.store("key", "other").await.unwrap();
        assert_eq!(store.retrieve("key").await.unwrap(), Some("other".to_string()));

        store.delete("key").await.unwrap();
        assert_eq!(store.retrieve("key").await.unwrap(), None);
        store.delete("key").await.unwrap();
    }
}
