//! In-memory secret store

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::error::PublishResult;
use super::traits::SecretStore;

/// In-memory secret store for tests and dry runs
///
/// Secrets are lost when the store is dropped.
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    secrets: RwLock<HashMap<String, String>>,
    writes: RwLock<usize>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.secrets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get a secret without going through the async trait
    pub fn get_sync(&self, key: &str) -> Option<String> {
        self.secrets.read().get(key).cloned()
    }

    /// Number of `store` calls made so far
    pub fn write_count(&self) -> usize {
        *self.writes.read()
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> Option<String> {
        self.get_sync(key)
    }

    async fn store(&self, key: &str, value: &str) -> PublishResult<()> {
        self.secrets.write().insert(key.to_string(), value.to_string());
        *self.writes.write() += 1;
        Ok(())
    }
}
