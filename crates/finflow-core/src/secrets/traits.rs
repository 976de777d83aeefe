//! Core trait for secret storage

use std::sync::Arc;

use async_trait::async_trait;

use super::error::PublishResult;

/// A place secrets can be written to
///
/// Writes are upserts: storing a name twice leaves only the second value.
///
/// # Example
///
/// ```
/// use finflow_core::secrets::{MemorySecretStore, SecretStore};
///
/// # tokio_test_block_on(async {
/// let store = MemorySecretStore::new();
/// store.store("MONARCH_TOKEN", "abc").await.unwrap();
/// assert_eq!(store.get("MONARCH_TOKEN").await, Some("abc".to_string()));
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Human-readable name of this store
    fn name(&self) -> &str;

    /// Read a secret back. Write-only stores return `None`.
    async fn get(&self, _key: &str) -> Option<String> {
        None
    }

    /// Create or overwrite a secret
    async fn store(&self, key: &str, value: &str) -> PublishResult<()>;
}

pub type SharedSecretStore = Arc<dyn SecretStore>;
