//! Publishing with logging and retries

use std::time::Duration;

use super::error::PublishResult;
use super::traits::SharedSecretStore;
use crate::config::SecretSettings;
use crate::logging::SharedLogger;
use crate::{log_error, log_info, log_warn};

/// Writes secrets to a store, retrying transient failures
pub struct SecretPublisher {
    store: SharedSecretStore,
    logger: SharedLogger,
    max_attempts: u32,
    retry_delay: Duration,
}

impl SecretPublisher {
    pub fn new(store: SharedSecretStore, logger: SharedLogger) -> Self {
        let defaults = SecretSettings::default();
        Self {
            store,
            logger,
            max_attempts: defaults.max_attempts,
            retry_delay: defaults.retry_delay(),
        }
    }

    pub fn from_settings(store: SharedSecretStore, logger: SharedLogger, settings: &SecretSettings) -> Self {
        Self::new(store, logger)
            .with_max_attempts(settings.max_attempts)
            .with_retry_delay(settings.retry_delay())
    }

    /// Total attempts for unreachable stores; at least one
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn store_name(&self) -> &str {
        self.store.name()
    }

    /// Create or overwrite `name`.
    ///
    /// Only `Unreachable` is retried. Failures are logged with the secret
    /// name; the value is never logged.
    pub async fn publish(&self, name: &str, value: &str) -> PublishResult<()> {
        let mut attempt = 1;
        loop {
            match self.store.store(name, value).await {
                Ok(()) => {
                    log_info!(self.logger, "Published {} to {} store", name, self.store.name());
                    return Ok(());
                }
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    log_warn!(
                        self.logger,
                        "Publishing {} failed (attempt {}/{}): {}",
                        name,
                        attempt,
                        self.max_attempts,
                        e
                    );
                    attempt += 1;
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => {
                    log_error!(self.logger, "Failed to publish {}: {}", name, e);
                    return Err(e);
                }
            }
        }
    }
}

impl std::fmt::Debug for SecretPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretPublisher")
            .field("store", &self.store.name())
            .field("max_attempts", &self.max_attempts)
            .field("retry_delay", &self.retry_delay)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::PublishError;
    use crate::logging::{LogLevel, RecordingLogger};
    use crate::secrets::{MemorySecretStore, SecretStore};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;

    /// Store that fails with queued errors before succeeding
    struct FlakyStore {
        failures: Mutex<VecDeque<PublishError>>,
        calls: Mutex<u32>,
    }

    impl FlakyStore {
        fn new(failures: Vec<PublishError>) -> Self {
            Self {
                failures: Mutex::new(failures.into()),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock()
        }
    }

    #[async_trait]
    impl SecretStore for FlakyStore {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn store(&self, _key: &str, _value: &str) -> PublishResult<()> {
            *self.calls.lock() += 1;
            match self.failures.lock().pop_front() {
                Some(e) => Err(e),
                None => Ok(()),
            }
        }
    }

    fn unreachable() -> PublishError {
        PublishError::Unreachable {
            name: "MONARCH_TOKEN".into(),
            message: "connection refused".into(),
        }
    }

    fn publisher(store: Arc<dyn SecretStore>, logger: Arc<RecordingLogger>) -> SecretPublisher {
        SecretPublisher::new(store, logger)
            .with_max_attempts(3)
            .with_retry_delay(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_publish_twice_keeps_latest() {
        let store = Arc::new(MemorySecretStore::new());
        let publisher = publisher(store.clone(), Arc::new(RecordingLogger::new()));

        publisher.publish("MONARCH_TOKEN", "one").await.unwrap();
        publisher.publish("MONARCH_TOKEN", "two").await.unwrap();

        assert_eq!(store.get_sync("MONARCH_TOKEN"), Some("two".to_string()));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_is_retried() {
        let store = Arc::new(FlakyStore::new(vec![unreachable(), unreachable()]));
        let logger = Arc::new(RecordingLogger::new());
        publisher(store.clone(), logger.clone())
            .publish("MONARCH_TOKEN", "secret-value")
            .await
            .unwrap();

        assert_eq!(store.calls(), 3);
        assert_eq!(logger.messages_at(LogLevel::Warn).len(), 2);
        assert!(!logger.contains("secret-value"));
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let store = Arc::new(FlakyStore::new(vec![unreachable(); 5]));
        let logger = Arc::new(RecordingLogger::new());
        let err = publisher(store.clone(), logger.clone())
            .publish("MONARCH_TOKEN", "secret-value")
            .await
            .unwrap_err();

        assert!(matches!(err, PublishError::Unreachable { .. }));
        assert_eq!(store.calls(), 3);
        let errors = logger.messages_at(LogLevel::Error);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("MONARCH_TOKEN"));
    }

    #[tokio::test]
    async fn test_unauthorized_fails_fast() {
        let store = Arc::new(FlakyStore::new(vec![PublishError::Unauthorized {
            name: "MONARCH_TOKEN".into(),
            message: "401".into(),
        }]));
        let logger = Arc::new(RecordingLogger::new());
        let err = publisher(store.clone(), logger.clone())
            .publish("MONARCH_TOKEN", "secret-value")
            .await
            .unwrap_err();

        assert!(matches!(err, PublishError::Unauthorized { .. }));
        assert_eq!(store.calls(), 1);
        assert!(!logger.contains("secret-value"));
    }
}
