//! Rotation engine: login, refresh, extract, publish

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::clock::{SharedClock, SystemClock};
use super::error::{RotationError, RotationResult};
use super::lock;
use super::state::RotationState;
use super::totp::TotpGenerator;
use crate::config::RotationSettings;
use crate::logging::SharedLogger;
use crate::providers::{AuthError, RefreshError, SharedProvider};
use crate::secrets::SecretPublisher;
use crate::types::{AuthChallenge, CancellationToken, Credential, SessionHandle};
use crate::{log_debug, log_error, log_info, log_warn};

/// Outcome of a successful `rotate_and_publish`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationReport {
    pub secret_name: String,
    pub provider: String,
    pub store: String,
    /// Masked token, safe to print
    pub token_preview: String,
    pub issued_at: DateTime<Utc>,
}

/// Obtains a fresh session token from a provider and publishes it
pub struct RotationEngine {
    provider: SharedProvider,
    publisher: SecretPublisher,
    logger: SharedLogger,
    clock: SharedClock,
    refresh_timeout: Duration,
    poll_initial: Duration,
    poll_max: Duration,
    retry_expired_challenge: bool,
    lock_dir: Option<PathBuf>,
    state: Mutex<RotationState>,
}

impl RotationEngine {
    pub fn new(provider: SharedProvider, publisher: SecretPublisher, logger: SharedLogger) -> Self {
        Self {
            provider,
            publisher,
            logger,
            clock: Arc::new(SystemClock),
            refresh_timeout: Duration::ZERO,
            poll_initial: Duration::ZERO,
            poll_max: Duration::ZERO,
            retry_expired_challenge: true,
            lock_dir: None,
            state: Mutex::new(RotationState::Idle),
        }
        .with_settings(&RotationSettings::default())
    }

    pub fn with_settings(mut self, settings: &RotationSettings) -> Self {
        self.refresh_timeout = settings.refresh_timeout();
        self.poll_initial = settings.poll_initial();
        self.poll_max = settings.poll_max();
        self.retry_expired_challenge = settings.retry_expired_challenge;
        self
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    /// Poll backoff: starts at `initial`, doubles, never exceeds `max`
    pub fn with_poll_interval(mut self, initial: Duration, max: Duration) -> Self {
        self.poll_initial = initial;
        self.poll_max = max.max(initial);
        self
    }

    /// Directory for cross-process lock files
    pub fn with_lock_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.lock_dir = Some(dir.into());
        self
    }

    /// State reached by the most recent rotation
    pub fn state(&self) -> RotationState {
        self.state.lock().clone()
    }

    fn transition(&self, next: RotationState) {
        let mut state = self.state.lock();
        if !state.can_transition_to(&next) {
            log_warn!(self.logger, "Unexpected rotation transition {} -> {}", *state, next);
        }
        log_debug!(self.logger, "Rotation: {}", next);
        *state = next;
    }

    fn fail(&self, err: RotationError) -> RotationError {
        log_error!(self.logger, "Rotation failed: {}", err);
        self.transition(RotationState::Failed {
            reason: err.to_string(),
        });
        err
    }

    /// Log in with a code computed now.
    ///
    /// If the provider says the code expired, waits for the next window and
    /// tries once more with a fresh code.
    pub async fn authenticate(&self, challenge: &AuthChallenge) -> Result<SessionHandle, AuthError> {
        let totp = TotpGenerator::new(&challenge.mfa_secret)?;

        let code = totp.code_at(self.clock.now());
        match self.provider.login(&challenge.email, &challenge.password, &code).await {
            Err(AuthError::ExpiredChallenge { message, .. }) if self.retry_expired_challenge => {
                let wait = totp.remaining(self.clock.now());
                log_warn!(
                    self.logger,
                    "{} rejected the one-time code ({}); retrying in {}s",
                    self.provider.name(),
                    message,
                    wait.as_secs()
                );
                tokio::time::sleep(wait).await;

                let code = totp.code_at(self.clock.now());
                self.provider.login(&challenge.email, &challenge.password, &code).await
            }
            other => other,
        }
    }

    /// Start the provider's refresh job and wait until it reports completion
    pub async fn request_refresh_and_await(
        &self,
        session: &SessionHandle,
        cancel: &CancellationToken,
    ) -> Result<(), RefreshError> {
        let work = async {
            self.transition(RotationState::RefreshRequested);
            self.provider.request_refresh(session).await?;
            self.transition(RotationState::AwaitingRefresh);

            let mut delay = self.poll_initial;
            loop {
                if self.provider.is_refresh_complete(session).await? {
                    return Ok::<(), RefreshError>(());
                }
                log_debug!(self.logger, "Refresh still running; next check in {:?}", delay);
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(self.poll_max);
            }
        };

        match cancel
            .run_until_cancelled(tokio::time::timeout(self.refresh_timeout, work))
            .await
        {
            None => Err(RefreshError::Cancelled),
            Some(Err(_elapsed)) => Err(RefreshError::Timeout(self.refresh_timeout)),
            Some(Ok(result)) => result,
        }
    }

    /// Take the token out of the session
    pub fn extract_token(&self, session: SessionHandle) -> Credential {
        Credential::new(session.into_token(), self.clock.now())
    }

    /// Authenticate, refresh and extract. Publishes nothing.
    pub async fn rotate(
        &self,
        challenge: &AuthChallenge,
        cancel: &CancellationToken,
    ) -> RotationResult<Credential> {
        self.transition(RotationState::Authenticating);
        let session = match cancel.run_until_cancelled(self.authenticate(challenge)).await {
            None => return Err(self.fail(RotationError::Cancelled)),
            Some(Err(e)) => return Err(self.fail(e.into())),
            Some(Ok(session)) => session,
        };
        log_info!(self.logger, "Authenticated with {}", session.provider());

        if let Err(e) = self.request_refresh_and_await(&session, cancel).await {
            return Err(self.fail(e.into()));
        }

        let credential = self.extract_token(session);
        self.transition(RotationState::Extracted);
        log_info!(self.logger, "Extracted token {}", credential.masked());
        Ok(credential)
    }

    /// Rotate and publish the new token under `secret_name`.
    ///
    /// Holds the rotation lock for `secret_name` throughout; nothing is
    /// published unless the rotation fully succeeded.
    pub async fn rotate_and_publish(
        &self,
        challenge: &AuthChallenge,
        secret_name: &str,
        cancel: &CancellationToken,
    ) -> RotationResult<RotationReport> {
        let _guard = lock::acquire(secret_name, self.lock_dir.as_deref())
            .await
            .map_err(|e| self.fail(e))?;

        let credential = self.rotate(challenge, cancel).await?;
        if cancel.is_cancelled() {
            return Err(self.fail(RotationError::Cancelled));
        }

        if let Err(e) = self.publisher.publish(secret_name, credential.value()).await {
            return Err(self.fail(e.into()));
        }
        self.transition(RotationState::Published);

        Ok(RotationReport {
            secret_name: secret_name.to_string(),
            provider: self.provider.name().to_string(),
            store: self.publisher.store_name().to_string(),
            token_preview: credential.masked(),
            issued_at: credential.issued_at(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{NoOpLogger, RecordingLogger};
    use crate::providers::{MockLogin, MockProvider, MockRefresh};
    use crate::rotation::clock::{Clock, FixedClock};
    use crate::secrets::MemorySecretStore;
    use chrono::TimeZone;
    use std::collections::VecDeque;
    use tempfile::tempdir;

    const RFC_SECRET: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    /// Returns queued instants in order, then repeats the last one
    struct SequenceClock(Mutex<VecDeque<DateTime<Utc>>>);

    impl SequenceClock {
        fn new(times: &[i64]) -> Self {
            Self(Mutex::new(times.iter().map(|t| at(*t)).collect()))
        }
    }

    impl Clock for SequenceClock {
        fn now(&self) -> DateTime<Utc> {
            let mut times = self.0.lock();
            if times.len() > 1 {
                times.pop_front().unwrap()
            } else {
                times[0]
            }
        }
    }

    fn challenge() -> AuthChallenge {
        AuthChallenge::new("me@example.com", "hunter2", RFC_SECRET)
    }

    struct Fixture {
        provider: Arc<MockProvider>,
        store: Arc<MemorySecretStore>,
        engine: RotationEngine,
    }

    fn fixture(provider: MockProvider) -> Fixture {
        let provider = Arc::new(provider);
        let store = Arc::new(MemorySecretStore::new());
        let logger: SharedLogger = Arc::new(NoOpLogger::new());
        let publisher = SecretPublisher::new(store.clone(), logger.clone());
        let engine = RotationEngine::new(provider.clone(), publisher, logger)
            .with_clock(Arc::new(FixedClock(at(1_111_111_109))))
            .with_poll_interval(Duration::from_millis(5), Duration::from_millis(20))
            .with_refresh_timeout(Duration::from_secs(5));
        Fixture {
            provider,
            store,
            engine,
        }
    }

    fn mock() -> MockProvider {
        MockProvider::new(Arc::new(NoOpLogger::new()))
    }

    #[tokio::test]
    async fn test_code_matches_clock() {
        let f = fixture(mock());
        f.engine.authenticate(&challenge()).await.unwrap();
        assert_eq!(f.provider.codes_seen(), vec!["081804".to_string()]);
    }

    #[tokio::test]
    async fn test_rotate_and_publish() {
        let f = fixture(mock().with_login(MockLogin::Succeed("fresh-token-123".into())));
        let report = f
            .engine
            .rotate_and_publish(&challenge(), "MONARCH_TOKEN", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.secret_name, "MONARCH_TOKEN");
        assert_eq!(report.store, "memory");
        assert_eq!(report.provider, "mock");
        assert_eq!(report.token_preview, "fres****");
        assert_eq!(report.issued_at, at(1_111_111_109));
        assert_eq!(f.store.get_sync("MONARCH_TOKEN"), Some("fresh-token-123".to_string()));
        assert_eq!(f.engine.state(), RotationState::Published);
    }

    #[tokio::test]
    async fn test_invalid_credentials_never_publish() {
        let f = fixture(mock().with_login(MockLogin::Reject("bad mfa".into())));
        let err = f
            .engine
            .rotate_and_publish(&challenge(), "MONARCH_TOKEN", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RotationError::Auth(AuthError::InvalidCredentials { ref message, .. }) if message == "bad mfa"
        ));
        assert_eq!(f.provider.login_calls(), 1);
        assert_eq!(f.provider.refresh_requests(), 0);
        assert_eq!(f.store.write_count(), 0);
        assert!(f.engine.state().is_failed());
    }

    #[tokio::test]
    async fn test_expired_code_retried_once_with_fresh_code() {
        let f = fixture(mock().with_login(MockLogin::ExpireOnce("tok".into())));
        let engine = f
            .engine
            .with_clock(Arc::new(SequenceClock::new(&[1_111_111_109, 1_111_111_109, 1_111_111_111])));

        engine.authenticate(&challenge()).await.unwrap();

        let codes = f.provider.codes_seen();
        assert_eq!(codes.len(), 2);
        assert_eq!(codes[0], "081804");
        assert_eq!(codes[1], "050471");
    }

    #[tokio::test]
    async fn test_expired_code_fails_after_one_retry() {
        let f = fixture(mock().with_login(MockLogin::AlwaysExpired));
        let engine = f
            .engine
            .with_clock(Arc::new(SequenceClock::new(&[1_111_111_109, 1_111_111_109, 1_111_111_111])));

        let err = engine.authenticate(&challenge()).await.unwrap_err();
        assert!(matches!(err, AuthError::ExpiredChallenge { .. }));
        assert_eq!(f.provider.login_calls(), 2);
    }

    #[tokio::test]
    async fn test_invalid_secret() {
        let f = fixture(mock());
        let bad = AuthChallenge::new("me@example.com", "pw", "%%%");
        let err = f.engine.authenticate(&bad).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidSecret(_)));
        assert_eq!(f.provider.login_calls(), 0);
    }

    #[tokio::test]
    async fn test_refresh_polls_until_complete() {
        let f = fixture(mock().with_refresh(MockRefresh::CompleteAfter(3)));
        let session = SessionHandle::new("mock", "t");
        f.engine
            .request_refresh_and_await(&session, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(f.provider.refresh_requests(), 1);
        assert_eq!(f.provider.polls(), 3);
    }

    #[tokio::test]
    async fn test_never_completing_refresh_times_out() {
        let f = fixture(mock().with_refresh(MockRefresh::Never));
        let engine = f.engine.with_refresh_timeout(Duration::from_millis(100));
        let started = std::time::Instant::now();

        let err = engine
            .rotate_and_publish(&challenge(), "MONARCH_TOKEN", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RotationError::Refresh(RefreshError::Timeout(d)) if d == Duration::from_millis(100)
        ));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(f.provider.polls() >= 2);
        assert_eq!(f.store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_remote_failure() {
        let f = fixture(mock().with_refresh(MockRefresh::RequestFails("sync disabled".into())));
        let err = f
            .engine
            .rotate(&challenge(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RotationError::Refresh(RefreshError::RemoteFailure { .. })));
        assert_eq!(f.provider.polls(), 0);
    }

    #[tokio::test]
    async fn test_cancel_during_refresh_wait() {
        let f = fixture(mock().with_refresh(MockRefresh::Never));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let err = f
            .engine
            .rotate_and_publish(&challenge(), "MONARCH_TOKEN", &cancel)
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert!(matches!(err, RotationError::Refresh(RefreshError::Cancelled)));
        assert_eq!(f.store.write_count(), 0);
        assert_eq!(
            f.engine.state(),
            RotationState::Failed {
                reason: "Refresh wait cancelled".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let f = fixture(mock());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = f.engine.rotate(&challenge(), &cancel).await.unwrap_err();
        assert!(matches!(err, RotationError::Cancelled));
        assert_eq!(f.provider.login_calls(), 0);
    }

    #[tokio::test]
    async fn test_busy_when_lock_held_elsewhere() {
        use fs2::FileExt;

        let dir = tempdir().unwrap();
        let f = fixture(mock());
        let engine = f.engine.with_lock_dir(dir.path());

        let held = std::fs::File::create(dir.path().join(lock::lock_file_name("ENGINE_BUSY_TOKEN"))).unwrap();
        held.lock_exclusive().unwrap();

        let err = engine
            .rotate_and_publish(&challenge(), "ENGINE_BUSY_TOKEN", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RotationError::Busy { .. }));
        assert_eq!(f.provider.login_calls(), 0);
    }

    #[tokio::test]
    async fn test_failures_are_logged() {
        let logger = Arc::new(RecordingLogger::new());
        let provider = Arc::new(mock().with_login(MockLogin::Unreachable));
        let publisher = SecretPublisher::new(Arc::new(MemorySecretStore::new()), logger.clone());
        let engine = RotationEngine::new(provider, publisher, logger.clone());

        let err = engine
            .rotate(&challenge(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RotationError::Auth(AuthError::NetworkFailure { .. })));
        assert!(logger.contains("Rotation failed"));
        assert!(!logger.contains("hunter2"));
    }
}
