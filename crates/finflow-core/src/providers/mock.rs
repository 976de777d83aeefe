//! Mock provider for testing
//!
//! Deterministic login and refresh behaviour without network access, with
//! call counters so tests can assert on what the engine did.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::error::{AuthError, RefreshError};
use super::traits::Provider;
use crate::logging::SharedLogger;
use crate::types::SessionHandle;
use crate::log_debug;

/// How the mock answers `login`
#[derive(Debug, Clone)]
pub enum MockLogin {
    /// Always succeed with this token
    Succeed(String),
    /// Always fail with a `LoginFailure` carrying this message
    Reject(String),
    /// Report an expired code on the first attempt, then succeed
    ExpireOnce(String),
    /// Always report an expired code
    AlwaysExpired,
    /// Fail as if the network were down
    Unreachable,
}

/// How the mock answers refresh requests and polls
#[derive(Debug, Clone)]
pub enum MockRefresh {
    /// Report completion on the given poll (1-based)
    CompleteAfter(usize),
    /// Never complete
    Never,
    /// Reject the refresh request
    RequestFails(String),
    /// Accept the request but fail while polling
    PollFails(String),
}

/// Mock provider for testing
pub struct MockProvider {
    login: MockLogin,
    refresh: MockRefresh,
    logger: SharedLogger,
    logins: AtomicUsize,
    refresh_requests: AtomicUsize,
    polls: AtomicUsize,
    codes: Mutex<Vec<String>>,
}

impl MockProvider {
    /// A provider that logs in and completes the refresh on the first poll
    pub fn new(logger: SharedLogger) -> Self {
        Self {
            login: MockLogin::Succeed("mock-session-token".to_string()),
            refresh: MockRefresh::CompleteAfter(1),
            logger,
            logins: AtomicUsize::new(0),
            refresh_requests: AtomicUsize::new(0),
            polls: AtomicUsize::new(0),
            codes: Mutex::new(Vec::new()),
        }
    }

    pub fn with_login(mut self, login: MockLogin) -> Self {
        self.login = login;
        self
    }

    pub fn with_refresh(mut self, refresh: MockRefresh) -> Self {
        self.refresh = refresh;
        self
    }

    pub fn login_calls(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    pub fn refresh_requests(&self) -> usize {
        self.refresh_requests.load(Ordering::SeqCst)
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    /// One-time codes received by `login`, in order
    pub fn codes_seen(&self) -> Vec<String> {
        self.codes.lock().clone()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn login(&self, _email: &str, _password: &str, code: &str) -> Result<SessionHandle, AuthError> {
        let attempt = self.logins.fetch_add(1, Ordering::SeqCst) + 1;
        self.codes.lock().push(code.to_string());
        log_debug!(self.logger, "Mock login attempt {}", attempt);

        match &self.login {
            MockLogin::Succeed(token) => Ok(SessionHandle::new("mock", token.clone())),
            MockLogin::Reject(message) => Err(AuthError::invalid_credentials("mock", message.clone())),
            MockLogin::ExpireOnce(token) if attempt > 1 => Ok(SessionHandle::new("mock", token.clone())),
            MockLogin::ExpireOnce(_) | MockLogin::AlwaysExpired => {
                Err(AuthError::expired_challenge("mock", "code expired"))
            }
            MockLogin::Unreachable => Err(AuthError::network("mock", "connection refused")),
        }
    }

    async fn request_refresh(&self, _session: &SessionHandle) -> Result<(), RefreshError> {
        self.refresh_requests.fetch_add(1, Ordering::SeqCst);
        match &self.refresh {
            MockRefresh::RequestFails(message) => Err(RefreshError::remote("mock", message.clone())),
            _ => Ok(()),
        }
    }

    async fn is_refresh_complete(&self, _session: &SessionHandle) -> Result<bool, RefreshError> {
        let poll = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
        match &self.refresh {
            MockRefresh::CompleteAfter(n) => Ok(poll >= *n),
            MockRefresh::Never => Ok(false),
            MockRefresh::RequestFails(message) | MockRefresh::PollFails(message) => {
                Err(RefreshError::remote("mock", message.clone()))
            }
        }
    }
}
