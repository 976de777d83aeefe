//! Provider trait definition

use std::sync::Arc;

use async_trait::async_trait;

use super::error::{AuthError, RefreshError};
use crate::types::SessionHandle;

/// A financial-data provider whose session token we rotate
///
/// Refresh is a server-side job: `request_refresh` starts it and
/// `is_refresh_complete` is polled until it reports done.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Get the provider name (e.g., "monarch")
    fn name(&self) -> &str;

    /// Log in with a freshly computed one-time `code`
    async fn login(&self, email: &str, password: &str, code: &str) -> Result<SessionHandle, AuthError>;

    /// Ask the provider to start refreshing account data
    async fn request_refresh(&self, session: &SessionHandle) -> Result<(), RefreshError>;

    /// One completion check for the refresh job
    async fn is_refresh_complete(&self, session: &SessionHandle) -> Result<bool, RefreshError>;
}

pub type SharedProvider = Arc<dyn Provider>;
