//! Provider error types

use std::time::Duration;

use thiserror::Error;

/// Errors from logging in to a provider
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The provider answered with a login failure
    #[error("Login rejected by {provider}: {message}")]
    InvalidCredentials { provider: String, message: String },

    /// The one-time code was no longer accepted
    #[error("One-time code expired for {provider}: {message}")]
    ExpiredChallenge { provider: String, message: String },

    /// The provider could not be reached or answered with garbage
    #[error("Could not reach {provider}: {message}")]
    NetworkFailure { provider: String, message: String },

    /// The MFA secret is not valid base32
    #[error("Invalid MFA secret: {0}")]
    InvalidSecret(String),
}

impl AuthError {
    pub fn invalid_credentials(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidCredentials {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn expired_challenge(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExpiredChallenge {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn network(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NetworkFailure {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

/// Errors while asking a provider to refresh and waiting for it
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefreshError {
    #[error("Refresh did not complete within {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Refresh failed on {provider}: {message}")]
    RemoteFailure { provider: String, message: String },

    #[error("Refresh wait cancelled")]
    Cancelled,
}

impl RefreshError {
    pub fn remote(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RemoteFailure {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = AuthError::invalid_credentials("monarch", "bad mfa");
        assert_eq!(err.to_string(), "Login rejected by monarch: bad mfa");

        let err = RefreshError::Timeout(Duration::from_secs(300));
        assert_eq!(err.to_string(), "Refresh did not complete within 300s");
    }
}
