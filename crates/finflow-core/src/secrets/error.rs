//! Publish errors

use thiserror::Error;

/// Why a secret could not be published
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    /// The store refused our credentials
    #[error("Not authorized to publish {name}: {message}")]
    Unauthorized { name: String, message: String },

    /// The store could not be reached; worth retrying
    #[error("Secret store unreachable while publishing {name}: {message}")]
    Unreachable { name: String, message: String },

    /// The store was reached and said no
    #[error("Secret store rejected {name}: {message}")]
    Rejected { name: String, message: String },
}

impl PublishError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, PublishError::Unreachable { .. })
    }

    /// Name of the secret that failed
    pub fn secret_name(&self) -> &str {
        match self {
            PublishError::Unauthorized { name, .. }
            | PublishError::Unreachable { name, .. }
            | PublishError::Rejected { name, .. } => name,
        }
    }
}

pub type PublishResult<T> = Result<T, PublishError>;
