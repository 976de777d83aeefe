//! Rotation errors

use std::path::PathBuf;

use thiserror::Error;

use crate::providers::{AuthError, RefreshError};
use crate::secrets::PublishError;

#[derive(Error, Debug)]
pub enum RotationError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Refresh(#[from] RefreshError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    /// Cancelled outside the refresh wait
    #[error("Rotation cancelled")]
    Cancelled,

    /// Another process holds the rotation lock for this secret
    #[error("Another rotation of {name} is in progress")]
    Busy { name: String },

    #[error("Failed to take rotation lock {path}: {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RotationError {
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            RotationError::Cancelled | RotationError::Refresh(RefreshError::Cancelled)
        )
    }
}

pub type RotationResult<T> = Result<T, RotationError>;
