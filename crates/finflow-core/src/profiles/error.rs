//! Profile store errors

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::{ProfileName, UnknownProfile};

/// One of the two file replacements an activation performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivationStep {
    Config,
    Env,
}

impl fmt::Display for ActivationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivationStep::Config => f.write_str("config"),
            ActivationStep::Env => f.write_str("env"),
        }
    }
}

/// Errors that can occur during profile operations
#[derive(Error, Debug)]
pub enum ProfileError {
    #[error(transparent)]
    InvalidProfile(#[from] UnknownProfile),

    #[error("{action} {}: {source}", .path.display())]
    File {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "Activation of '{profile}' stopped after {} of 2 steps; targets are mixed: {source}",
        .completed_steps.len()
    )]
    PartialActivation {
        profile: ProfileName,
        completed_steps: Vec<ActivationStep>,
        #[source]
        source: Box<ProfileError>,
    },

    #[error("No activation snapshot to roll back to")]
    NoSnapshot,

    #[error("Corrupt state file {}: {source}", .path.display())]
    State {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ProfileError {
    pub(crate) fn file(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::File {
            action,
            path: path.into(),
            source,
        }
    }
}

pub type ProfileResult<T> = Result<T, ProfileError>;
