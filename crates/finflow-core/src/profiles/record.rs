//! Active-profile record and snapshot manifest persisted under the state dir

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::error::{ActivationStep, ProfileError, ProfileResult};
use crate::types::ProfileName;

pub(crate) const RECORD_FILE: &str = "active-profile.json";
pub(crate) const BACKUP_DIR: &str = "backup";
pub(crate) const MANIFEST_FILE: &str = "manifest.json";

/// The last fully successful activation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveProfileRecord {
    pub profile: ProfileName,
    pub activated_at: DateTime<Utc>,
}

/// What [`ProfileStore::status`](super::ProfileStore::status) reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileStatus {
    /// Record written by the last successful activation, if any
    pub recorded: Option<ActiveProfileRecord>,
    /// Profile whose sources match both targets byte for byte, if any
    pub detected: Option<ProfileName>,
}

impl ProfileStatus {
    /// The record and the target files agree
    pub fn in_sync(&self) -> bool {
        match (&self.recorded, self.detected) {
            (Some(record), Some(detected)) => record.profile == detected,
            _ => false,
        }
    }
}

/// One target captured before an activation overwrote it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SnapshotEntry {
    pub step: ActivationStep,
    pub target: PathBuf,
    /// Whether the target existed; if not, rollback removes it
    pub existed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SnapshotManifest {
    pub profile: ProfileName,
    pub taken_at: DateTime<Utc>,
    pub entries: Vec<SnapshotEntry>,
}

impl SnapshotEntry {
    pub fn backup_path(&self, backup_dir: &Path) -> PathBuf {
        backup_dir.join(format!("{}.bak", self.step))
    }
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> ProfileResult<Option<T>> {
    let content = match fs::read(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(ProfileError::file("read", path, e)),
    };
    serde_json::from_slice(&content)
        .map(Some)
        .map_err(|source| ProfileError::State {
            path: path.to_path_buf(),
            source,
        })
}

pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> ProfileResult<()> {
    let content = serde_json::to_vec_pretty(value).map_err(|source| ProfileError::State {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, content).map_err(|e| ProfileError::file("write", path, e))
}
