//! Profile store

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;

use super::error::{ActivationStep, ProfileError, ProfileResult};
use super::fsutil::{replace_file, same_contents};
use super::record::{
    read_json, write_json, ActiveProfileRecord, ProfileStatus, SnapshotEntry, SnapshotManifest,
    BACKUP_DIR, MANIFEST_FILE, RECORD_FILE,
};
use crate::config::{ConfigFile, ProfilePaths};
use crate::logging::SharedLogger;
use crate::types::ProfileName;
use crate::{log_error, log_info, log_warn};

/// Result of a successful activation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activation {
    pub profile: ProfileName,
    pub steps: Vec<ActivationStep>,
}

/// Result of restoring the pre-activation snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackOutcome {
    /// Profile whose activation was undone
    pub profile: ProfileName,
    /// Targets written back from the snapshot
    pub restored: Vec<PathBuf>,
    /// Targets that did not exist before and were removed
    pub removed: Vec<PathBuf>,
}

/// Holds the profile definitions and performs activation
pub struct ProfileStore {
    profiles: HashMap<ProfileName, ProfilePaths>,
    state_dir: PathBuf,
    logger: SharedLogger,
}

impl ProfileStore {
    /// Build a store from configuration, resolving paths against `root`
    pub fn new(root: impl AsRef<Path>, config: &ConfigFile, logger: SharedLogger) -> Self {
        let root = root.as_ref();
        let profiles = ProfileName::ALL
            .iter()
            .map(|name| (*name, config.profile(*name).resolve(root)))
            .collect();
        Self {
            profiles,
            state_dir: root.join(&config.state_dir),
            logger,
        }
    }

    /// Resolved paths for a profile
    pub fn paths(&self, name: ProfileName) -> &ProfilePaths {
        // Every ProfileName is inserted in new()
        &self.profiles[&name]
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    fn backup_dir(&self) -> PathBuf {
        self.state_dir.join(BACKUP_DIR)
    }

    /// Activate a profile by name.
    ///
    /// Unknown names fail with [`ProfileError::InvalidProfile`] before any
    /// file is touched.
    pub fn activate(&self, name: &str) -> ProfileResult<Activation> {
        let profile: ProfileName = name.parse()?;
        self.activate_profile(profile)
    }

    /// Copy the profile's config and env files over the shared targets.
    pub fn activate_profile(&self, profile: ProfileName) -> ProfileResult<Activation> {
        let paths = self.paths(profile).clone();
        let plan = [
            (ActivationStep::Config, &paths.config_source, &paths.config_target),
            (ActivationStep::Env, &paths.env_source, &paths.env_target),
        ];

        for (_, source, _) in &plan {
            let meta = fs::metadata(source).map_err(|e| ProfileError::file("read", *source, e))?;
            if !meta.is_file() {
                return Err(ProfileError::file(
                    "read",
                    *source,
                    std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
                ));
            }
        }

        self.snapshot(profile, &paths)?;
        log_info!(self.logger, "Switching to {} configuration", profile);

        let mut completed = Vec::with_capacity(plan.len());
        for (step, source, target) in plan {
            if let Err(e) = replace_file(source, target) {
                let err = ProfileError::file("copy to", target, e);
                if completed.is_empty() {
                    log_error!(self.logger, "Activation of {} failed: {}", profile, err);
                    return Err(err);
                }
                log_error!(
                    self.logger,
                    "Activation of {} left mixed targets after {:?}: {}",
                    profile,
                    completed,
                    err
                );
                return Err(ProfileError::PartialActivation {
                    profile,
                    completed_steps: completed,
                    source: Box::new(err),
                });
            }
            log_info!(self.logger, "  {} -> {}", source.display(), target.display());
            completed.push(step);
        }

        let record = ActiveProfileRecord {
            profile,
            activated_at: Utc::now(),
        };
        if let Err(e) = write_json(&self.state_dir.join(RECORD_FILE), &record) {
            // Targets are already in place; the record is informational.
            log_warn!(self.logger, "Could not write active-profile record: {}", e);
        }

        Ok(Activation {
            profile,
            steps: completed,
        })
    }

    /// Capture the current targets before they are overwritten
    fn snapshot(&self, profile: ProfileName, paths: &ProfilePaths) -> ProfileResult<()> {
        let backup_dir = self.backup_dir();
        fs::create_dir_all(&backup_dir).map_err(|e| ProfileError::file("create", &backup_dir, e))?;

        let mut entries = Vec::new();
        for (step, target) in [
            (ActivationStep::Config, &paths.config_target),
            (ActivationStep::Env, &paths.env_target),
        ] {
            let entry = SnapshotEntry {
                step,
                target: target.clone(),
                existed: target.is_file(),
            };
            if entry.existed {
                let backup = entry.backup_path(&backup_dir);
                fs::copy(target, &backup).map_err(|e| ProfileError::file("back up", target, e))?;
            }
            entries.push(entry);
        }

        let manifest = SnapshotManifest {
            profile,
            taken_at: Utc::now(),
            entries,
        };
        write_json(&backup_dir.join(MANIFEST_FILE), &manifest)
    }

    /// Restore the targets captured before the most recent activation
    pub fn rollback(&self) -> ProfileResult<RollbackOutcome> {
        let backup_dir = self.backup_dir();
        let manifest: SnapshotManifest =
            read_json(&backup_dir.join(MANIFEST_FILE))?.ok_or(ProfileError::NoSnapshot)?;

        let mut outcome = RollbackOutcome {
            profile: manifest.profile,
            restored: Vec::new(),
            removed: Vec::new(),
        };
        for entry in &manifest.entries {
            if entry.existed {
                let backup = entry.backup_path(&backup_dir);
                replace_file(&backup, &entry.target)
                    .map_err(|e| ProfileError::file("restore", &entry.target, e))?;
                outcome.restored.push(entry.target.clone());
            } else if entry.target.exists() {
                fs::remove_file(&entry.target)
                    .map_err(|e| ProfileError::file("remove", &entry.target, e))?;
                outcome.removed.push(entry.target.clone());
            }
        }

        log_info!(
            self.logger,
            "Rolled back activation of {} ({} restored, {} removed)",
            manifest.profile,
            outcome.restored.len(),
            outcome.removed.len()
        );
        Ok(outcome)
    }

    /// Which profile is recorded as active and which one the targets match
    pub fn status(&self) -> ProfileResult<ProfileStatus> {
        let recorded: Option<ActiveProfileRecord> = read_json(&self.state_dir.join(RECORD_FILE))?;
        let detected = ProfileName::ALL.into_iter().find(|name| {
            let paths = self.paths(*name);
            same_contents(&paths.config_source, &paths.config_target)
                && same_contents(&paths.env_source, &paths.env_target)
        });
        Ok(ProfileStatus { recorded, detected })
    }
}

impl std::fmt::Debug for ProfileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileStore")
            .field("profiles", &self.profiles)
            .field("state_dir", &self.state_dir)
            .finish()
    }
}
