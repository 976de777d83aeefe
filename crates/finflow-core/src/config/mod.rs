//! Workflow configuration
//!
//! A single optional YAML file (`finflow.yaml` in the project root). Every
//! section has defaults matching the project's conventional layout, so the
//! file only needs the values that differ.

mod error;
mod file;

pub use error::{ConfigError, ConfigResult};
pub use file::{
    ConfigFile, ProfilePaths, ProviderSettings, RotationSettings, SecretSettings,
    ServicesSettings, CONFIG_FILE_NAME,
};
