//! File-based configuration (YAML)

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::{ConfigError, ConfigResult};
use crate::types::ProfileName;

/// Default config file name, looked up in the project root
pub const CONFIG_FILE_NAME: &str = "finflow.yaml";

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConfigFile {
    /// Per-profile path overrides; missing profiles use [`ProfilePaths::defaults_for`]
    pub profiles: HashMap<ProfileName, ProfilePaths>,

    /// Directory for the active-profile record, backups and locks
    pub state_dir: PathBuf,

    pub services: ServicesSettings,
    pub rotation: RotationSettings,
    pub provider: ProviderSettings,
    pub secrets: SecretSettings,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            profiles: HashMap::new(),
            state_dir: PathBuf::from(".finflow"),
            services: ServicesSettings::default(),
            rotation: RotationSettings::default(),
            provider: ProviderSettings::default(),
            secrets: SecretSettings::default(),
        }
    }
}

/// Source and target files for one profile, relative to the project root
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfilePaths {
    pub config_source: PathBuf,
    pub config_target: PathBuf,
    pub env_source: PathBuf,
    pub env_target: PathBuf,
}

impl ProfilePaths {
    /// `supabase/config.<name>.toml -> supabase/config.toml`, `.env.<name> -> .env`
    pub fn defaults_for(name: ProfileName) -> Self {
        Self {
            config_source: PathBuf::from(format!("supabase/config.{}.toml", name)),
            config_target: PathBuf::from("supabase/config.toml"),
            env_source: PathBuf::from(format!(".env.{}", name)),
            env_target: PathBuf::from(".env"),
        }
    }

    /// Resolve relative paths against `root`
    pub fn resolve(&self, root: &Path) -> Self {
        Self {
            config_source: root.join(&self.config_source),
            config_target: root.join(&self.config_target),
            env_source: root.join(&self.env_source),
            env_target: root.join(&self.env_target),
        }
    }
}

/// External tools used to run the local stack
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServicesSettings {
    /// Local backend emulator CLI
    pub backend_program: String,
    /// Frontend package manager
    pub frontend_program: String,
    /// How long a background service must stay alive to count as started
    pub startup_grace_ms: u64,
}

impl Default for ServicesSettings {
    fn default() -> Self {
        Self {
            backend_program: "supabase".to_string(),
            frontend_program: "npm".to_string(),
            startup_grace_ms: 500,
        }
    }
}

impl ServicesSettings {
    pub fn startup_grace(&self) -> Duration {
        Duration::from_millis(self.startup_grace_ms)
    }
}

/// Token rotation settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RotationSettings {
    /// Env file holding the provider login
    pub env_file: PathBuf,
    /// Name of the secret the rotated token is published under
    pub secret_name: String,
    /// Upper bound on waiting for the provider's refresh job
    pub refresh_timeout_secs: u64,
    /// First poll interval while waiting for the refresh job
    pub poll_initial_ms: u64,
    /// Poll interval cap
    pub poll_max_ms: u64,
    /// Retry once with a fresh code when the provider rejects an expired one
    pub retry_expired_challenge: bool,
}

impl Default for RotationSettings {
    fn default() -> Self {
        Self {
            env_file: PathBuf::from(".env.dev"),
            secret_name: "MONARCH_TOKEN".to_string(),
            refresh_timeout_secs: 300,
            poll_initial_ms: 1_000,
            poll_max_ms: 10_000,
            retry_expired_challenge: true,
        }
    }
}

impl RotationSettings {
    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh_timeout_secs)
    }

    pub fn poll_initial(&self) -> Duration {
        Duration::from_millis(self.poll_initial_ms)
    }

    pub fn poll_max(&self) -> Duration {
        Duration::from_millis(self.poll_max_ms)
    }
}

/// Remote provider endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProviderSettings {
    pub base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.monarchmoney.com".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl ProviderSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Secret store CLI and publish retry policy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SecretSettings {
    pub program: String,
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
}

impl Default for SecretSettings {
    fn default() -> Self {
        Self {
            program: "supabase".to_string(),
            max_attempts: 3,
            retry_delay_ms: 2_000,
        }
    }
}

impl SecretSettings {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl ConfigFile {
    /// Load config from `path`; a missing file yields the defaults
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: ConfigFile =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Load `finflow.yaml` from the project root
    pub fn load_from_root(root: impl AsRef<Path>) -> ConfigResult<Self> {
        Self::load(root.as_ref().join(CONFIG_FILE_NAME))
    }

    /// Paths for `name`, unresolved
    pub fn profile(&self, name: ProfileName) -> ProfilePaths {
        self.profiles
            .get(&name)
            .cloned()
            .unwrap_or_else(|| ProfilePaths::defaults_for(name))
    }

    /// Effective configuration as YAML
    pub fn to_yaml(&self) -> ConfigResult<String> {
        serde_yaml::to_string(self)
            .map_err(|e| ConfigError::Invalid(format!("Failed to serialize YAML: {}", e)))
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.rotation.secret_name.trim().is_empty() {
            return Err(ConfigError::Invalid("rotation.secret_name must not be empty".into()));
        }
        if self.rotation.refresh_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "rotation.refresh_timeout_secs must be greater than zero".into(),
            ));
        }
        if self.rotation.poll_initial_ms == 0 || self.rotation.poll_max_ms < self.rotation.poll_initial_ms {
            return Err(ConfigError::Invalid(
                "rotation.poll_initial_ms must be > 0 and <= rotation.poll_max_ms".into(),
            ));
        }
        if self.secrets.max_attempts == 0 {
            return Err(ConfigError::Invalid("secrets.max_attempts must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = ConfigFile::load_from_root(dir.path()).unwrap();
        assert_eq!(config, ConfigFile::default());
        assert_eq!(config.rotation.secret_name, "MONARCH_TOKEN");
        assert_eq!(config.rotation.refresh_timeout(), Duration::from_secs(300));
    }

    #[test]
    fn test_default_profile_paths() {
        let config = ConfigFile::default();
        let dev = config.profile(ProfileName::Dev);
        assert_eq!(dev.config_source, PathBuf::from("supabase/config.dev.toml"));
        assert_eq!(dev.config_target, PathBuf::from("supabase/config.toml"));
        assert_eq!(dev.env_source, PathBuf::from(".env.dev"));
        assert_eq!(dev.env_target, PathBuf::from(".env"));

        let prod = config.profile(ProfileName::Prod);
        assert_eq!(prod.env_source, PathBuf::from(".env.prod"));
    }

    #[test]
    fn test_partial_yaml_overrides() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"
profiles:
  dev:
    config_source: A.toml
    config_target: config.toml
    env_source: B.env
    env_target: .env
rotation:
  refresh_timeout_secs: 60
secrets:
  program: /usr/local/bin/supabase
"#,
        )
        .unwrap();

        let config = ConfigFile::load_from_root(dir.path()).unwrap();
        assert_eq!(config.profile(ProfileName::Dev).config_source, PathBuf::from("A.toml"));
        // Untouched profile still uses defaults
        assert_eq!(
            config.profile(ProfileName::Prod),
            ProfilePaths::defaults_for(ProfileName::Prod)
        );
        assert_eq!(config.rotation.refresh_timeout_secs, 60);
        assert_eq!(config.rotation.secret_name, "MONARCH_TOKEN");
        assert_eq!(config.secrets.program, "/usr/local/bin/supabase");
        assert_eq!(config.secrets.max_attempts, 3);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "rotation:\n  refresh_timeout_secs: 0\n").unwrap();
        assert!(matches!(ConfigFile::load(&path), Err(ConfigError::Invalid(_))));

        fs::write(&path, "rotation: [not, a, map]\n").unwrap();
        assert!(matches!(ConfigFile::load(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_resolve_against_root() {
        let paths = ProfilePaths::defaults_for(ProfileName::Dev).resolve(Path::new("/srv/app"));
        assert_eq!(paths.env_target, PathBuf::from("/srv/app/.env"));
    }

    #[test]
    fn test_yaml_output_is_reloadable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let yaml = ConfigFile::default().to_yaml().unwrap();
        assert!(yaml.contains("secret_name: MONARCH_TOKEN"));

        fs::write(&path, yaml).unwrap();
        assert_eq!(ConfigFile::load(&path).unwrap(), ConfigFile::default());
    }
}
