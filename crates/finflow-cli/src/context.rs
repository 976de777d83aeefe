use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use finflow_core::config::CONFIG_FILE_NAME;
use finflow_core::{ConfigFile, LocalStack, ProcessOrchestrator, ProfileStore, SharedLogger, TracingLogger};

use crate::cli::Cli;

/// Everything a command needs: where the project is and how it is configured
pub struct AppContext {
    pub root: PathBuf,
    pub config: ConfigFile,
    pub logger: SharedLogger,
}

impl AppContext {
    pub fn load(cli: &Cli) -> Result<Self> {
        let root = match &cli.root {
            Some(root) => root.clone(),
            None => std::env::current_dir().context("Failed to determine the current directory")?,
        };
        let config_path = cli.config.clone().unwrap_or_else(|| root.join(CONFIG_FILE_NAME));
        let config = ConfigFile::load(&config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

        Ok(Self {
            root,
            config,
            logger: Arc::new(TracingLogger::new()),
        })
    }

    pub fn state_dir(&self) -> PathBuf {
        self.root.join(&self.config.state_dir)
    }

    /// Resolve a path from the command line or config against the root
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }

    pub fn profile_store(&self) -> ProfileStore {
        ProfileStore::new(&self.root, &self.config, self.logger.clone())
    }

    pub fn orchestrator(&self) -> ProcessOrchestrator {
        ProcessOrchestrator::new(self.logger.clone()).with_startup_grace(self.config.services.startup_grace())
    }

    pub fn stack(&self) -> LocalStack {
        LocalStack::new(&self.root, &self.config.services)
    }
}
