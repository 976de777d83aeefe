//! Secret store backed by the backend platform's CLI

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;

use super::error::{PublishError, PublishResult};
use super::traits::SecretStore;
use crate::process::tokio_command;

const UNAUTHORIZED_MARKERS: &[&str] = &[
    "unauthorized",
    "401",
    "403",
    "access token",
    "not logged in",
    "supabase login",
];

const UNREACHABLE_MARKERS: &[&str] = &[
    "could not connect",
    "connection refused",
    "connection reset",
    "timed out",
    "timeout",
    "network",
    "dns",
    "no such host",
];

/// Publishes with `<program> secrets set NAME=value`
///
/// The value travels as a process argument and is never logged.
#[derive(Debug, Clone)]
pub struct CliSecretStore {
    program: String,
    working_dir: Option<PathBuf>,
}

impl CliSecretStore {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            working_dir: None,
        }
    }

    /// Run the CLI from the project root so it picks up the linked project
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

/// Map CLI diagnostics onto the publish error kinds
fn classify(name: &str, exit_code: Option<i32>, stderr: &str) -> PublishError {
    let lowered = stderr.to_lowercase();
    let message = match stderr.trim() {
        "" => match exit_code {
            Some(code) => format!("exited with code {}", code),
            None => "terminated by a signal".to_string(),
        },
        text => text.lines().last().unwrap_or(text).to_string(),
    };
    let name = name.to_string();

    if UNAUTHORIZED_MARKERS.iter().any(|m| lowered.contains(m)) {
        PublishError::Unauthorized { name, message }
    } else if UNREACHABLE_MARKERS.iter().any(|m| lowered.contains(m)) {
        PublishError::Unreachable { name, message }
    } else {
        PublishError::Rejected { name, message }
    }
}

#[async_trait]
impl SecretStore for CliSecretStore {
    fn name(&self) -> &str {
        "cli"
    }

    async fn store(&self, key: &str, value: &str) -> PublishResult<()> {
        let mut cmd = tokio_command(&self.program);
        cmd.arg("secrets")
            .arg("set")
            .arg(format!("{}={}", key, value))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        let output = cmd.output().await.map_err(|e| PublishError::Unreachable {
            name: key.to_string(),
            message: format!("could not run {}: {}", self.program, e),
        })?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(classify(key, output.status.code(), &stderr))
        }
    }
}
