//! Service descriptions

use std::path::{Path, PathBuf};

use crate::config::ServicesSettings;

/// How a service is run relative to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceMode {
    Foreground,
    Background,
    Detached,
}

impl ServiceMode {
    pub fn is_foreground(&self) -> bool {
        matches!(self, ServiceMode::Foreground)
    }
}

/// An external command to run as a named service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSpec {
    pub name: String,
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub mode: ServiceMode,
}

impl ServiceSpec {
    /// A foreground service with no arguments
    pub fn new(name: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            mode: ServiceMode::Foreground,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_mode(mut self, mode: ServiceMode) -> Self {
        self.mode = mode;
        self
    }

    /// `program arg1 arg2` for log lines
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// The project's local services, run from the project root
#[derive(Debug, Clone)]
pub struct LocalStack {
    root: PathBuf,
    backend: String,
    frontend: String,
}

impl LocalStack {
    pub fn new(root: impl AsRef<Path>, settings: &ServicesSettings) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            backend: settings.backend_program.clone(),
            frontend: settings.frontend_program.clone(),
        }
    }

    fn service(&self, name: &str, program: &str, args: &[&str], mode: ServiceMode) -> ServiceSpec {
        ServiceSpec::new(name, program)
            .with_args(args.iter().copied())
            .in_dir(&self.root)
            .with_mode(mode)
    }

    /// `supabase stop`
    pub fn backend_stop(&self) -> ServiceSpec {
        self.service("backend-stop", &self.backend, &["stop"], ServiceMode::Foreground)
    }

    /// `supabase start`; returns once the emulator is up
    pub fn backend_start(&self) -> ServiceSpec {
        self.service("backend", &self.backend, &["start"], ServiceMode::Foreground)
    }

    /// `supabase functions serve`, alongside the frontend
    pub fn edge_functions(&self) -> ServiceSpec {
        self.service(
            "edge-functions",
            &self.backend,
            &["functions", "serve"],
            ServiceMode::Background,
        )
    }

    /// `npm install`
    pub fn frontend_install(&self) -> ServiceSpec {
        self.service("frontend-install", &self.frontend, &["install"], ServiceMode::Foreground)
    }

    /// `npm run dev`
    pub fn frontend_dev(&self) -> ServiceSpec {
        self.service("frontend", &self.frontend, &["run", "dev"], ServiceMode::Foreground)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let spec = ServiceSpec::new("web", "npm")
            .with_args(["run", "dev"])
            .in_dir("/srv/app")
            .with_mode(ServiceMode::Background);
        assert_eq!(spec.command_line(), "npm run dev");
        assert_eq!(spec.working_dir, Some(PathBuf::from("/srv/app")));
        assert!(!spec.mode.is_foreground());
    }

    #[test]
    fn test_local_stack_commands() {
        let stack = LocalStack::new("/srv/app", &ServicesSettings::default());
        assert_eq!(stack.backend_stop().command_line(), "supabase stop");
        assert_eq!(stack.backend_start().command_line(), "supabase start");
        assert_eq!(stack.edge_functions().command_line(), "supabase functions serve");
        assert_eq!(stack.edge_functions().mode, ServiceMode::Background);
        assert_eq!(stack.frontend_install().command_line(), "npm install");
        assert_eq!(stack.frontend_dev().command_line(), "npm run dev");
        assert!(stack.frontend_dev().mode.is_foreground());
        assert_eq!(stack.backend_start().working_dir, Some(PathBuf::from("/srv/app")));
    }

    #[test]
    fn test_custom_programs() {
        let settings = ServicesSettings {
            backend_program: "/opt/supabase".to_string(),
            frontend_program: "pnpm".to_string(),
            ..ServicesSettings::default()
        };
        let stack = LocalStack::new(".", &settings);
        assert_eq!(stack.backend_start().program, "/opt/supabase");
        assert_eq!(stack.frontend_dev().command_line(), "pnpm run dev");
    }
}
