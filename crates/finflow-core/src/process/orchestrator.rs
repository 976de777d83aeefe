//! Starting and stopping services

use std::collections::VecDeque;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr};
use tokio::task::JoinHandle;

use super::command::{tokio_command, CommandExt};
use super::error::{ProcessError, ProcessResult};
use super::spec::{ServiceMode, ServiceSpec};
use crate::logging::SharedLogger;
use crate::{log_debug, log_info, log_warn};

const DEFAULT_STARTUP_GRACE: Duration = Duration::from_millis(500);
const STDERR_TAIL_LINES: usize = 20;
const STOP_TIMEOUT: Duration = Duration::from_secs(5);
const DRAIN_TIMEOUT: Duration = Duration::from_millis(250);

/// Last lines of a child's stderr, shared with the task that reads it
#[derive(Clone, Default)]
struct StderrTail {
    lines: Arc<Mutex<VecDeque<String>>>,
}

impl StderrTail {
    fn push(&self, line: String) {
        let mut lines = self.lines.lock();
        if lines.len() == STDERR_TAIL_LINES {
            lines.pop_front();
        }
        lines.push_back(line);
    }

    fn snapshot(&self) -> Vec<String> {
        self.lines.lock().iter().cloned().collect()
    }

    /// Echo `stderr` to our own stderr while keeping the tail
    fn capture(stderr: ChildStderr) -> (Self, JoinHandle<()>) {
        let tail = Self::default();
        let writer = tail.clone();
        let task = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                eprintln!("{}", line);
                writer.push(line);
            }
        });
        (tail, task)
    }
}

enum HandleState {
    Running { child: Child, tail: StderrTail },
    Exited(Option<i32>),
    Detached,
}

/// A started service
pub struct ServiceHandle {
    name: String,
    mode: ServiceMode,
    pid: Option<u32>,
    state: HandleState,
}

impl ServiceHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> ServiceMode {
        self.mode
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Exit code if the service has finished and was observed doing so
    pub fn exit_code(&self) -> Option<i32> {
        match self.state {
            HandleState::Exited(code) => code,
            _ => None,
        }
    }

    /// Whether a supervised service is still alive. Detached services are
    /// not supervised and always report `false`.
    pub fn is_running(&mut self) -> bool {
        match &mut self.state {
            HandleState::Running { child, .. } => match child.try_wait() {
                Ok(None) => true,
                Ok(Some(status)) => {
                    self.state = HandleState::Exited(status.code());
                    false
                }
                Err(_) => false,
            },
            _ => false,
        }
    }
}

impl std::fmt::Debug for ServiceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.state {
            HandleState::Running { .. } => "running".to_string(),
            HandleState::Exited(code) => format!("exited({:?})", code),
            HandleState::Detached => "detached".to_string(),
        };
        f.debug_struct("ServiceHandle")
            .field("name", &self.name)
            .field("mode", &self.mode)
            .field("pid", &self.pid)
            .field("state", &state)
            .finish()
    }
}

/// Starts, stops and sequences service processes
pub struct ProcessOrchestrator {
    logger: SharedLogger,
    startup_grace: Duration,
}

impl ProcessOrchestrator {
    pub fn new(logger: SharedLogger) -> Self {
        Self {
            logger,
            startup_grace: DEFAULT_STARTUP_GRACE,
        }
    }

    /// A background service that exits non-zero within this window counts
    /// as a failed start
    pub fn with_startup_grace(mut self, grace: Duration) -> Self {
        self.startup_grace = grace;
        self
    }

    fn launch(&self, spec: &ServiceSpec) -> ProcessResult<Child> {
        let mut cmd = tokio_command(&spec.program);
        cmd.args(&spec.args);
        if let Some(dir) = &spec.working_dir {
            cmd.current_dir(dir);
        }

        match spec.mode {
            ServiceMode::Foreground => {
                cmd.stdin(Stdio::inherit())
                    .stdout(Stdio::inherit())
                    .stderr(Stdio::piped());
            }
            ServiceMode::Background => {
                cmd.stdin(Stdio::null())
                    .stdout(Stdio::inherit())
                    .stderr(Stdio::piped());
            }
            ServiceMode::Detached => {
                cmd.stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .own_process_group();
            }
        }

        log_debug!(self.logger, "Launching {}: {}", spec.name, spec.command_line());
        cmd.spawn().map_err(|source| ProcessError::Launch {
            service: spec.name.clone(),
            program: spec.program.clone(),
            source,
        })
    }

    /// Start a service according to its mode.
    ///
    /// Foreground services are waited on; background services are confirmed
    /// alive after the startup grace period; detached services only need to
    /// spawn.
    pub async fn start_service(&self, spec: &ServiceSpec) -> ProcessResult<ServiceHandle> {
        let mut child = self.launch(spec)?;
        let pid = child.id();
        let mut handle = ServiceHandle {
            name: spec.name.clone(),
            mode: spec.mode,
            pid,
            state: HandleState::Detached,
        };

        match spec.mode {
            ServiceMode::Detached => {
                log_info!(self.logger, "Started {} detached (pid {:?})", spec.name, pid);
                // Dropping the Child leaves the process running.
                drop(child);
            }
            ServiceMode::Foreground => {
                let (tail, reader) = Self::capture_stderr(&mut child);
                let status = child.wait().await.map_err(|source| ProcessError::Io {
                    service: spec.name.clone(),
                    source,
                })?;
                Self::drain(reader).await;
                self.check_status(spec, status, &tail)?;
                handle.state = HandleState::Exited(status.code());
            }
            ServiceMode::Background => {
                let (tail, reader) = Self::capture_stderr(&mut child);
                match tokio::time::timeout(self.startup_grace, child.wait()).await {
                    Ok(Ok(status)) => {
                        Self::drain(reader).await;
                        self.check_status(spec, status, &tail)?;
                        log_debug!(self.logger, "{} finished during startup", spec.name);
                        handle.state = HandleState::Exited(status.code());
                    }
                    Ok(Err(source)) => {
                        return Err(ProcessError::Io {
                            service: spec.name.clone(),
                            source,
                        })
                    }
                    Err(_) => {
                        log_info!(self.logger, "Started {} in background (pid {:?})", spec.name, pid);
                        handle.state = HandleState::Running { child, tail };
                    }
                }
            }
        }

        Ok(handle)
    }

    fn capture_stderr(child: &mut Child) -> (StderrTail, Option<JoinHandle<()>>) {
        match child.stderr.take() {
            Some(stderr) => {
                let (tail, task) = StderrTail::capture(stderr);
                (tail, Some(task))
            }
            None => (StderrTail::default(), None),
        }
    }

    /// Give the stderr reader a moment to see EOF; a grandchild holding the
    /// pipe open must not stall us.
    async fn drain(reader: Option<JoinHandle<()>>) {
        if let Some(reader) = reader {
            let _ = tokio::time::timeout(DRAIN_TIMEOUT, reader).await;
        }
    }

    fn check_status(&self, spec: &ServiceSpec, status: ExitStatus, tail: &StderrTail) -> ProcessResult<()> {
        if status.success() {
            return Ok(());
        }
        Err(ProcessError::Exit {
            service: spec.name.clone(),
            exit_code: status.code(),
            stderr_tail: tail.snapshot(),
        })
    }

    /// Stop a service. Never fails: a service that already exited, or one
    /// that was detached, is left alone; kill errors are logged.
    pub async fn stop_service(&self, handle: &mut ServiceHandle) {
        let state = std::mem::replace(&mut handle.state, HandleState::Exited(None));
        match state {
            HandleState::Running { mut child, tail } => match child.try_wait() {
                Ok(Some(status)) => {
                    log_debug!(self.logger, "{} had already exited", handle.name);
                    handle.state = HandleState::Exited(status.code());
                }
                Ok(None) => {
                    if let Err(e) = child.start_kill() {
                        log_warn!(self.logger, "Failed to stop {}: {}", handle.name, e);
                    }
                    match tokio::time::timeout(STOP_TIMEOUT, child.wait()).await {
                        Ok(Ok(status)) => {
                            log_info!(self.logger, "Stopped {}", handle.name);
                            handle.state = HandleState::Exited(status.code());
                        }
                        Ok(Err(e)) => {
                            log_warn!(self.logger, "Error waiting for {} to stop: {}", handle.name, e);
                        }
                        Err(_) => {
                            log_warn!(self.logger, "{} did not stop within {:?}", handle.name, STOP_TIMEOUT);
                            handle.state = HandleState::Running { child, tail };
                        }
                    }
                }
                Err(e) => {
                    log_warn!(self.logger, "Could not query {}: {}", handle.name, e);
                }
            },
            HandleState::Exited(code) => {
                log_debug!(self.logger, "{} is not running", handle.name);
                handle.state = HandleState::Exited(code);
            }
            HandleState::Detached => {
                log_debug!(self.logger, "{} is detached; not stopping it", handle.name);
                handle.state = HandleState::Detached;
            }
        }
    }

    /// Run a command whose failure only matters as a log line.
    ///
    /// Returns whether it succeeded.
    pub async fn run_best_effort(&self, spec: &ServiceSpec) -> bool {
        match self.start_service(spec).await {
            Ok(_) => true,
            Err(e) => {
                log_warn!(self.logger, "Ignoring failure of {}: {}", spec.name, e);
                false
            }
        }
    }

    /// Start a set of services so they end up running side by side.
    ///
    /// Background and detached services are launched first, each confirmed
    /// started; foreground services run afterwards, in order. If anything
    /// fails, background services started here are stopped again.
    pub async fn restart_local_stack(&self, services: &[ServiceSpec]) -> ProcessResult<Vec<ServiceHandle>> {
        let (foreground, others): (Vec<&ServiceSpec>, Vec<&ServiceSpec>) =
            services.iter().partition(|s| s.mode.is_foreground());

        let mut handles = Vec::with_capacity(services.len());
        for spec in others.into_iter().chain(foreground) {
            match self.start_service(spec).await {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    for handle in handles.iter_mut() {
                        self.stop_service(handle).await;
                    }
                    return Err(e);
                }
            }
        }
        Ok(handles)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::logging::{LogLevel, NoOpLogger, RecordingLogger};
    use tempfile::tempdir;

    fn sh(name: &str, script: &str, mode: ServiceMode) -> ServiceSpec {
        ServiceSpec::new(name, "sh").with_args(["-c", script]).with_mode(mode)
    }

    fn orchestrator() -> ProcessOrchestrator {
        ProcessOrchestrator::new(Arc::new(NoOpLogger::new())).with_startup_grace(Duration::from_millis(150))
    }

    #[tokio::test]
    async fn test_foreground_success() {
        let handle = orchestrator()
            .start_service(&sh("ok", "exit 0", ServiceMode::Foreground))
            .await
            .unwrap();
        assert_eq!(handle.exit_code(), Some(0));
    }

    #[tokio::test]
    async fn test_foreground_failure_reports_code_and_stderr() {
        let err = orchestrator()
            .start_service(&sh("bad", "echo first >&2; echo oops >&2; exit 3", ServiceMode::Foreground))
            .await
            .unwrap_err();
        match err {
            ProcessError::Exit {
                exit_code,
                stderr_tail,
                ..
            } => {
                assert_eq!(exit_code, Some(3));
                assert_eq!(stderr_tail, vec!["first".to_string(), "oops".to_string()]);
            }
            other => panic!("expected Exit, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_executable() {
        let spec = ServiceSpec::new("ghost", "finflow-definitely-not-installed");
        let err = orchestrator().start_service(&spec).await.unwrap_err();
        assert!(matches!(err, ProcessError::Launch { .. }));
    }

    #[tokio::test]
    async fn test_stderr_tail_is_bounded() {
        let err = orchestrator()
            .start_service(&sh(
                "noisy",
                "i=0; while [ $i -lt 30 ]; do echo line$i >&2; i=$((i+1)); done; exit 1",
                ServiceMode::Foreground,
            ))
            .await
            .unwrap_err();
        match err {
            ProcessError::Exit { stderr_tail, .. } => {
                assert_eq!(stderr_tail.len(), STDERR_TAIL_LINES);
                assert_eq!(stderr_tail.last().unwrap(), "line29");
            }
            other => panic!("expected Exit, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_background_start_and_stop() {
        let orchestrator = orchestrator();
        let mut handle = orchestrator
            .start_service(&sh("sleeper", "sleep 30", ServiceMode::Background))
            .await
            .unwrap();
        assert!(handle.is_running());
        assert!(handle.pid().is_some());

        orchestrator.stop_service(&mut handle).await;
        assert!(!handle.is_running());

        // Stopping again is a no-op
        orchestrator.stop_service(&mut handle).await;
        assert!(!handle.is_running());
    }

    #[tokio::test]
    async fn test_background_immediate_failure() {
        let err = orchestrator()
            .start_service(&sh("crash", "echo broken >&2; exit 1", ServiceMode::Background))
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), Some(1));
    }

    #[tokio::test]
    async fn test_background_stdin_is_closed() {
        // reads hit EOF at once instead of competing with the terminal
        let err = orchestrator()
            .start_service(&sh("reader", "cat >/dev/null; exit 5", ServiceMode::Background))
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), Some(5));
    }

    #[tokio::test]
    async fn test_detached_is_not_supervised() {
        let orchestrator = orchestrator();
        let mut handle = orchestrator
            .start_service(&sh("daemon", "sleep 1", ServiceMode::Detached))
            .await
            .unwrap();
        assert!(!handle.is_running());
        orchestrator.stop_service(&mut handle).await;
    }

    #[tokio::test]
    async fn test_best_effort_logs_and_continues() {
        let logger = Arc::new(RecordingLogger::new());
        let orchestrator = ProcessOrchestrator::new(logger.clone());
        let ok = orchestrator
            .run_best_effort(&sh("backend-stop", "exit 1", ServiceMode::Foreground))
            .await;
        assert!(!ok);
        assert_eq!(logger.messages_at(LogLevel::Warn).len(), 1);
    }

    #[tokio::test]
    async fn test_background_is_live_before_foreground_runs() {
        let dir = tempdir().unwrap();
        let marker = dir.path().join("bg-started");
        let marker = marker.to_str().unwrap();

        let services = vec![
            // Listed first but must not block the background one
            sh(
                "frontend",
                &format!(
                    "i=0; while [ $i -lt 20 ]; do [ -f {m} ] && exit 0; sleep 0.1; i=$((i+1)); done; exit 1",
                    m = marker
                ),
                ServiceMode::Foreground,
            ),
            sh("functions", &format!("touch {}; sleep 30", marker), ServiceMode::Background),
        ];

        let orchestrator = orchestrator();
        let mut handles = orchestrator.restart_local_stack(&services).await.unwrap();
        assert_eq!(handles[0].name(), "functions");
        assert!(handles[0].is_running());
        assert_eq!(handles[1].exit_code(), Some(0));

        for handle in handles.iter_mut() {
            orchestrator.stop_service(handle).await;
        }
        assert!(!handles[0].is_running());
    }

    #[tokio::test]
    async fn test_stack_failure_stops_background_services() {
        let services = vec![
            sh("functions", "sleep 30", ServiceMode::Background),
            sh("frontend", "exit 4", ServiceMode::Foreground),
        ];
        let err = orchestrator().restart_local_stack(&services).await.unwrap_err();
        assert_eq!(err.exit_code(), Some(4));
    }
}
