//! Logger that forwards to `tracing`

use super::traits::Logger;

const COMPONENT: &str = "finflow";

/// A logger that emits `tracing` events tagged `component = "finflow"`
#[derive(Debug, Clone, Default)]
pub struct TracingLogger;

impl TracingLogger {
    pub fn new() -> Self {
        Self
    }
}

impl Logger for TracingLogger {
    fn debug(&self, message: &str) {
        tracing::debug!(component = COMPONENT, "{}", message);
    }

    fn info(&self, message: &str) {
        tracing::info!(component = COMPONENT, "{}", message);
    }

    fn warn(&self, message: &str) {
        tracing::warn!(component = COMPONENT, "{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!(component = COMPONENT, "{}", message);
    }
}
