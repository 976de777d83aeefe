//! Logging abstractions for runtime-agnostic logging
//!
//! Components take an `Arc<dyn Logger>` so tests can run silently or record
//! what was logged; the CLI plugs in [`TracingLogger`].

mod traits;
mod noop;
mod recording;
mod tracing_logger;

pub use traits::{Logger, SharedLogger};
pub use noop::NoOpLogger;
pub use recording::{LogRecord, RecordingLogger};
pub use tracing_logger::TracingLogger;

/// Log level as seen by [`Logger`] implementations
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}
