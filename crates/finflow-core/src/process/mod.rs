//! Local service processes
//!
//! Starts and stops the external tools that make up the local stack (backend
//! emulator, edge functions, frontend dev server). Each service declares how
//! it runs:
//!
//! - `Foreground`: the caller waits for it to finish
//! - `Background`: spawned and kept as a handle so it can be stopped later
//! - `Detached`: spawned in its own process group and forgotten
//!
//! ```rust,ignore
//! let orchestrator = ProcessOrchestrator::new(logger);
//! let stack = LocalStack::new(&root, &config.services);
//! orchestrator.run_best_effort(&stack.backend_stop()).await;
//! orchestrator.start_service(&stack.backend_start()).await?;
//! ```

mod command;
mod error;
mod orchestrator;
mod spec;

pub(crate) use command::tokio_command;
pub use error::{ProcessError, ProcessResult};
pub use orchestrator::{ProcessOrchestrator, ServiceHandle};
pub use spec::{LocalStack, ServiceMode, ServiceSpec};
