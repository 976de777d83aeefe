//! Finflow Core
//!
//! Environment profile switching, local service orchestration and provider
//! token rotation for the finflow project. The CLI is a thin layer over this
//! crate.
//!
//! ## Profiles
//!
//! A profile (`dev` or `prod`) is a pair of source files copied over the
//! shared targets the tooling reads (`supabase/config.toml`, `.env`):
//!
//! ```rust,ignore
//! use finflow_core::profiles::ProfileStore;
//!
//! let store = ProfileStore::new(&root, &config, logger);
//! let activation = store.activate("dev")?;
//! ```
//!
//! ## Rotation
//!
//! The rotation engine logs in to the provider with a one-time code, waits
//! for the provider's refresh job and publishes the session token:
//!
//! ```rust,ignore
//! use finflow_core::rotation::RotationEngine;
//!
//! let engine = RotationEngine::new(provider, publisher, logger);
//! let report = engine.rotate_and_publish(&challenge, "MONARCH_TOKEN", &cancel).await?;
//! ```

pub mod config;
pub mod logging;
pub mod process;
pub mod profiles;
pub mod providers;
pub mod rotation;
pub mod secrets;
pub mod types;

// Re-export commonly used types
pub use types::{AuthChallenge, CancellationToken, Credential, ProfileName, SessionHandle};

pub use config::{ConfigError, ConfigFile};

pub use logging::{Logger, NoOpLogger, SharedLogger, TracingLogger};

pub use profiles::{ProfileError, ProfileStore};

pub use process::{LocalStack, ProcessError, ProcessOrchestrator, ServiceMode, ServiceSpec};

pub use providers::{AuthError, MonarchProvider, Provider, RefreshError};

pub use rotation::{RotationEngine, RotationError, RotationReport, TotpGenerator};

pub use secrets::{CliSecretStore, MemorySecretStore, PublishError, SecretPublisher, SecretStore};
