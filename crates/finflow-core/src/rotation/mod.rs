//! Credential rotation
//!
//! Logs in to the provider with a one-time code, asks it to refresh account
//! data, waits (bounded, cancellable) for the refresh to finish, extracts
//! the session token and publishes it as a secret.
//!
//! ```rust,ignore
//! let engine = RotationEngine::new(provider, publisher, logger)
//!     .with_settings(&config.rotation)
//!     .with_lock_dir(config.state_dir());
//! let report = engine.rotate_and_publish(&challenge, "MONARCH_TOKEN", &cancel).await?;
//! ```

mod clock;
mod engine;
mod error;
mod lock;
mod state;
mod totp;

pub use clock::{Clock, FixedClock, SharedClock, SystemClock};
pub use engine::{RotationEngine, RotationReport};
pub use error::{RotationError, RotationResult};
pub use lock::{acquire as acquire_rotation_lock, lock_file_name, RotationGuard};
pub use state::RotationState;
pub use totp::{normalize_secret, TotpGenerator, TOTP_DIGITS, TOTP_PERIOD_SECS};
