//! Environment profiles and their activation
//!
//! Activating a profile overwrites a shared config file and a shared env
//! file with that profile's copies. The targets are the source of truth for
//! which profile is active; an informational record is written next to the
//! snapshot of the previous targets so a half-finished activation can be
//! rolled back.

mod error;
mod fsutil;
mod record;
mod store;

pub use error::{ActivationStep, ProfileError, ProfileResult};
pub use record::{ActiveProfileRecord, ProfileStatus};
pub use store::{Activation, ProfileStore, RollbackOutcome};
