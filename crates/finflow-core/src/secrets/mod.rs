//! Secret publishing
//!
//! - `SecretStore` trait for anything that can hold a named secret
//! - `CliSecretStore` pushes secrets through the backend platform's CLI
//! - `MemorySecretStore` keeps them in process (tests, dry runs)
//! - `SecretPublisher` adds logging and a retry policy on top of a store

mod cli_store;
mod error;
mod memory_store;
mod publisher;
mod traits;

pub use cli_store::CliSecretStore;
pub use error::{PublishError, PublishResult};
pub use memory_store::MemorySecretStore;
pub use publisher::SecretPublisher;
pub use traits::{SecretStore, SharedSecretStore};
