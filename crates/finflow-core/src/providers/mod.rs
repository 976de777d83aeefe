//! Financial-data providers
//!
//! A provider is where credentials are rotated against: it accepts a login
//! (email, password, one-time code), hands back a session token, and runs a
//! server-side refresh job that has to finish before the token is useful.
//!
//! The `MockProvider` is kept for testing purposes.

mod error;
mod mock;
mod monarch;
mod traits;

pub use error::{AuthError, RefreshError};
pub use mock::{MockLogin, MockProvider, MockRefresh};
pub use monarch::MonarchProvider;
pub use traits::{Provider, SharedProvider};
