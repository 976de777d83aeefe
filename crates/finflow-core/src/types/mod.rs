//! Core types shared by the profile store, the rotation engine and the CLI.

mod cancellation;
mod credential;
mod profile;

pub use cancellation::CancellationToken;
pub use credential::{
    AuthChallenge, ChallengeLoadError, Credential, SessionHandle, EMAIL_KEY, MFA_SECRET_KEY,
    PASSWORD_KEY,
};
pub use profile::{ProfileName, UnknownProfile};
