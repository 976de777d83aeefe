//! Credentials flowing through a rotation: the login challenge, the session
//! returned by the provider and the token extracted from it.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Env-file keys holding the provider login
pub const EMAIL_KEY: &str = "MONARCH_EMAIL";
pub const PASSWORD_KEY: &str = "MONARCH_PASSWORD";
pub const MFA_SECRET_KEY: &str = "MONARCH_MFA_SECRET";

/// Static login material for the provider.
///
/// The one-time code is not part of the challenge; it is derived from
/// `mfa_secret` at the moment the login is submitted.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthChallenge {
    pub email: String,
    pub password: String,
    /// Base32 TOTP shared secret
    pub mfa_secret: String,
}

/// Errors loading an [`AuthChallenge`] from an env file
#[derive(Error, Debug)]
pub enum ChallengeLoadError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },

    #[error("Missing {} in {}", .missing.join(", "), .path.display())]
    Missing {
        path: PathBuf,
        missing: Vec<&'static str>,
    },
}

impl AuthChallenge {
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
        mfa_secret: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            mfa_secret: mfa_secret.into(),
        }
    }

    /// Read the challenge from a dotenv-style file without touching the
    /// process environment.
    pub fn from_env_file(path: impl AsRef<Path>) -> Result<Self, ChallengeLoadError> {
        let path = path.as_ref();
        let read_err = |source| ChallengeLoadError::Read {
            path: path.to_path_buf(),
            source,
        };

        let mut vars = HashMap::new();
        for item in dotenvy::from_path_iter(path).map_err(read_err)? {
            let (key, value) = item.map_err(read_err)?;
            vars.insert(key, value);
        }
        Self::from_vars(path, &vars)
    }

    fn from_vars(path: &Path, vars: &HashMap<String, String>) -> Result<Self, ChallengeLoadError> {
        let lookup = |key: &str| {
            vars.get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut missing = Vec::new();
        let email = lookup(EMAIL_KEY);
        let password = lookup(PASSWORD_KEY);
        let mfa_secret = lookup(MFA_SECRET_KEY);
        if email.is_none() {
            missing.push(EMAIL_KEY);
        }
        if password.is_none() {
            missing.push(PASSWORD_KEY);
        }
        if mfa_secret.is_none() {
            missing.push(MFA_SECRET_KEY);
        }

        match (email, password, mfa_secret) {
            (Some(email), Some(password), Some(mfa_secret)) => Ok(Self {
                email,
                password,
                mfa_secret,
            }),
            _ => Err(ChallengeLoadError::Missing {
                path: path.to_path_buf(),
                missing,
            }),
        }
    }
}

impl fmt::Debug for AuthChallenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthChallenge")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("mfa_secret", &"<redacted>")
            .finish()
    }
}

/// An authenticated session with the provider
#[derive(Clone)]
pub struct SessionHandle {
    provider: String,
    token: String,
}

impl SessionHandle {
    pub fn new(provider: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            token: token.into(),
        }
    }

    /// Name of the provider that issued the session
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Raw session token, sent as the `Authorization` header value
    pub fn token(&self) -> &str {
        &self.token
    }

    pub(crate) fn into_token(self) -> String {
        self.token
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("provider", &self.provider)
            .field("token", &mask(&self.token))
            .finish()
    }
}

/// A session token extracted after a completed refresh
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    value: String,
    issued_at: DateTime<Utc>,
}

impl Credential {
    pub fn new(value: impl Into<String>, issued_at: DateTime<Utc>) -> Self {
        Self {
            value: value.into(),
            issued_at,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// Value safe for logs: first four characters, rest hidden
    pub fn masked(&self) -> String {
        mask(&self.value)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("value", &self.masked())
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

fn mask(value: &str) -> String {
    let prefix: String = value.chars().take(4).collect();
    if value.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("{}****", prefix)
    }
}
