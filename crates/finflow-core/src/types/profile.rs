//! Profile names

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The fixed set of environment profiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileName {
    Dev,
    Prod,
}

/// Returned when a string is not one of the known profile names
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown profile '{0}' (expected one of: dev, prod)")]
pub struct UnknownProfile(pub String);

impl ProfileName {
    pub const ALL: [ProfileName; 2] = [ProfileName::Dev, ProfileName::Prod];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileName::Dev => "dev",
            ProfileName::Prod => "prod",
        }
    }
}

impl fmt::Display for ProfileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileName {
    type Err = UnknownProfile;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dev" => Ok(ProfileName::Dev),
            "prod" => Ok(ProfileName::Prod),
            _ => Err(UnknownProfile(s.to_string())),
        }
    }
}
