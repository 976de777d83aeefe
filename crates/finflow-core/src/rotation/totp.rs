//! Time-based one-time codes (RFC 6238)

use std::time::Duration;

use chrono::{DateTime, Utc};
use totp_rs::{Algorithm, Secret, TOTP};

use crate::providers::AuthError;

pub const TOTP_DIGITS: usize = 6;
pub const TOTP_PERIOD_SECS: u64 = 30;

/// Uppercase, without whitespace or `=` padding
pub fn normalize_secret(secret: &str) -> String {
    secret
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '=')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// HMAC-SHA1, 6 digits, 30 second windows
pub struct TotpGenerator {
    totp: TOTP,
}

impl TotpGenerator {
    /// Build a generator from a base32 secret
    pub fn new(secret: &str) -> Result<Self, AuthError> {
        let normalized = normalize_secret(secret);
        if normalized.is_empty() {
            return Err(AuthError::InvalidSecret("secret is empty".to_string()));
        }
        let bytes = Secret::Encoded(normalized)
            .to_bytes()
            .map_err(|e| AuthError::InvalidSecret(format!("{:?}", e)))?;

        Ok(Self {
            totp: TOTP::new_unchecked(Algorithm::SHA1, TOTP_DIGITS, 1, TOTP_PERIOD_SECS, bytes),
        })
    }

    /// Code valid at `at`
    pub fn code_at(&self, at: DateTime<Utc>) -> String {
        self.totp.generate(unix_seconds(at))
    }

    /// Time left in the window containing `at`; between 1 s and one period
    pub fn remaining(&self, at: DateTime<Utc>) -> Duration {
        let t = unix_seconds(at);
        Duration::from_secs(TOTP_PERIOD_SECS - t % TOTP_PERIOD_SECS)
    }
}

impl std::fmt::Debug for TotpGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TotpGenerator")
            .field("digits", &TOTP_DIGITS)
            .field("period", &TOTP_PERIOD_SECS)
            .finish_non_exhaustive()
    }
}

fn unix_seconds(at: DateTime<Utc>) -> u64 {
    at.timestamp().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    // base32("12345678901234567890"), the RFC 6238 SHA1 test key
    const RFC_SECRET: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_rfc6238_vectors() {
        let generator = TotpGenerator::new(RFC_SECRET).unwrap();
        assert_eq!(generator.code_at(at(59)), "287082");
        assert_eq!(generator.code_at(at(1_111_111_109)), "081804");
        assert_eq!(generator.code_at(at(1_111_111_111)), "050471");
        assert_eq!(generator.code_at(at(1_234_567_890)), "005924");
    }

    #[test]
    fn test_secret_normalization() {
        assert_eq!(normalize_secret("gezd gnbv\tgy3t==="), "GEZDGNBVGY3T");

        let messy = TotpGenerator::new("gezd gnbv gy3t qojq gezd gnbv gy3t qojq").unwrap();
        assert_eq!(messy.code_at(at(59)), "287082");
    }

    #[test]
    fn test_invalid_secret() {
        assert!(matches!(TotpGenerator::new("  "), Err(AuthError::InvalidSecret(_))));
        assert!(matches!(TotpGenerator::new("not*base32!"), Err(AuthError::InvalidSecret(_))));
    }

    #[test]
    fn test_remaining() {
        let generator = TotpGenerator::new(RFC_SECRET).unwrap();
        assert_eq!(generator.remaining(at(1_111_111_109)), Duration::from_secs(1));
        assert_eq!(generator.remaining(at(60)), Duration::from_secs(30));
    }
}
