//! Content-addressed keys for normalized source code

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Number of hash bytes kept in a fingerprint (128 bits).
pub const FINGERPRINT_BYTES: usize = 16;

/// Length of the hex rendering of a fingerprint.
pub const FINGERPRINT_HEX_LEN: usize = FINGERPRINT_BYTES * 2;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FingerprintError {
    #[error("fingerprint must be {expected} characters, got {actual}")]
    Length { expected: usize, actual: usize },

    #[error("fingerprint must be lowercase hexadecimal: {0:?}")]
    Alphabet(String),
}

/// Stable hash of normalized code, used as the cache key and as the
/// correlation key on both bus topics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Hash the UTF-8 bytes of already normalized code.
    pub fn of(normalized_code: &str) -> Self {
        let digest = blake3::hash(normalized_code.as_bytes());
        Self(hex::encode(&digest.as_bytes()[..FINGERPRINT_BYTES]))
    }

    /// Validate a fingerprint received from elsewhere (a bus payload, a store key).
    pub fn parse(value: &str) -> Result<Self, FingerprintError> {
        if value.len() != FINGERPRINT_HEX_LEN {
            return Err(FingerprintError::Length {
                expected: FINGERPRINT_HEX_LEN,
                actual: value.len(),
            });
        }
        if !value
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        {
            return Err(FingerprintError::Alphabet(value.to_string()));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = FingerprintError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Fingerprint> for String {
    fn from(fp: Fingerprint) -> Self {
        fp.0
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
