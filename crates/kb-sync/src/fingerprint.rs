//! Content fingerprints for cheap equality checks.
//!
//! A fingerprint is the first 8 bytes of the SHA-256 of a document body,
//! hex encoded. It is only ever compared for equality against fingerprints
//! of the same document, never used for similarity.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Number of digest bytes kept (16 hex characters).
const FINGERPRINT_BYTES: usize = 8;

/// A short, stable digest of a document body.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute the fingerprint of a body. Metadata headers must be stripped first.
    pub fn of(body: &str) -> Self {
        let digest = Sha256::digest(body.as_bytes());
        Self(hex::encode(&digest[..FINGERPRINT_BYTES]))
    }

    /// Wrap a fingerprint read back from a header or the ledger.
    pub fn from_stored(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
