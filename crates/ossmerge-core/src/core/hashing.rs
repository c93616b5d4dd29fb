// crates/ossmerge-core/src/core/hashing.rs
// ============================================================================
// Module: Canonical Checksums
// Description: RFC 8785 JSON canonicalization and SHA-256 checksums.
// Purpose: Provide stable change-detection digests for logs and records.
// Dependencies: serde, serde_jcs, sha2
// ============================================================================

//! ## Overview
//! Every checksum is computed over the RFC 8785 (JCS) canonical JSON form of a
//! value, so two logs with the same content hash identically regardless of map
//! insertion order. Consumers compare checksums to skip re-publishing records
//! whose validation log did not change between runs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

// ============================================================================
// SECTION: Checksum
// ============================================================================

/// Lowercase hex SHA-256 digest of a canonical JSON document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Checksum(String);

impl Checksum {
    /// Builds a checksum from raw digest bytes.
    #[must_use]
    pub fn from_digest(bytes: &[u8]) -> Self {
        Self(hex_encode(bytes))
    }

    /// Returns the hex form of the checksum.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when computing checksums.
#[derive(Debug, Error)]
pub enum HashError {
    /// JSON canonicalization failed.
    #[error("failed to canonicalize json: {0}")]
    Canonicalization(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the RFC 8785 canonical JSON bytes of a value.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when serialization fails.
pub fn canonical_json_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, HashError> {
    serde_jcs::to_vec(value).map_err(|err| HashError::Canonicalization(err.to_string()))
}

/// Computes the checksum of a serializable value.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when serialization fails.
pub fn checksum_of<T: Serialize + ?Sized>(value: &T) -> Result<Checksum, HashError> {
    let bytes = canonical_json_bytes(value)?;
    Ok(checksum_bytes(&bytes))
}

/// Computes the checksum of raw bytes.
#[must_use]
pub fn checksum_bytes(bytes: &[u8]) -> Checksum {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    Checksum::from_digest(&hasher.finalize())
}

/// Encodes bytes as a lowercase hex string.
fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[usize::from(byte >> 4)] as char);
        out.push(HEX[usize::from(byte & 0x0f)] as char);
    }
    out
}
