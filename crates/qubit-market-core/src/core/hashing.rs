// crates/qubit-market-core/src/core/hashing.rs
// ============================================================================
// Module: Qubit Market Canonical Hashing
// Description: RFC 8785 JSON canonicalization and content hashing utilities.
// Purpose: Provide deterministic digests for ledger snapshots and operations.
// Dependencies: serde, serde_jcs, sha2
// ============================================================================

//! ## Overview
//! Every digest in the ledger is taken over RFC 8785 (JCS) canonical JSON:
//! the snapshot digest, each operation's request and response hashes, and
//! the integrity hash a durable store keeps next to each saved version.
//! Algorithms are named by a stable label so stored digests remain readable
//! if more algorithms are added.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::fmt::Write as _;

use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

// ============================================================================
// SECTION: Algorithms
// ============================================================================

/// Digest algorithms the ledger can record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    /// SHA-256.
    Sha256,
}

/// Algorithm used when a policy does not name one.
pub const DEFAULT_HASH_ALGORITHM: HashAlgorithm = HashAlgorithm::Sha256;

impl HashAlgorithm {
    /// Stable label written alongside stored digests.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
        }
    }

    /// Resolves a stored label back to an algorithm.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        [Self::Sha256].into_iter().find(|algorithm| algorithm.label() == label)
    }

    /// Digests `bytes` with this algorithm.
    #[must_use]
    pub fn digest(self, bytes: &[u8]) -> HashDigest {
        let raw = match self {
            Self::Sha256 => Sha256::digest(bytes).to_vec(),
        };
        HashDigest {
            algorithm: self,
            value: to_hex(&raw),
        }
    }
}

// ============================================================================
// SECTION: Digests
// ============================================================================

/// A digest tagged with the algorithm that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashDigest {
    /// Producing algorithm.
    pub algorithm: HashAlgorithm,
    /// Lowercase hex digest.
    pub value: String,
}

impl HashDigest {
    /// Returns true when `bytes` digest to this value under the same algorithm.
    #[must_use]
    pub fn matches(&self, bytes: &[u8]) -> bool {
        self.algorithm.digest(bytes).value == self.value
    }
}

impl fmt::Display for HashDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm.label(), self.value)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failures while producing canonical ledger bytes.
#[derive(Debug, Error)]
pub enum HashError {
    /// The value could not be encoded as canonical JSON.
    #[error("canonical json encoding failed: {0}")]
    Encode(String),
    /// The encoded value is larger than the caller allows.
    #[error("canonical json is {size} bytes, limit is {limit}")]
    TooLarge {
        /// Allowed size in bytes.
        limit: usize,
        /// Encoded size in bytes.
        size: usize,
    },
}

// ============================================================================
// SECTION: Canonical Encoding
// ============================================================================

/// Encodes `value` as canonical JSON no larger than `limit` bytes.
///
/// # Errors
///
/// Returns [`HashError::Encode`] when serialization fails and
/// [`HashError::TooLarge`] when the encoding exceeds `limit`.
pub fn canonical_bytes<T: Serialize + ?Sized>(value: &T, limit: usize) -> Result<Vec<u8>, HashError> {
    let bytes = encode(value)?;
    if bytes.len() > limit {
        return Err(HashError::TooLarge {
            limit,
            size: bytes.len(),
        });
    }
    Ok(bytes)
}

/// Digests the canonical JSON encoding of `value`.
///
/// # Errors
///
/// Returns [`HashError::Encode`] when serialization fails.
pub fn digest_canonical<T: Serialize + ?Sized>(
    algorithm: HashAlgorithm,
    value: &T,
) -> Result<HashDigest, HashError> {
    Ok(algorithm.digest(&encode(value)?))
}

/// RFC 8785 encoding without a size bound.
fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, HashError> {
    serde_jcs::to_vec(value).map_err(|err| HashError::Encode(err.to_string()))
}

/// Lowercase hex rendering of raw digest bytes.
fn to_hex(raw: &[u8]) -> String {
    raw.iter().fold(String::with_capacity(raw.len() * 2), |mut out, byte| {
        let _ = write!(out, "{byte:02x}");
        out
    })
}
