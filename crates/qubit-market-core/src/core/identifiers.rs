// crates/qubit-market-core/src/core/identifiers.rs
// ============================================================================
// Module: Qubit Market Identifiers
// Description: Canonical opaque identifiers for ledger entities and principals.
// Purpose: Provide strongly typed, serializable identifiers with stable wire forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! This module defines the canonical identifiers used throughout the ledger.
//! Entity identifiers are numeric, non-zero, and 1-based; they are assigned
//! sequentially per entity kind so that identifier `n` always names the
//! `n`-th record of that kind. Principals and market identifiers are opaque
//! strings on the wire.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::num::NonZeroU64;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum principal length in bytes.
pub const MAX_PRINCIPAL_LENGTH: usize = 128;

// ============================================================================
// SECTION: Numeric Identifiers
// ============================================================================

/// Declares a sequential, 1-based entity identifier.
macro_rules! sequential_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        ///
        /// # Invariants
        /// - Always >= 1 (non-zero, 1-based).
        /// - Identifier `n` maps to ledger slot `n - 1`.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(NonZeroU64);

        impl $name {
            #[doc = concat!("Creates a new ", $label, " identifier from a non-zero value.")]
            #[must_use]
            pub const fn new(id: NonZeroU64) -> Self {
                Self(id)
            }

            #[doc = concat!("Creates a ", $label, " identifier from a raw value (returns `None` if zero).")]
            #[must_use]
            pub fn from_raw(raw: u64) -> Option<Self> {
                NonZeroU64::new(raw).map(Self)
            }

            /// Returns the raw identifier value (always >= 1).
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0.get()
            }

            /// Returns the identifier assigned to the record stored at `index`.
            #[must_use]
            pub fn from_index(index: usize) -> Option<Self> {
                let raw = u64::try_from(index).ok()?.checked_add(1)?;
                Self::from_raw(raw)
            }

            /// Returns the ledger slot index for this identifier.
            #[must_use]
            pub fn to_index(self) -> Option<usize> {
                usize::try_from(self.0.get() - 1).ok()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.get().fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = IdentifierParseError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                value.trim().parse::<u64>().ok().and_then(Self::from_raw).ok_or_else(|| {
                    IdentifierParseError {
                        kind: $label,
                        value: value.to_string(),
                    }
                })
            }
        }
    };
}

/// Error returned when a textual identifier is not a positive integer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} identifier: {value}")]
pub struct IdentifierParseError {
    /// Identifier kind label.
    pub kind: &'static str,
    /// Rejected input.
    pub value: String,
}

sequential_id!(
    /// Quantum processor identifier.
    ProcessorId,
    "processor"
);
sequential_id!(
    /// Entangled processor group identifier.
    GroupId,
    "group"
);
sequential_id!(
    /// Parallel job identifier scoped to entangled groups.
    JobId,
    "job"
);
sequential_id!(
    /// Computation task identifier.
    TaskId,
    "task"
);
sequential_id!(
    /// Resource allocation identifier.
    AllocationId,
    "allocation"
);
sequential_id!(
    /// Computation result identifier.
    ResultId,
    "result"
);
sequential_id!(
    /// Result verification identifier.
    VerificationId,
    "verification"
);

// ============================================================================
// SECTION: Principals
// ============================================================================

/// Account principal issuing ledger calls.
///
/// # Invariants
/// - Opaque UTF-8 string; well-formedness is checked by the engine via
///   [`PrincipalId::is_well_formed`], not at construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(String);

impl PrincipalId {
    /// Creates a new principal identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true when the principal is non-empty, bounded, and free of
    /// whitespace or control characters.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        !self.0.is_empty()
            && self.0.len() <= MAX_PRINCIPAL_LENGTH
            && !self.0.chars().any(|ch| ch.is_whitespace() || ch.is_control())
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for PrincipalId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PrincipalId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Market identifier naming one ledger instance within a store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarketId(String);

impl MarketId {
    /// Creates a new market identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MarketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for MarketId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
