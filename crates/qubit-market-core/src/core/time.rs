// crates/qubit-market-core/src/core/time.rs
// ============================================================================
// Module: Qubit Market Time Model
// Description: Block-height clock for ledger operations.
// Purpose: Keep replay deterministic by using caller-supplied heights.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The ledger never reads wall-clock time. Every request carries the block
//! height at which it executes; entanglement windows and audit records are
//! computed from these explicit values.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Block Height
// ============================================================================

/// Logical block height supplied by callers.
///
/// # Invariants
/// - The engine rejects heights lower than the last accepted operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockHeight(u64);

impl BlockHeight {
    /// Creates a block height.
    #[must_use]
    pub const fn new(height: u64) -> Self {
        Self(height)
    }

    /// Returns the raw height.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Returns the number of blocks elapsed since `earlier`, or zero when
    /// `earlier` is in the future.
    #[must_use]
    pub const fn saturating_since(self, earlier: Self) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for BlockHeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
