// crates/qubit-market-core/src/interfaces/mod.rs
// ============================================================================
// Module: Qubit Market Interfaces
// Description: Backend-agnostic interfaces for persistence and audit logging.
// Purpose: Define the contract surfaces used by the market engine.
// Dependencies: crate::{core, runtime}
// ============================================================================

//! ## Overview
//! Interfaces define how the market engine integrates with storage backends
//! and log pipelines without embedding backend-specific details.
//! Implementations must fail closed on missing or corrupted data.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use thiserror::Error;

use crate::core::LedgerState;
use crate::core::MarketId;
use crate::runtime::LedgerAuditEvent;

// ============================================================================
// SECTION: Ledger Store
// ============================================================================

/// Ledger store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("ledger store io error: {0}")]
    Io(String),
    /// Store data is corrupted or fails integrity checks.
    #[error("ledger store corruption: {0}")]
    Corrupt(String),
    /// Store data version is incompatible.
    #[error("ledger store version mismatch: {0}")]
    VersionMismatch(String),
    /// Store data is invalid.
    #[error("ledger store invalid data: {0}")]
    Invalid(String),
    /// Store reported an error.
    #[error("ledger store error: {0}")]
    Store(String),
    /// Another writer saved the market after the caller loaded it.
    #[error("ledger store conflict: expected {expected} operations, found {found}")]
    Conflict {
        /// Operation count the caller loaded.
        expected: u64,
        /// Operation count currently stored.
        found: u64,
    },
}

/// Ledger snapshot store for persistence.
pub trait LedgerStore {
    /// Loads the latest snapshot for a market.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn load(&self, market_id: &MarketId) -> Result<Option<LedgerState>, StoreError>;

    /// Saves a snapshot as the latest state of its market, provided the
    /// stored ledger still holds `expected_operations` operations (zero when
    /// nothing is stored). The check and the write are atomic, so of two
    /// writers that loaded the same snapshot only the first succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when the stored operation count
    /// differs from `expected_operations`, and [`StoreError`] when saving
    /// fails.
    fn save(&self, state: &LedgerState, expected_operations: u64) -> Result<(), StoreError>;
}

// ============================================================================
// SECTION: Audit Sink
// ============================================================================

/// Sink for structured ledger audit events.
pub trait AuditSink: Send + Sync {
    /// Records an audit event. Sinks must not fail the calling operation.
    fn record(&self, event: &LedgerAuditEvent);
}

impl<T: AuditSink + ?Sized> AuditSink for Arc<T> {
    fn record(&self, event: &LedgerAuditEvent) {
        (**self).record(event);
    }
}

impl<T: AuditSink + ?Sized> AuditSink for Box<T> {
    fn record(&self, event: &LedgerAuditEvent) {
        (**self).record(event);
    }
}
