// crates/qubit-market-core/src/runtime/store.rs
// ============================================================================
// Module: Qubit Market In-Memory Store
// Description: Simple in-memory ledger store for tests and examples.
// Purpose: Provide a deterministic store implementation without external deps.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! This module provides a simple in-memory implementation of [`LedgerStore`]
//! for tests and local demos, plus a shared wrapper for trait objects. It is
//! not intended for production use.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use crate::core::LedgerState;
use crate::core::MarketId;
use crate::interfaces::LedgerStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// In-memory ledger store for tests and examples.
#[derive(Debug, Default, Clone)]
pub struct InMemoryLedgerStore {
    /// Ledger snapshots keyed by market identifier.
    ledgers: Arc<Mutex<BTreeMap<String, LedgerState>>>,
}

impl InMemoryLedgerStore {
    /// Creates a new in-memory ledger store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ledgers: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn load(&self, market_id: &MarketId) -> Result<Option<LedgerState>, StoreError> {
        let guard = self
            .ledgers
            .lock()
            .map_err(|_| StoreError::Store("ledger store mutex poisoned".to_string()))?;
        Ok(guard.get(market_id.as_str()).cloned())
    }

    fn save(&self, state: &LedgerState, expected_operations: u64) -> Result<(), StoreError> {
        let mut guard = self
            .ledgers
            .lock()
            .map_err(|_| StoreError::Store("ledger store mutex poisoned".to_string()))?;
        let found = guard.get(state.market_id.as_str()).map_or(0, LedgerState::operation_count);
        if found != expected_operations {
            return Err(StoreError::Conflict {
                expected: expected_operations,
                found,
            });
        }
        guard.insert(state.market_id.as_str().to_string(), state.clone());
        Ok(())
    }
}

// ============================================================================
// SECTION: Shared Store Wrapper
// ============================================================================

/// Shared ledger store backed by an `Arc` trait object.
#[derive(Clone)]
pub struct SharedLedgerStore {
    /// Inner store implementation.
    inner: Arc<dyn LedgerStore + Send + Sync>,
}

impl SharedLedgerStore {
    /// Wraps a ledger store in a shared, clonable wrapper.
    #[must_use]
    pub fn from_store(store: impl LedgerStore + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }

    /// Wraps an existing shared store.
    #[must_use]
    pub const fn new(store: Arc<dyn LedgerStore + Send + Sync>) -> Self {
        Self {
            inner: store,
        }
    }
}

impl LedgerStore for SharedLedgerStore {
    fn load(&self, market_id: &MarketId) -> Result<Option<LedgerState>, StoreError> {
        self.inner.load(market_id)
    }

    fn save(&self, state: &LedgerState, expected_operations: u64) -> Result<(), StoreError> {
        self.inner.save(state, expected_operations)
    }
}
