// crates/qubit-market-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Ledger Store
// Description: Durable LedgerStore backend using SQLite.
// Purpose: Persist market ledger snapshots with versioned history.
// Dependencies: qubit-market-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed [`LedgerStore`] implementation. Every
//! save appends a canonical JSON snapshot to a versioned history table, and
//! every load re-hashes the latest snapshot before trusting it.
//!
//! [`LedgerStore`]: qubit_market_core::LedgerStore

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::LedgerVersion;
pub use store::MAX_STATE_BYTES;
pub use store::SqliteJournalMode;
pub use store::SqliteLedgerStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteSyncMode;
