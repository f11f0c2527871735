// crates/qubit-market-store-sqlite/tests/sqlite_store.rs
// ============================================================================
// Module: SQLite Store Tests
// Description: Validate SQLite LedgerStore behavior.
// Purpose: Ensure durable persistence, integrity checks, and retention.
// Dependencies: qubit-market-store-sqlite, qubit-market-core, rusqlite, tempfile
// ============================================================================

//! ## Overview
//! Conformance tests for the SQLite-backed ledger store. Exercises durability
//! across reopen, tamper detection, size limits, retention, and engine
//! integration against a real database file.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::path::Path;
use std::thread;

use qubit_market_core::BlockHeight;
use qubit_market_core::CallContext;
use qubit_market_core::LedgerState;
use qubit_market_core::LedgerStore;
use qubit_market_core::MarketId;
use qubit_market_core::Market;
use qubit_market_core::MarketPolicy;
use qubit_market_core::NoopAuditSink;
use qubit_market_core::ProcessorId;
use qubit_market_core::RegisterProcessorRequest;
use qubit_market_core::StoreError;
use qubit_market_store_sqlite::SqliteJournalMode;
use qubit_market_store_sqlite::SqliteLedgerStore;
use qubit_market_store_sqlite::SqliteStoreConfig;
use qubit_market_store_sqlite::SqliteStoreError;
use qubit_market_store_sqlite::SqliteSyncMode;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds a ledger with `height` recorded as its latest block.
fn sample_state(market_id: &str, height: u64) -> LedgerState {
    let mut state = LedgerState::new(MarketId::new(market_id));
    state.last_block_height = Some(BlockHeight::new(height));
    state
}

/// Opens a store at `path` with default tuning.
fn store_for(path: &Path) -> SqliteLedgerStore {
    SqliteLedgerStore::new(SqliteStoreConfig::new(path)).unwrap()
}

// ============================================================================
// SECTION: Persistence
// ============================================================================

/// Tests a saved ledger loads back unchanged.
#[test]
fn sqlite_store_roundtrip() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("ledger.sqlite"));
    let state = sample_state("qubit", 7);

    store.save(&state, 0).unwrap();

    assert_eq!(store.load(&MarketId::new("qubit")).unwrap(), Some(state));
}

/// Tests unknown markets load as empty.
#[test]
fn sqlite_store_returns_none_for_missing_market() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("ledger.sqlite"));
    assert!(store.load(&MarketId::new("missing")).unwrap().is_none());
}

/// Tests data survives reopening the database.
#[test]
fn sqlite_store_persists_across_instances() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nested").join("ledger.sqlite");
    let state = sample_state("qubit", 3);
    {
        let store = store_for(&path);
        store.save(&state, 0).unwrap();
    }
    let store = store_for(&path);
    assert_eq!(store.load(&MarketId::new("qubit")).unwrap(), Some(state));
}

/// Tests the delete journal and normal sync modes are accepted.
#[test]
fn sqlite_store_supports_delete_journal_mode() {
    let temp = TempDir::new().unwrap();
    let config = SqliteStoreConfig {
        journal_mode: SqliteJournalMode::Delete,
        sync_mode: SqliteSyncMode::Normal,
        busy_timeout_ms: 250,
        ..SqliteStoreConfig::new(temp.path().join("ledger.sqlite"))
    };
    let store = SqliteLedgerStore::new(config).unwrap();
    store.save(&sample_state("qubit", 1), 0).unwrap();
    assert!(store.load(&MarketId::new("qubit")).unwrap().is_some());
}

// ============================================================================
// SECTION: Integrity
// ============================================================================

/// Tests tampered hashes fail closed.
#[test]
fn sqlite_store_detects_corrupt_hash() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("ledger.sqlite");
    let store = store_for(&path);
    store.save(&sample_state("qubit", 1), 0).unwrap();
    {
        let connection = rusqlite::Connection::open(&path).unwrap();
        connection
            .execute(
                "UPDATE ledger_versions SET ledger_hash = 'bad' WHERE market_id = ?1",
                rusqlite::params!["qubit"],
            )
            .unwrap();
    }
    let result = store.load(&MarketId::new("qubit"));
    assert!(matches!(result, Err(StoreError::Corrupt(_))));
}

/// Tests unknown hash algorithm labels are rejected.
#[test]
fn sqlite_store_rejects_unknown_hash_algorithm() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("ledger.sqlite");
    let store = store_for(&path);
    store.save(&sample_state("qubit", 1), 0).unwrap();
    {
        let connection = rusqlite::Connection::open(&path).unwrap();
        connection
            .execute("UPDATE ledger_versions SET hash_algorithm = 'md5'", rusqlite::params![])
            .unwrap();
    }
    assert!(matches!(store.load(&MarketId::new("qubit")), Err(StoreError::Invalid(_))));
}

/// Tests a dangling latest_version pointer is reported as corruption.
#[test]
fn sqlite_store_detects_missing_version_row() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("ledger.sqlite");
    let store = store_for(&path);
    store.save(&sample_state("qubit", 1), 0).unwrap();
    {
        let connection = rusqlite::Connection::open(&path).unwrap();
        connection
            .execute("UPDATE markets SET latest_version = 9 WHERE market_id = 'qubit'", [])
            .unwrap();
    }
    assert!(matches!(store.load(&MarketId::new("qubit")), Err(StoreError::Corrupt(_))));
}

/// Tests schema version drift is rejected on open.
#[test]
fn sqlite_store_rejects_version_mismatch() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("ledger.sqlite");
    let _store = store_for(&path);
    {
        let connection = rusqlite::Connection::open(&path).unwrap();
        connection.execute("UPDATE store_meta SET version = 999", []).unwrap();
    }
    let result = SqliteLedgerStore::new(SqliteStoreConfig::new(&path));
    assert!(matches!(result, Err(SqliteStoreError::VersionMismatch(_))));
}

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Tests snapshots above the size limit are refused on save.
#[test]
fn sqlite_store_rejects_oversized_state_on_save() {
    let temp = TempDir::new().unwrap();
    let config = SqliteStoreConfig {
        max_state_bytes: 64,
        ..SqliteStoreConfig::new(temp.path().join("ledger.sqlite"))
    };
    let store = SqliteLedgerStore::new(config).unwrap();
    let state = sample_state(&"m".repeat(128), 1);
    assert!(matches!(store.save(&state, 0), Err(StoreError::Invalid(_))));
}

/// Tests oversized stored rows are refused before they are read.
#[test]
fn sqlite_store_rejects_oversized_state_on_load() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("ledger.sqlite");
    store_for(&path).save(&sample_state("qubit", 1), 0).unwrap();
    let config = SqliteStoreConfig {
        max_state_bytes: 8,
        ..SqliteStoreConfig::new(&path)
    };
    let store = SqliteLedgerStore::new(config).unwrap();
    assert!(matches!(store.load(&MarketId::new("qubit")), Err(StoreError::Invalid(_))));
}

/// Tests invalid retention and path settings are rejected.
#[test]
fn sqlite_store_rejects_invalid_config() {
    let temp = TempDir::new().unwrap();
    let zero_retention = SqliteStoreConfig {
        max_versions: Some(0),
        ..SqliteStoreConfig::new(temp.path().join("ledger.sqlite"))
    };
    assert!(matches!(
        SqliteLedgerStore::new(zero_retention),
        Err(SqliteStoreError::Invalid(_))
    ));
    assert!(matches!(
        SqliteLedgerStore::new(SqliteStoreConfig::new(temp.path())),
        Err(SqliteStoreError::Invalid(_))
    ));
    let overlong = temp.path().join("x".repeat(300));
    assert!(matches!(
        SqliteLedgerStore::new(SqliteStoreConfig::new(overlong)),
        Err(SqliteStoreError::Invalid(_))
    ));
}

// ============================================================================
// SECTION: History
// ============================================================================

/// Tests retention keeps only the newest versions.
#[test]
fn sqlite_store_enforces_max_versions() {
    let temp = TempDir::new().unwrap();
    let config = SqliteStoreConfig {
        max_versions: Some(2),
        ..SqliteStoreConfig::new(temp.path().join("ledger.sqlite"))
    };
    let store = SqliteLedgerStore::new(config).unwrap();
    for height in 1..=4 {
        store.save(&sample_state("qubit", height), 0).unwrap();
    }

    let versions = store.versions(&MarketId::new("qubit")).unwrap();
    let numbers: Vec<u64> = versions.iter().map(|version| version.version).collect();
    assert_eq!(numbers, vec![3, 4]);
    assert_eq!(versions[1].block_height, Some(4));
    assert!(store.load_version(&MarketId::new("qubit"), 1).unwrap().is_none());
    assert_eq!(
        store.load_version(&MarketId::new("qubit"), 3).unwrap(),
        Some(sample_state("qubit", 3))
    );
    assert_eq!(store.load(&MarketId::new("qubit")).unwrap(), Some(sample_state("qubit", 4)));
}

/// Tests markets are isolated from each other.
#[test]
fn sqlite_store_isolates_markets() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("ledger.sqlite"));
    store.save(&sample_state("alpha", 1), 0).unwrap();
    store.save(&sample_state("beta", 2), 0).unwrap();
    store.save(&sample_state("beta", 3), 0).unwrap();

    assert_eq!(store.versions(&MarketId::new("alpha")).unwrap().len(), 1);
    assert_eq!(store.versions(&MarketId::new("beta")).unwrap().len(), 2);
    assert_eq!(store.load(&MarketId::new("alpha")).unwrap(), Some(sample_state("alpha", 1)));
}

// ============================================================================
// SECTION: Engine Integration
// ============================================================================

/// Tests the market engine persists operations through the SQLite store.
#[test]
fn sqlite_store_backs_market_engine() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("ledger.sqlite");
    let market_id = MarketId::new("qubit");
    let processor_id = {
        let market = Market::new(
            market_id.clone(),
            store_for(&path),
            NoopAuditSink,
            MarketPolicy::default(),
        )
        .unwrap();
        market
            .register_processor(&RegisterProcessorRequest {
                context: CallContext::new("ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM", 12),
                name: "Quantum Processor Alpha".to_string(),
                qubits: 64,
                error_rate: 5,
            })
            .unwrap()
    };

    let reopened =
        Market::new(market_id.clone(), store_for(&path), NoopAuditSink, MarketPolicy::default())
            .unwrap();
    assert!(reopened.is_processor_available(processor_id).unwrap());

    let store = store_for(&path);
    let versions = store.versions(&market_id).unwrap();
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].operation_count, 1);
    assert_eq!(versions[0].block_height, Some(12));
    assert_eq!(versions[0].ledger_hash, reopened.ledger_hash().unwrap());
}

// ============================================================================
// SECTION: Concurrent Writers
// ============================================================================

/// Tests a save based on an outdated load is refused through another handle.
#[test]
fn sqlite_store_rejects_save_from_stale_snapshot() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("ledger.sqlite");
    let market_id = MarketId::new("qubit");
    let first = store_for(&path);
    let second = store_for(&path);
    let stale = second.load(&market_id).unwrap();
    assert!(stale.is_none());

    let market =
        Market::new(market_id.clone(), first, NoopAuditSink, MarketPolicy::default()).unwrap();
    market
        .register_processor(&RegisterProcessorRequest {
            context: CallContext::new("ST1OWNER", 5),
            name: "alpha".to_string(),
            qubits: 8,
            error_rate: 1,
        })
        .unwrap();

    let result = second.save(&sample_state("qubit", 6), 0);
    assert!(matches!(
        result,
        Err(StoreError::Conflict {
            expected: 0,
            found: 1
        })
    ));
    let latest = second.load(&market_id).unwrap().unwrap();
    assert_eq!(latest.operations.len(), 1);
    assert_eq!(second.versions(&market_id).unwrap().len(), 1);
}

/// Tests engines on separate connections never lose accepted registrations.
#[test]
fn sqlite_store_keeps_every_accepted_write_across_connections() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("ledger.sqlite");
    let market_id = MarketId::new("qubit");
    drop(store_for(&path));

    let outcomes: Vec<Result<ProcessorId, String>> = thread::scope(|scope| {
        let workers: Vec<_> = (0 .. 4)
            .map(|worker| {
                let path = path.clone();
                let market_id = market_id.clone();
                scope.spawn(move || {
                    let market = Market::new(
                        market_id,
                        store_for(&path),
                        NoopAuditSink,
                        MarketPolicy::default(),
                    )
                    .unwrap();
                    (0 .. 10)
                        .map(|call| {
                            market
                                .register_processor(&RegisterProcessorRequest {
                                    context: CallContext::new(format!("ST1WORKER{worker}"), 1),
                                    name: format!("qpu-{worker}-{call}"),
                                    qubits: 8,
                                    error_rate: 1,
                                })
                                .map_err(|err| err.kind().to_string())
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        workers.into_iter().flat_map(|worker| worker.join().unwrap()).collect()
    });

    let accepted: Vec<ProcessorId> = outcomes.iter().filter_map(|o| o.clone().ok()).collect();
    assert!(!accepted.is_empty());
    for outcome in &outcomes {
        if let Err(kind) = outcome {
            assert_eq!(kind, "conflict");
        }
    }
    let unique: BTreeSet<u64> = accepted.iter().map(|id| id.get()).collect();
    assert_eq!(unique.len(), accepted.len());

    let ledger = store_for(&path).load(&market_id).unwrap().unwrap();
    assert_eq!(ledger.operations.len(), accepted.len());
    assert_eq!(ledger.processors.len(), accepted.len());
}
