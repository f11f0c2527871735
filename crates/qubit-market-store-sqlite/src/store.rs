// crates/qubit-market-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Ledger Store
// Description: Durable LedgerStore backed by SQLite.
// Purpose: Persist ledger snapshots with deterministic serialization.
// Dependencies: qubit-market-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! This module implements a durable [`LedgerStore`] using `SQLite`. Each save
//! appends the canonical JSON of the full ledger to `ledger_versions` and
//! advances the market's `latest_version` pointer in the same transaction.
//! Rows record the ledger's logical block height rather than wall-clock time.
//! Loads verify the stored digest and fail closed on any mismatch.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use qubit_market_core::HashAlgorithm;
use qubit_market_core::HashDigest;
use qubit_market_core::HashError;
use qubit_market_core::LedgerState;
use qubit_market_core::LedgerStore;
use qubit_market_core::MarketId;
use qubit_market_core::StoreError;
use qubit_market_core::hashing::DEFAULT_HASH_ALGORITHM;
use qubit_market_core::hashing::canonical_bytes;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Transaction;
use rusqlite::TransactionBehavior;
use rusqlite::params;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Schema revision recorded in `store_meta`.
const LEDGER_SCHEMA: i64 = 1;
/// Milliseconds a connection waits on a locked database.
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Longest accepted file or directory name in the database path.
const MAX_PATH_COMPONENT_BYTES: usize = 255;
/// Longest accepted database path.
const MAX_PATH_BYTES: usize = 4096;
/// Default ceiling on one canonical ledger snapshot (8 MiB).
pub const MAX_STATE_BYTES: usize = 8 * 1024 * 1024;

// ============================================================================
// SECTION: Config
// ============================================================================

/// Journal mode applied when the ledger database is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteJournalMode {
    /// Write-ahead log; readers do not block the single writer.
    #[default]
    Wal,
    /// Rollback journal removed after each commit.
    Delete,
}

impl SqliteJournalMode {
    /// Value for `PRAGMA journal_mode`.
    #[must_use]
    pub const fn pragma(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// Durability level for committed ledger versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Sync on every commit.
    #[default]
    Full,
    /// Sync at checkpoints only.
    Normal,
}

impl SqliteSyncMode {
    /// Value for `PRAGMA synchronous`.
    #[must_use]
    pub const fn pragma(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Where the ledger database lives and how it is tuned.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Database file; parent directories are created on open.
    pub path: PathBuf,
    /// Lock wait before a write gives up, in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// Journal mode.
    #[serde(default)]
    pub journal_mode: SqliteJournalMode,
    /// Commit durability.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
    /// Newest versions kept per market; `None` keeps the full history.
    #[serde(default)]
    pub max_versions: Option<u64>,
    /// Largest canonical snapshot accepted on save or load.
    #[serde(default = "default_max_state_bytes")]
    pub max_state_bytes: usize,
}

impl SqliteStoreConfig {
    /// Creates a config for `path` with default tuning.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteJournalMode::default(),
            sync_mode: SqliteSyncMode::default(),
            max_versions: None,
            max_state_bytes: MAX_STATE_BYTES,
        }
    }
}

/// Serde default for `busy_timeout_ms`.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

/// Serde default for `max_state_bytes`.
const fn default_max_state_bytes() -> usize {
    MAX_STATE_BYTES
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failures raised by the ledger database.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Filesystem failure around the database file.
    #[error("ledger database io failure: {0}")]
    Io(String),
    /// `SQLite` reported an error.
    #[error("ledger database error: {0}")]
    Db(String),
    /// A stored version failed its integrity check or a pointer dangles.
    #[error("ledger database corrupt: {0}")]
    Corrupt(String),
    /// The file was written by a different schema revision.
    #[error("ledger database schema mismatch: {0}")]
    VersionMismatch(String),
    /// Rejected configuration or undecodable row.
    #[error("ledger database rejected input: {0}")]
    Invalid(String),
    /// Another writer appended a version after the caller loaded the ledger.
    #[error("ledger database conflict: expected {expected} operations, found {found}")]
    Conflict {
        /// Operation count the caller loaded.
        expected: u64,
        /// Operation count of the stored latest version.
        found: u64,
    },
    /// A snapshot is larger than `max_state_bytes`.
    #[error("ledger snapshot is {size} bytes, limit is {limit}")]
    TooLarge {
        /// Configured ceiling.
        limit: usize,
        /// Snapshot size.
        size: usize,
    },
}

impl From<rusqlite::Error> for SqliteStoreError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Db(error.to_string())
    }
}

impl From<HashError> for SqliteStoreError {
    fn from(error: HashError) -> Self {
        match error {
            HashError::TooLarge {
                limit,
                size,
            } => Self::TooLarge {
                limit,
                size,
            },
            HashError::Encode(message) => Self::Invalid(message),
        }
    }
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        let message = error.to_string();
        match error {
            SqliteStoreError::Io(_) => Self::Io(message),
            SqliteStoreError::Db(_) => Self::Store(message),
            SqliteStoreError::Corrupt(_) => Self::Corrupt(message),
            SqliteStoreError::VersionMismatch(_) => Self::VersionMismatch(message),
            SqliteStoreError::Conflict {
                expected,
                found,
            } => Self::Conflict {
                expected,
                found,
            },
            SqliteStoreError::Invalid(_) | SqliteStoreError::TooLarge {
                ..
            } => Self::Invalid(message),
        }
    }
}

// ============================================================================
// SECTION: History
// ============================================================================

/// Metadata for one retained ledger version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerVersion {
    /// 1-based version number within the market.
    pub version: u64,
    /// Ledger height when the version was written.
    pub block_height: Option<u64>,
    /// Operation count recorded in the snapshot.
    pub operation_count: u64,
    /// Digest of the canonical snapshot.
    pub ledger_hash: HashDigest,
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Versioned ledger history in a single `SQLite` file.
///
/// Clones share one connection; every save and load runs in its own
/// transaction under the connection mutex.
#[derive(Clone)]
pub struct SqliteLedgerStore {
    /// Tuning and limits fixed at open.
    config: SqliteStoreConfig,
    /// The only connection to the database.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteLedgerStore {
    /// Opens (creating if needed) the ledger database described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Invalid`] for a zero retention or size
    /// limit or an unusable path, [`SqliteStoreError::VersionMismatch`] for a
    /// file from another schema revision, and [`SqliteStoreError::Db`] when
    /// `SQLite` cannot open it.
    pub fn new(config: SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        check_limits(&config)?;
        check_database_path(&config.path)?;
        create_parent_dirs(&config.path)?;
        let mut connection = connect(&config)?;
        prepare_schema(&mut connection)?;
        Ok(Self {
            config,
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Lists retained versions for a market, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the query fails or rows are invalid.
    pub fn versions(&self, market_id: &MarketId) -> Result<Vec<LedgerVersion>, SqliteStoreError> {
        let guard = self.lock()?;
        let mut statement = guard.prepare(
            "SELECT version, block_height, operation_count, ledger_hash, hash_algorithm FROM \
             ledger_versions WHERE market_id = ?1 ORDER BY version ASC",
        )?;
        let rows = statement.query_map(params![market_id.as_str()], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, Option<i64>>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;
        let mut versions = Vec::new();
        for row in rows {
            let (version, block_height, operation_count, hash, algorithm) = row?;
            versions.push(LedgerVersion {
                version: non_negative("version", version)?,
                block_height: block_height
                    .map(|height| non_negative("block_height", height))
                    .transpose()?,
                operation_count: non_negative("operation_count", operation_count)?,
                ledger_hash: HashDigest {
                    algorithm: parse_hash_algorithm(&algorithm)?,
                    value: hash,
                },
            });
        }
        Ok(versions)
    }

    /// Loads a specific retained version of a market ledger.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the row fails integrity checks.
    pub fn load_version(
        &self,
        market_id: &MarketId,
        version: u64,
    ) -> Result<Option<LedgerState>, SqliteStoreError> {
        let version = i64::try_from(version)
            .map_err(|_| SqliteStoreError::Invalid("version out of range".to_string()))?;
        let row = {
            let mut guard = self.lock()?;
            let tx = guard.transaction()?;
            let row = read_version(&tx, market_id, version, self.config.max_state_bytes)?;
            tx.commit()?;
            row
        };
        row.map(|row| decode_snapshot(market_id, row)).transpose()
    }

    /// Locks the shared connection.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection.lock().map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))
    }

    /// Loads the latest ledger for the provided market.
    fn load_state(&self, market_id: &MarketId) -> Result<Option<LedgerState>, SqliteStoreError> {
        let row = {
            let mut guard = self.lock()?;
            let tx = guard.transaction()?;
            let row = match latest_version(&tx, market_id)? {
                Some(version) => {
                    let row = read_version(&tx, market_id, version, self.config.max_state_bytes)?;
                    if row.is_none() {
                        return Err(SqliteStoreError::Corrupt(format!(
                            "missing ledger version {version} for market {market_id}"
                        )));
                    }
                    row
                }
                None => None,
            };
            tx.commit()?;
            row
        };
        row.map(|row| decode_snapshot(market_id, row)).transpose()
    }

    /// Appends a new ledger version for the snapshot's market.
    ///
    /// The transaction is opened `IMMEDIATE` so the write lock is held while
    /// the stored operation count is compared with `expected_operations`;
    /// handles in other processes wait on `busy_timeout_ms` instead of
    /// racing the comparison.
    fn save_state(
        &self,
        state: &LedgerState,
        expected_operations: u64,
    ) -> Result<(), SqliteStoreError> {
        let canonical_json = canonical_bytes(state, self.config.max_state_bytes)?;
        let digest = DEFAULT_HASH_ALGORITHM.digest(&canonical_json);
        let block_height = state
            .last_block_height
            .map(|height| {
                i64::try_from(height.get()).map_err(|_| {
                    SqliteStoreError::Invalid("block height exceeds storage range".to_string())
                })
            })
            .transpose()?;
        let operation_count = i64::try_from(state.operations.len())
            .map_err(|_| SqliteStoreError::Invalid("operation count overflow".to_string()))?;
        let market_id = &state.market_id;
        let mut guard = self.lock()?;
        let tx = guard.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let latest = latest_version(&tx, market_id)?;
        let found = match latest {
            Some(version) => stored_operation_count(&tx, market_id, version)?,
            None => 0,
        };
        if found != expected_operations {
            return Err(SqliteStoreError::Conflict {
                expected: expected_operations,
                found,
            });
        }
        let next_version = match latest {
            None => 1,
            Some(value) => value.checked_add(1).ok_or_else(|| {
                SqliteStoreError::Corrupt(format!("ledger version overflow for market {market_id}"))
            })?,
        };
        tx.execute(
            "INSERT INTO markets (market_id, latest_version) VALUES (?1, ?2) ON CONFLICT(market_id) \
             DO UPDATE SET latest_version = excluded.latest_version",
            params![market_id.as_str(), next_version],
        )?;
        tx.execute(
            "INSERT INTO ledger_versions (market_id, version, ledger_json, ledger_hash, \
             hash_algorithm, block_height, operation_count) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                market_id.as_str(),
                next_version,
                canonical_json,
                digest.value,
                digest.algorithm.label(),
                block_height,
                operation_count
            ],
        )?;
        prune_versions(&tx, market_id, next_version, self.config.max_versions)?;
        tx.commit()?;
        Ok(())
    }
}

impl LedgerStore for SqliteLedgerStore {
    fn load(&self, market_id: &MarketId) -> Result<Option<LedgerState>, StoreError> {
        self.load_state(market_id).map_err(StoreError::from)
    }

    fn save(&self, state: &LedgerState, expected_operations: u64) -> Result<(), StoreError> {
        self.save_state(state, expected_operations).map_err(StoreError::from)
    }
}

// ============================================================================
// SECTION: Row Access
// ============================================================================

/// Raw snapshot row: canonical bytes, stored hash, and algorithm label.
type SnapshotRow = (Vec<u8>, String, String);

/// Returns the latest version pointer for a market.
fn latest_version(
    tx: &Transaction<'_>,
    market_id: &MarketId,
) -> Result<Option<i64>, SqliteStoreError> {
    let latest: Option<i64> = tx
        .query_row(
            "SELECT latest_version FROM markets WHERE market_id = ?1",
            params![market_id.as_str()],
            |row| row.get(0),
        )
        .optional()?;
    match latest {
        Some(value) if value < 1 => Err(SqliteStoreError::Corrupt(format!(
            "invalid latest_version for market {market_id}"
        ))),
        other => Ok(other),
    }
}

/// Returns the operation count recorded for a market's latest version.
fn stored_operation_count(
    tx: &Transaction<'_>,
    market_id: &MarketId,
    version: i64,
) -> Result<u64, SqliteStoreError> {
    let count: Option<i64> = tx
        .query_row(
            "SELECT operation_count FROM ledger_versions WHERE market_id = ?1 AND version = ?2",
            params![market_id.as_str(), version],
            |row| row.get(0),
        )
        .optional()?;
    let count = count.ok_or_else(|| {
        SqliteStoreError::Corrupt(format!(
            "missing ledger version {version} for market {market_id}"
        ))
    })?;
    non_negative("operation_count", count)
}

/// Reads a snapshot row, checking its length before fetching the blob.
fn read_version(
    tx: &Transaction<'_>,
    market_id: &MarketId,
    version: i64,
    max_state_bytes: usize,
) -> Result<Option<SnapshotRow>, SqliteStoreError> {
    let metadata = tx
        .query_row(
            "SELECT length(ledger_json), ledger_hash, hash_algorithm FROM ledger_versions WHERE \
             market_id = ?1 AND version = ?2",
            params![market_id.as_str(), version],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?)),
        )
        .optional()?;
    let Some((length, hash, algorithm)) = metadata else {
        return Ok(None);
    };
    let length = usize::try_from(length).map_err(|_| {
        SqliteStoreError::Invalid(format!("negative ledger length for market {market_id}"))
    })?;
    if length > max_state_bytes {
        return Err(SqliteStoreError::TooLarge {
            limit: max_state_bytes,
            size: length,
        });
    }
    let bytes: Vec<u8> = tx.query_row(
        "SELECT ledger_json FROM ledger_versions WHERE market_id = ?1 AND version = ?2",
        params![market_id.as_str(), version],
        |row| row.get(0),
    )?;
    Ok(Some((bytes, hash, algorithm)))
}

/// Verifies and deserializes a snapshot row.
fn decode_snapshot(
    market_id: &MarketId,
    (bytes, hash_value, hash_algorithm): SnapshotRow,
) -> Result<LedgerState, SqliteStoreError> {
    let recorded = HashDigest {
        algorithm: parse_hash_algorithm(&hash_algorithm)?,
        value: hash_value,
    };
    if !recorded.matches(&bytes) {
        return Err(SqliteStoreError::Corrupt(format!("hash mismatch for market {market_id}")));
    }
    let state: LedgerState =
        serde_json::from_slice(&bytes).map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
    if state.market_id != *market_id {
        return Err(SqliteStoreError::Invalid(
            "market_id mismatch between key and payload".to_string(),
        ));
    }
    Ok(state)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Rejects retention and size limits that would make the store unusable.
fn check_limits(config: &SqliteStoreConfig) -> Result<(), SqliteStoreError> {
    if config.max_versions == Some(0) {
        return Err(SqliteStoreError::Invalid("max_versions must keep at least one version".into()));
    }
    if config.max_state_bytes == 0 {
        return Err(SqliteStoreError::Invalid("max_state_bytes must be positive".into()));
    }
    Ok(())
}

/// Rejects overlong paths and paths naming a directory.
fn check_database_path(path: &Path) -> Result<(), SqliteStoreError> {
    let too_long = path.as_os_str().len() > MAX_PATH_BYTES
        || path.components().any(|part| part.as_os_str().len() > MAX_PATH_COMPONENT_BYTES);
    if too_long {
        return Err(SqliteStoreError::Invalid(format!(
            "database path exceeds {MAX_PATH_BYTES} bytes or has a name over \
             {MAX_PATH_COMPONENT_BYTES} bytes"
        )));
    }
    if path.is_dir() {
        return Err(SqliteStoreError::Invalid(format!(
            "database path {} is a directory",
            path.display()
        )));
    }
    Ok(())
}

/// Creates missing directories above the database file.
fn create_parent_dirs(path: &Path) -> Result<(), SqliteStoreError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent)
            .map_err(|err| SqliteStoreError::Io(format!("{}: {err}", parent.display()))),
        Some(_) => Ok(()),
        None => Err(SqliteStoreError::Io("database path has no parent directory".into())),
    }
}

/// Opens the database and applies journal, sync, and timeout settings.
fn connect(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let connection = Connection::open_with_flags(
        &config.path,
        OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_FULL_MUTEX,
    )?;
    connection.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
    let pragmas = format!(
        "PRAGMA foreign_keys = ON;\nPRAGMA journal_mode = {};\nPRAGMA synchronous = {};",
        config.journal_mode.pragma(),
        config.sync_mode.pragma(),
    );
    connection.execute_batch(&pragmas)?;
    Ok(connection)
}

/// Creates the ledger tables on first open; afterwards checks the revision.
fn prepare_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction()?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")?;
    let recorded: Option<i64> =
        tx.query_row("SELECT version FROM store_meta", [], |row| row.get(0)).optional()?;
    match recorded {
        Some(LEDGER_SCHEMA) => {}
        Some(other) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "file has schema {other}, expected {LEDGER_SCHEMA}"
            )));
        }
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![LEDGER_SCHEMA])?;
            tx.execute_batch(LEDGER_TABLES)?;
        }
    }
    tx.commit()?;
    Ok(())
}

/// Tables holding the market pointers and the versioned snapshots.
const LEDGER_TABLES: &str = "
    CREATE TABLE IF NOT EXISTS markets (
        market_id TEXT PRIMARY KEY,
        latest_version INTEGER NOT NULL
    );
    CREATE TABLE IF NOT EXISTS ledger_versions (
        market_id TEXT NOT NULL REFERENCES markets(market_id) ON DELETE CASCADE,
        version INTEGER NOT NULL,
        ledger_json BLOB NOT NULL,
        ledger_hash TEXT NOT NULL,
        hash_algorithm TEXT NOT NULL,
        block_height INTEGER,
        operation_count INTEGER NOT NULL,
        PRIMARY KEY (market_id, version)
    );
";

/// Deletes versions that fall out of the newest `max_versions`.
fn prune_versions(
    tx: &Transaction<'_>,
    market_id: &MarketId,
    newest: i64,
    max_versions: Option<u64>,
) -> Result<(), SqliteStoreError> {
    let Some(keep) = max_versions else {
        return Ok(());
    };
    // A window wider than i64 can never be exceeded.
    let Ok(keep) = i64::try_from(keep) else {
        return Ok(());
    };
    let cutoff = newest - keep;
    if cutoff > 0 {
        tx.execute(
            "DELETE FROM ledger_versions WHERE market_id = ?1 AND version <= ?2",
            params![market_id.as_str(), cutoff],
        )?;
    }
    Ok(())
}

/// Converts a stored integer into an unsigned value.
fn non_negative(field: &str, value: i64) -> Result<u64, SqliteStoreError> {
    u64::try_from(value).map_err(|_| SqliteStoreError::Invalid(format!("negative {field}")))
}

/// Parses a stored hash algorithm label.
fn parse_hash_algorithm(label: &str) -> Result<HashAlgorithm, SqliteStoreError> {
    HashAlgorithm::from_label(label)
        .ok_or_else(|| SqliteStoreError::Invalid(format!("unsupported hash algorithm: {label}")))
}
