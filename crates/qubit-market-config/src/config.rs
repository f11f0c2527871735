// crates/qubit-market-config/src/config.rs
// ============================================================================
// Module: Qubit Market Configuration
// Description: Configuration loading and validation for the market ledger.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: qubit-market-core, qubit-market-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! The `[market]` section maps onto the engine's [`MarketPolicy`], `[store]`
//! selects the ledger backend, and `[audit]` selects where audit events go.
//! Missing sections fall back to defaults; inconsistent values fail closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fmt::Display;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use qubit_market_core::MarketId;
use qubit_market_core::MarketPolicy;
use qubit_market_core::PrincipalId;
use qubit_market_core::hashing::DEFAULT_HASH_ALGORITHM;
use qubit_market_core::runtime::engine::DEFAULT_ENTANGLEMENT_WINDOW;
use qubit_market_core::runtime::engine::DEFAULT_MAX_GROUP_SIZE;
use qubit_market_core::runtime::engine::DEFAULT_MAX_HASH_LEN;
use qubit_market_core::runtime::engine::DEFAULT_MAX_NAME_LEN;
use qubit_market_core::runtime::engine::DEFAULT_MAX_QUBITS;
use qubit_market_core::runtime::engine::DEFAULT_MIN_CONSENSUS_THRESHOLD;
use qubit_market_store_sqlite::MAX_STATE_BYTES;
use qubit_market_store_sqlite::SqliteJournalMode;
use qubit_market_store_sqlite::SqliteStoreConfig;
use qubit_market_store_sqlite::SqliteSyncMode;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "qubit-market.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "QUBIT_MARKET_CONFIG";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default market identifier.
const DEFAULT_MARKET_ID: &str = "qubit-market";
/// Upper bound for the entanglement window.
const MAX_ENTANGLEMENT_WINDOW: u64 = 1_000_000;
/// Upper bound for configurable qubit counts.
const MAX_CONFIGURABLE_QUBITS: u32 = 1_048_576;
/// Upper bound for configurable string limits.
const MAX_CONFIGURABLE_LENGTH: usize = 1024;
/// Upper bound for configurable group sizes.
const MAX_CONFIGURABLE_GROUP_SIZE: usize = 1024;

// ============================================================================
// SECTION: Root Config
// ============================================================================

/// Complete `qubit-market.toml` configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Market identity and engine limits.
    #[serde(default)]
    pub market: MarketSection,
    /// Ledger store backend.
    #[serde(default)]
    pub store: StoreConfig,
    /// Audit sink selection.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl MarketConfig {
    /// Loads configuration from disk using the default resolution rules:
    /// explicit path, then `QUBIT_MARKET_CONFIG`, then `qubit-market.toml`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::parse(content)
    }

    /// Parses and validates configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.market.validate()?;
        self.store.validate()?;
        self.audit.validate()?;
        Ok(())
    }

    /// Returns the configured market identifier.
    #[must_use]
    pub fn market_id(&self) -> MarketId {
        MarketId::new(self.market.id.clone())
    }

    /// Returns the engine policy derived from `[market]`.
    #[must_use]
    pub const fn to_policy(&self) -> MarketPolicy {
        MarketPolicy {
            entanglement_window: self.market.entanglement_window,
            max_qubits: self.market.max_qubits,
            max_name_len: self.market.max_name_len,
            max_hash_len: self.market.max_hash_len,
            min_consensus_threshold: self.market.min_consensus_threshold,
            max_group_size: self.market.max_group_size,
            hash_algorithm: DEFAULT_HASH_ALGORITHM,
        }
    }
}

// ============================================================================
// SECTION: Market
// ============================================================================

/// Market identity and engine limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSection {
    /// Market identifier used as the store key.
    #[serde(default = "default_market_id")]
    pub id: String,
    /// Blocks a group stays entangled after synchronization.
    #[serde(default = "default_entanglement_window")]
    pub entanglement_window: u64,
    /// Maximum qubits per processor.
    #[serde(default = "default_max_qubits")]
    pub max_qubits: u32,
    /// Maximum name length in bytes.
    #[serde(default = "default_max_name_len")]
    pub max_name_len: usize,
    /// Maximum result hash length in bytes.
    #[serde(default = "default_max_hash_len")]
    pub max_hash_len: usize,
    /// Lowest consensus threshold callers may request.
    #[serde(default = "default_min_consensus_threshold")]
    pub min_consensus_threshold: u8,
    /// Maximum processors per entangled group.
    #[serde(default = "default_max_group_size")]
    pub max_group_size: usize,
}

impl Default for MarketSection {
    fn default() -> Self {
        Self {
            id: default_market_id(),
            entanglement_window: DEFAULT_ENTANGLEMENT_WINDOW,
            max_qubits: DEFAULT_MAX_QUBITS,
            max_name_len: DEFAULT_MAX_NAME_LEN,
            max_hash_len: DEFAULT_MAX_HASH_LEN,
            min_consensus_threshold: DEFAULT_MIN_CONSENSUS_THRESHOLD,
            max_group_size: DEFAULT_MAX_GROUP_SIZE,
        }
    }
}

impl MarketSection {
    /// Validates market identity and limits.
    fn validate(&self) -> Result<(), ConfigError> {
        if !PrincipalId::new(self.id.clone()).is_well_formed() || self.id.len() > 64 {
            return Err(ConfigError::Invalid(
                "market.id must be 1..=64 bytes without whitespace".to_string(),
            ));
        }
        check_range(
            "market.entanglement_window",
            self.entanglement_window,
            1,
            MAX_ENTANGLEMENT_WINDOW,
        )?;
        check_range("market.max_qubits", self.max_qubits, 1, MAX_CONFIGURABLE_QUBITS)?;
        check_range("market.max_name_len", self.max_name_len, 1, MAX_CONFIGURABLE_LENGTH)?;
        check_range("market.max_hash_len", self.max_hash_len, 1, MAX_CONFIGURABLE_LENGTH)?;
        check_range("market.min_consensus_threshold", self.min_consensus_threshold, 51, 100)?;
        check_range(
            "market.max_group_size",
            self.max_group_size,
            2,
            MAX_CONFIGURABLE_GROUP_SIZE,
        )?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Ledger store backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    /// Keep the ledger in process memory.
    ///
    /// Nothing survives the process, so the CLI ledger commands refuse this
    /// backend; it serves config validation and embedded engines.
    #[default]
    Memory,
    /// Use the `SQLite`-backed durable store.
    Sqlite,
}

/// Ledger store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store backend type.
    #[serde(rename = "type", default)]
    pub store_type: StoreType,
    /// `SQLite` database path when using the sqlite backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_store_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteJournalMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
    /// Optional max versions retained per market.
    #[serde(default)]
    pub max_versions: Option<u64>,
    /// Maximum canonical snapshot size in bytes.
    #[serde(default = "default_max_state_bytes")]
    pub max_state_bytes: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_type: StoreType::default(),
            path: None,
            busy_timeout_ms: default_store_busy_timeout_ms(),
            journal_mode: SqliteJournalMode::default(),
            sync_mode: SqliteSyncMode::default(),
            max_versions: None,
            max_state_bytes: default_max_state_bytes(),
        }
    }
}

impl StoreConfig {
    /// Validates store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.store_type {
            StoreType::Memory => {
                if self.path.is_some() {
                    return Err(ConfigError::Invalid(
                        "memory store must not set path".to_string(),
                    ));
                }
                Ok(())
            }
            StoreType::Sqlite => {
                let path = self.path.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("sqlite store requires path".to_string())
                })?;
                validate_path_string("store.path", &path.to_string_lossy())?;
                if self.max_versions == Some(0) {
                    return Err(ConfigError::Invalid(
                        "store max_versions must be greater than zero".to_string(),
                    ));
                }
                if self.max_state_bytes == 0 {
                    return Err(ConfigError::Invalid(
                        "store max_state_bytes must be greater than zero".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }

    /// Returns the `SQLite` store config when the sqlite backend is selected.
    #[must_use]
    pub fn sqlite_config(&self) -> Option<SqliteStoreConfig> {
        match (self.store_type, &self.path) {
            (StoreType::Sqlite, Some(path)) => Some(SqliteStoreConfig {
                path: path.clone(),
                busy_timeout_ms: self.busy_timeout_ms,
                journal_mode: self.journal_mode,
                sync_mode: self.sync_mode,
                max_versions: self.max_versions,
                max_state_bytes: self.max_state_bytes,
            }),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audit sink selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Emits audit events when true.
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,
    /// Appends JSON lines to this file instead of stderr.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
            path: None,
        }
    }
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if !self.enabled {
            return Err(ConfigError::Invalid(
                "audit.path requires audit.enabled = true".to_string(),
            ));
        }
        validate_path_string("audit.path", &path.to_string_lossy())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI input, environment, or default.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    if path.as_os_str().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    if path.components().any(|component| component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH)
    {
        return Err(ConfigError::Invalid("config path component too long".to_string()));
    }
    Ok(())
}

/// Validates a configured path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    if Path::new(trimmed)
        .components()
        .any(|component| component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH)
    {
        return Err(ConfigError::Invalid(format!("{field} path component too long")));
    }
    Ok(())
}

/// Checks a numeric limit against an inclusive range.
fn check_range<T>(field: &str, value: T, min: T, max: T) -> Result<(), ConfigError>
where
    T: Copy + PartialOrd + Display,
{
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{field} must be within {min}..={max}")))
    }
}

/// Returns the default market identifier.
fn default_market_id() -> String {
    DEFAULT_MARKET_ID.to_string()
}

/// Returns the default entanglement window.
const fn default_entanglement_window() -> u64 {
    DEFAULT_ENTANGLEMENT_WINDOW
}

/// Returns the default processor qubit limit.
const fn default_max_qubits() -> u32 {
    DEFAULT_MAX_QUBITS
}

/// Returns the default name length limit.
const fn default_max_name_len() -> usize {
    DEFAULT_MAX_NAME_LEN
}

/// Returns the default hash length limit.
const fn default_max_hash_len() -> usize {
    DEFAULT_MAX_HASH_LEN
}

/// Returns the default consensus floor.
const fn default_min_consensus_threshold() -> u8 {
    DEFAULT_MIN_CONSENSUS_THRESHOLD
}

/// Returns the default group size limit.
const fn default_max_group_size() -> usize {
    DEFAULT_MAX_GROUP_SIZE
}

/// Returns the default `SQLite` busy timeout.
const fn default_store_busy_timeout_ms() -> u64 {
    5_000
}

/// Returns the default snapshot size limit.
const fn default_max_state_bytes() -> usize {
    MAX_STATE_BYTES
}

/// Returns the default audit toggle.
const fn default_audit_enabled() -> bool {
    true
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::use_debug,
        reason = "Test-only config assertions."
    )]

    use super::*;

    #[test]
    fn validate_path_string_rejects_whitespace_only() {
        assert!(validate_path_string("store.path", "   ").is_err());
    }

    #[test]
    fn validate_path_string_rejects_long_component() {
        let value = format!("dir/{}", "a".repeat(MAX_PATH_COMPONENT_LENGTH + 1));
        let err = validate_path_string("store.path", &value).unwrap_err();
        assert!(err.to_string().contains("path component too long"));
    }

    #[test]
    fn resolve_path_prefers_explicit_path() {
        let resolved = resolve_path(Some(Path::new("custom.toml"))).unwrap();
        assert_eq!(resolved, PathBuf::from("custom.toml"));
    }

    #[test]
    fn check_range_reports_bounds() {
        let err = check_range("market.entanglement_window", 0, 1, 10).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid config: market.entanglement_window must be within 1..=10"
        );
    }

    #[test]
    fn check_range_accepts_narrow_and_pointer_sized_values() {
        assert!(check_range("market.min_consensus_threshold", 51_u8, 51, 100).is_ok());
        assert!(check_range("market.max_group_size", 2_usize, 2, 64).is_ok());
        let err = check_range("market.max_group_size", 65_usize, 2, 64).unwrap_err();
        assert_eq!(err.to_string(), "invalid config: market.max_group_size must be within 2..=64");
    }
}
