// crates/qubit-market-config/tests/common/mod.rs
// ============================================================================
// Module: Config Test Helpers
// Description: Shared builders for configuration validation tests.
// ============================================================================

//! ## Overview
//! Helpers for parsing TOML snippets into unvalidated configs.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]

use qubit_market_config::MarketConfig;

/// Parses TOML without running validation.
pub fn config_from_toml(toml_str: &str) -> Result<MarketConfig, String> {
    toml::from_str(toml_str).map_err(|err| err.to_string())
}

/// Returns the all-defaults configuration.
pub fn minimal_config() -> Result<MarketConfig, String> {
    config_from_toml("")
}
