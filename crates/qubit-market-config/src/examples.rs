// crates/qubit-market-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration for qubit-market.toml.
// Purpose: Give operators a documented starting point that always validates.
// Dependencies: none
// ============================================================================

//! ## Overview
//! The example covers every section with its default values, switching the
//! store to the durable `SQLite` backend so the commented fields are useful.

/// Returns an annotated example `qubit-market.toml`.
#[must_use]
pub fn config_toml_example() -> String {
    r#"# qubit-market.toml

[market]
# Store key for this market's ledger.
id = "qubit-market"
# Blocks a group stays entangled after synchronization.
entanglement_window = 100
max_qubits = 4096
max_name_len = 64
max_hash_len = 128
# Lowest consensus threshold (percent) callers may request.
min_consensus_threshold = 51
max_group_size = 64

[store]
# "memory" (the default) keeps the ledger in-process only and is accepted
# by `config validate` alone; ledger commands require "sqlite".
type = "sqlite"
path = "qubit-market.sqlite"
busy_timeout_ms = 5000
journal_mode = "wal"
sync_mode = "full"
# Keep the newest N ledger versions; omit to keep all.
max_versions = 256

[audit]
enabled = true
# Append JSON lines here instead of stderr.
# path = "qubit-market-audit.jsonl"
"#
    .to_string()
}
