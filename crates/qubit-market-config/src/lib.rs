// crates/qubit-market-config/src/lib.rs
// ============================================================================
// Module: Qubit Market Config Library
// Description: Canonical config model, validation, and examples.
// Purpose: Single source of truth for qubit-market.toml semantics.
// Dependencies: qubit-market-core, qubit-market-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `qubit-market-config` defines the configuration model for the Qubit Market
//! ledger. Loading is strict and fail-closed: oversized, non-UTF-8, or
//! inconsistent files are rejected before any store is opened.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use examples::config_toml_example;
