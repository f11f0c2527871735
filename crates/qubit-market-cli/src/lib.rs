// crates/qubit-market-cli/src/lib.rs
// ============================================================================
// Module: Qubit Market CLI Library
// Description: Shared helpers for the qubit-market binary.
// Purpose: Expose the i18n catalog to the binary and integration tests.
// Dependencies: none
// ============================================================================

//! ## Overview
//! Library surface of the CLI crate. The binary's command handling lives in
//! `main.rs`; this crate root only exposes the localization helpers.

pub mod i18n;
