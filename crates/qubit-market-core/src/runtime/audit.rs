// crates/qubit-market-core/src/runtime/audit.rs
// ============================================================================
// Module: Ledger Audit Logging
// Description: Structured audit events for ledger operations.
// Purpose: Emit JSON-line audit logs without hard dependencies.
// Dependencies: crate::{core, interfaces}, serde, serde_json
// ============================================================================

//! ## Overview
//! Every ledger call, accepted or rejected, produces one
//! [`LedgerAuditEvent`]. Sinks serialize events as JSON lines so deployments
//! can route them to their preferred logging pipeline. Events carry the
//! caller-supplied block height rather than wall-clock time.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use serde::Serialize;

use crate::core::BlockHeight;
use crate::core::HashDigest;
use crate::core::MarketId;
use crate::core::PrincipalId;
use crate::interfaces::AuditSink;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Outcome classification for an audited call.
///
/// # Invariants
/// - Variants are stable for log labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    /// Operation was applied and persisted.
    Ok,
    /// Operation was rejected; the ledger is unchanged.
    Error,
}

/// Ledger audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Operation method name.
    pub method: &'static str,
    /// Market identifier.
    pub market_id: String,
    /// Calling principal.
    pub caller: String,
    /// Block height supplied with the request.
    pub block_height: u64,
    /// Call outcome.
    pub outcome: AuditOutcome,
    /// Stable error label when the call failed.
    pub error_kind: Option<&'static str>,
    /// Operation sequence assigned on success.
    pub operation_seq: Option<u64>,
    /// Canonical request hash when it could be computed.
    pub request_hash: Option<HashDigest>,
}

impl LedgerAuditEvent {
    /// Builds an event for an accepted operation.
    #[must_use]
    pub fn accepted(
        method: &'static str,
        market_id: &MarketId,
        caller: &PrincipalId,
        block_height: BlockHeight,
        operation_seq: u64,
        request_hash: HashDigest,
    ) -> Self {
        Self {
            event: "ledger_operation",
            method,
            market_id: market_id.to_string(),
            caller: caller.to_string(),
            block_height: block_height.get(),
            outcome: AuditOutcome::Ok,
            error_kind: None,
            operation_seq: Some(operation_seq),
            request_hash: Some(request_hash),
        }
    }

    /// Builds an event for a rejected operation.
    #[must_use]
    pub fn rejected(
        method: &'static str,
        market_id: &MarketId,
        caller: &PrincipalId,
        block_height: BlockHeight,
        error_kind: &'static str,
        request_hash: Option<HashDigest>,
    ) -> Self {
        Self {
            event: "ledger_operation",
            method,
            market_id: market_id.to_string(),
            caller: caller.to_string(),
            block_height: block_height.get(),
            outcome: AuditOutcome::Error,
            error_kind: Some(error_kind),
            operation_seq: None,
            request_hash,
        }
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _event: &LedgerAuditEvent) {}
}

/// Audit sink that logs JSON lines to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrAuditSink;

impl AuditSink for StderrAuditSink {
    fn record(&self, event: &LedgerAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that appends JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl AuditSink for FileAuditSink {
    fn record(&self, event: &LedgerAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}
