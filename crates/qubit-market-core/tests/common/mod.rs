// crates/qubit-market-core/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: Shared market fixtures and a recording audit sink.
// Purpose: Provide reusable ledger setups for deterministic tests.
// Dependencies: qubit-market-core
// ============================================================================

//! ## Overview
//! Shared fixtures build an in-memory market with a recording audit sink and
//! seed processors, groups, and tasks through the public operations.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;

use qubit_market_core::AuditSink;
use qubit_market_core::CallContext;
use qubit_market_core::CreateGroupRequest;
use qubit_market_core::GroupId;
use qubit_market_core::InMemoryLedgerStore;
use qubit_market_core::LedgerAuditEvent;
use qubit_market_core::Market;
use qubit_market_core::MarketId;
use qubit_market_core::MarketPolicy;
use qubit_market_core::ProcessorId;
use qubit_market_core::RegisterProcessorRequest;
use qubit_market_core::SubmitTaskRequest;
use qubit_market_core::TaskId;

// ============================================================================
// SECTION: Principals
// ============================================================================

/// Processor owner used across fixtures.
pub const OWNER: &str = "ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM";
/// Second principal used for authorization checks.
pub const OTHER: &str = "ST2CY5V39NHDPWSXMW9QDT3HC3GD6Q6XX4CFRK9AG";
/// Verifier principal.
pub const VERIFIER_A: &str = "ST2JHG361ZXG51QTKY2NQCVBPPRRE2KZB1HR05NNC";
/// Verifier principal.
pub const VERIFIER_B: &str = "ST2NEB84ASENDXKYGJPQW86YXQCEFEX2ZQPG87ND";
/// Verifier principal.
pub const VERIFIER_C: &str = "ST2REHHS5J3CERCRBEPMGH7921Q6PYKAADT7JP2VB";

// ============================================================================
// SECTION: Audit Capture
// ============================================================================

/// Audit sink that keeps every event in memory.
#[derive(Default)]
pub struct RecordingAuditSink {
    /// Captured events in emission order.
    events: Mutex<Vec<LedgerAuditEvent>>,
}

impl RecordingAuditSink {
    /// Returns a copy of the captured events.
    pub fn events(&self) -> Vec<LedgerAuditEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl AuditSink for RecordingAuditSink {
    fn record(&self, event: &LedgerAuditEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// In-memory market type used by tests.
pub type TestMarket = Market<InMemoryLedgerStore, Arc<RecordingAuditSink>>;

// ============================================================================
// SECTION: Market Fixtures
// ============================================================================

/// Builds a market with the default policy.
pub fn market() -> (TestMarket, Arc<RecordingAuditSink>) {
    market_with_policy(MarketPolicy::default())
}

/// Builds a market with a custom policy.
pub fn market_with_policy(policy: MarketPolicy) -> (TestMarket, Arc<RecordingAuditSink>) {
    let audit = Arc::new(RecordingAuditSink::default());
    let market = Market::new(
        MarketId::new("qubit-test"),
        InMemoryLedgerStore::new(),
        Arc::clone(&audit),
        policy,
    )
    .unwrap();
    (market, audit)
}

/// Registers a processor owned by `owner`.
pub fn register(
    market: &TestMarket,
    owner: &str,
    height: u64,
    name: &str,
    qubits: u32,
    error_rate: u8,
) -> ProcessorId {
    market
        .register_processor(&RegisterProcessorRequest {
            context: CallContext::new(owner, height),
            name: name.to_string(),
            qubits,
            error_rate,
        })
        .unwrap()
}

/// Registers two processors for `OWNER` and entangles them at `height`.
pub fn entangled_pair(market: &TestMarket, height: u64) -> (GroupId, ProcessorId, ProcessorId) {
    let first = register(market, OWNER, height, "Quantum Processor Alpha", 64, 5);
    let second = register(market, OWNER, height, "Quantum Processor Beta", 64, 3);
    let group_id = market
        .create_entangled_group(&CreateGroupRequest {
            context: CallContext::new(OWNER, height),
            name: "Entangled Cluster".to_string(),
            processor_ids: vec![first, second],
            entanglement_type: "GHZ State".to_string(),
        })
        .unwrap();
    (group_id, first, second)
}

/// Submits a task for `submitter`.
pub fn submit_task(
    market: &TestMarket,
    submitter: &str,
    height: u64,
    qubits_required: u32,
    superposition_states: u32,
) -> TaskId {
    market
        .submit_task(&SubmitTaskRequest {
            context: CallContext::new(submitter, height),
            name: "Quantum Factorization".to_string(),
            qubits_required,
            superposition_states,
        })
        .unwrap()
}
