// crates/qubit-market-core/src/runtime/mod.rs
// ============================================================================
// Module: Qubit Market Runtime
// Description: Market engine, ledger operations, stores, and audit sinks.
// Purpose: Execute ledger operations deterministically and record them.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! The runtime hosts the [`Market`] engine and its operation families:
//! processor registry, entanglement, allocation, and verification. It also
//! provides an in-memory store and the built-in audit sinks.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod allocation;
pub mod audit;
pub mod engine;
pub mod entanglement;
pub mod registry;
pub mod store;
pub mod verification;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use allocation::AllocateResourcesRequest;
pub use allocation::SubmitTaskRequest;
pub use allocation::TaskExecutionRequest;
pub use audit::AuditOutcome;
pub use audit::FileAuditSink;
pub use audit::LedgerAuditEvent;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use engine::CallContext;
pub use engine::Market;
pub use engine::MarketError;
pub use engine::MarketPolicy;
pub use entanglement::CompleteParallelJobRequest;
pub use entanglement::CreateGroupRequest;
pub use entanglement::SubmitParallelJobRequest;
pub use entanglement::SubmitProcessorResultRequest;
pub use entanglement::SynchronizeGroupRequest;
pub use registry::MaintenanceRequest;
pub use registry::RegisterProcessorRequest;
pub use registry::UpdateProcessorStatusRequest;
pub use store::InMemoryLedgerStore;
pub use store::SharedLedgerStore;
pub use verification::ChallengeVerificationRequest;
pub use verification::ConsensusVerifyRequest;
pub use verification::SubmitResultRequest;
pub use verification::VerifyResultRequest;
