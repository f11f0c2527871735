// crates/qubit-market-core/src/lib.rs
// ============================================================================
// Module: Qubit Market Core Library
// Description: Public API surface for the Qubit Market ledger core.
// Purpose: Expose ledger types, interfaces, and the market engine.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Qubit Market core provides a deterministic ledger for a simulated
//! quantum-compute resource market: processor registration, entangled
//! processor groups running parallel jobs, superposition task allocation, and
//! result verification with consensus and challenges. It is storage-agnostic
//! and integrates through explicit interfaces.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::AuditSink;
pub use interfaces::LedgerStore;
pub use interfaces::StoreError;
pub use runtime::AllocateResourcesRequest;
pub use runtime::AuditOutcome;
pub use runtime::CallContext;
pub use runtime::ChallengeVerificationRequest;
pub use runtime::CompleteParallelJobRequest;
pub use runtime::ConsensusVerifyRequest;
pub use runtime::CreateGroupRequest;
pub use runtime::FileAuditSink;
pub use runtime::InMemoryLedgerStore;
pub use runtime::LedgerAuditEvent;
pub use runtime::MaintenanceRequest;
pub use runtime::Market;
pub use runtime::MarketError;
pub use runtime::MarketPolicy;
pub use runtime::NoopAuditSink;
pub use runtime::RegisterProcessorRequest;
pub use runtime::SharedLedgerStore;
pub use runtime::StderrAuditSink;
pub use runtime::SubmitParallelJobRequest;
pub use runtime::SubmitProcessorResultRequest;
pub use runtime::SubmitResultRequest;
pub use runtime::SubmitTaskRequest;
pub use runtime::SynchronizeGroupRequest;
pub use runtime::TaskExecutionRequest;
pub use runtime::UpdateProcessorStatusRequest;
pub use runtime::VerifyResultRequest;
