// crates/qubit-market-core/src/core/mod.rs
// ============================================================================
// Module: Qubit Market Core Types
// Description: Canonical ledger entities, identifiers, and snapshot types.
// Purpose: Provide stable, serializable types for the market ledger.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Core types define processors, entangled groups, tasks, results, and the
//! ledger snapshot. These types are the canonical source of truth for every
//! derived surface (CLI, stores).

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod allocation;
pub mod entanglement;
pub mod hashing;
pub mod identifiers;
pub mod processor;
pub mod state;
pub mod time;
pub mod verification;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use allocation::Allocation;
pub use allocation::ComputationTask;
pub use allocation::TaskStatus;
pub use entanglement::EntangledGroup;
pub use entanglement::JobStatus;
pub use entanglement::ParallelJob;
pub use entanglement::ProcessorResult;
pub use hashing::DEFAULT_HASH_ALGORITHM;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use hashing::HashError;
pub use identifiers::AllocationId;
pub use identifiers::GroupId;
pub use identifiers::IdentifierParseError;
pub use identifiers::JobId;
pub use identifiers::MarketId;
pub use identifiers::PrincipalId;
pub use identifiers::ProcessorId;
pub use identifiers::ResultId;
pub use identifiers::TaskId;
pub use identifiers::VerificationId;
pub use processor::MAX_ERROR_RATE;
pub use processor::MaintenanceRecord;
pub use processor::Processor;
pub use processor::ProcessorStatus;
pub use state::LedgerState;
pub use state::OperationRecord;
pub use time::BlockHeight;
pub use verification::ComputationResult;
pub use verification::FULL_CONFIDENCE;
pub use verification::ResultStatus;
pub use verification::Verification;
