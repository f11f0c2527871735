// crates/qubit-market-core/src/core/state.rs
// ============================================================================
// Module: Ledger State
// Description: Canonical ledger snapshot and append-only operation log.
// Purpose: Hold every market entity in a single serializable snapshot.
// Dependencies: crate::core, serde
// ============================================================================

//! ## Overview
//! [`LedgerState`] is the unit of persistence. Each entity kind is stored in
//! an append-only vector whose slot `n - 1` holds the record with identifier
//! `n`, so identifier assignment and lookup stay deterministic. Every accepted
//! mutation appends an [`OperationRecord`] carrying canonical request and
//! response hashes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::allocation::Allocation;
use crate::core::allocation::ComputationTask;
use crate::core::entanglement::EntangledGroup;
use crate::core::entanglement::ParallelJob;
use crate::core::hashing::HashAlgorithm;
use crate::core::hashing::HashDigest;
use crate::core::hashing::HashError;
use crate::core::hashing::digest_canonical;
use crate::core::identifiers::AllocationId;
use crate::core::identifiers::GroupId;
use crate::core::identifiers::JobId;
use crate::core::identifiers::MarketId;
use crate::core::identifiers::PrincipalId;
use crate::core::identifiers::ProcessorId;
use crate::core::identifiers::ResultId;
use crate::core::identifiers::TaskId;
use crate::core::identifiers::VerificationId;
use crate::core::processor::Processor;
use crate::core::time::BlockHeight;
use crate::core::verification::ComputationResult;
use crate::core::verification::Verification;

// ============================================================================
// SECTION: Operation Log
// ============================================================================

/// Audit record for an accepted ledger mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRecord {
    /// 1-based sequence within the ledger.
    pub seq: u64,
    /// Operation method name (e.g. `processor.register`).
    pub method: String,
    /// Calling principal.
    pub caller: PrincipalId,
    /// Height at which the operation executed.
    pub block_height: BlockHeight,
    /// Canonical hash of the request payload.
    pub request_hash: HashDigest,
    /// Canonical hash of the response payload.
    pub response_hash: HashDigest,
}

// ============================================================================
// SECTION: Ledger Snapshot
// ============================================================================

/// Complete market ledger snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    /// Market identifier.
    pub market_id: MarketId,
    /// Registered processors.
    pub processors: Vec<Processor>,
    /// Entangled processor groups.
    pub groups: Vec<EntangledGroup>,
    /// Parallel jobs across groups.
    pub jobs: Vec<ParallelJob>,
    /// Submitted computation tasks.
    pub tasks: Vec<ComputationTask>,
    /// Task allocations.
    pub allocations: Vec<Allocation>,
    /// Submitted computation results.
    pub results: Vec<ComputationResult>,
    /// Verifier attestations.
    pub verifications: Vec<Verification>,
    /// Append-only log of accepted operations.
    pub operations: Vec<OperationRecord>,
    /// Height of the latest accepted operation.
    pub last_block_height: Option<BlockHeight>,
}

impl LedgerState {
    /// Creates an empty ledger for the market.
    #[must_use]
    pub const fn new(market_id: MarketId) -> Self {
        Self {
            market_id,
            processors: Vec::new(),
            groups: Vec::new(),
            jobs: Vec::new(),
            tasks: Vec::new(),
            allocations: Vec::new(),
            results: Vec::new(),
            verifications: Vec::new(),
            operations: Vec::new(),
            last_block_height: None,
        }
    }

    /// Number of accepted operations; stores use it as the snapshot revision.
    #[must_use]
    pub fn operation_count(&self) -> u64 {
        u64::try_from(self.operations.len()).unwrap_or(u64::MAX)
    }

    /// Computes the canonical digest of the full snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] when canonicalization fails.
    pub fn canonical_hash(&self, algorithm: HashAlgorithm) -> Result<HashDigest, HashError> {
        digest_canonical(algorithm, self)
    }

    /// Returns the processor with the given identifier.
    #[must_use]
    pub fn processor(&self, id: ProcessorId) -> Option<&Processor> {
        id.to_index().and_then(|index| self.processors.get(index))
    }

    /// Returns a mutable processor with the given identifier.
    pub fn processor_mut(&mut self, id: ProcessorId) -> Option<&mut Processor> {
        id.to_index().and_then(|index| self.processors.get_mut(index))
    }

    /// Returns the group with the given identifier.
    #[must_use]
    pub fn group(&self, id: GroupId) -> Option<&EntangledGroup> {
        id.to_index().and_then(|index| self.groups.get(index))
    }

    /// Returns a mutable group with the given identifier.
    pub fn group_mut(&mut self, id: GroupId) -> Option<&mut EntangledGroup> {
        id.to_index().and_then(|index| self.groups.get_mut(index))
    }

    /// Returns the job with the given identifier.
    #[must_use]
    pub fn job(&self, id: JobId) -> Option<&ParallelJob> {
        id.to_index().and_then(|index| self.jobs.get(index))
    }

    /// Returns a mutable job with the given identifier.
    pub fn job_mut(&mut self, id: JobId) -> Option<&mut ParallelJob> {
        id.to_index().and_then(|index| self.jobs.get_mut(index))
    }

    /// Returns the task with the given identifier.
    #[must_use]
    pub fn task(&self, id: TaskId) -> Option<&ComputationTask> {
        id.to_index().and_then(|index| self.tasks.get(index))
    }

    /// Returns a mutable task with the given identifier.
    pub fn task_mut(&mut self, id: TaskId) -> Option<&mut ComputationTask> {
        id.to_index().and_then(|index| self.tasks.get_mut(index))
    }

    /// Returns the allocation with the given identifier.
    #[must_use]
    pub fn allocation(&self, id: AllocationId) -> Option<&Allocation> {
        id.to_index().and_then(|index| self.allocations.get(index))
    }

    /// Returns the result with the given identifier.
    #[must_use]
    pub fn result(&self, id: ResultId) -> Option<&ComputationResult> {
        id.to_index().and_then(|index| self.results.get(index))
    }

    /// Returns a mutable result with the given identifier.
    pub fn result_mut(&mut self, id: ResultId) -> Option<&mut ComputationResult> {
        id.to_index().and_then(|index| self.results.get_mut(index))
    }

    /// Returns the verification with the given identifier.
    #[must_use]
    pub fn verification(&self, id: VerificationId) -> Option<&Verification> {
        id.to_index().and_then(|index| self.verifications.get(index))
    }

    /// Returns a mutable verification with the given identifier.
    pub fn verification_mut(&mut self, id: VerificationId) -> Option<&mut Verification> {
        id.to_index().and_then(|index| self.verifications.get_mut(index))
    }

    /// Returns verifications recorded for a result, in identifier order.
    pub fn verifications_for(&self, result_id: ResultId) -> impl Iterator<Item = &Verification> {
        self.verifications.iter().filter(move |verification| verification.result_id == result_id)
    }
}
