// crates/qubit-market-core/src/core/verification.rs
// ============================================================================
// Module: Result Verification Records
// Description: Computation results, verifier attestations, and challenges.
// Purpose: Define canonical result and verification records.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Processor owners submit result hashes for tasks. Independent verifiers
//! attest to results; a group of verifiers can promote a result to
//! `consensus-verified` when enough of them hold confident, valid
//! attestations. Challenges halve the confidence of an attestation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::PrincipalId;
use crate::core::identifiers::ProcessorId;
use crate::core::identifiers::ResultId;
use crate::core::identifiers::TaskId;
use crate::core::identifiers::VerificationId;
use crate::core::time::BlockHeight;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Confidence assigned to a fresh verification.
pub const FULL_CONFIDENCE: u8 = 100;

// ============================================================================
// SECTION: Results
// ============================================================================

/// Verification status of a computation result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResultStatus {
    /// Awaiting verification.
    Pending,
    /// Accepted by a verifier.
    Verified,
    /// Rejected by a verifier.
    Rejected,
    /// Accepted by a verifier quorum.
    ConsensusVerified,
}

impl ResultStatus {
    /// Returns the stable label for the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Verified => "verified",
            Self::Rejected => "rejected",
            Self::ConsensusVerified => "consensus-verified",
        }
    }

    /// Returns true for statuses that count as verified.
    #[must_use]
    pub const fn is_verified(self) -> bool {
        matches!(self, Self::Verified | Self::ConsensusVerified)
    }
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Computation result submitted for a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputationResult {
    /// Result identifier.
    pub result_id: ResultId,
    /// Task the result answers.
    pub task_id: TaskId,
    /// Processor that produced the result.
    pub processor_id: ProcessorId,
    /// Submitting principal (processor owner).
    pub submitter: PrincipalId,
    /// Opaque result hash.
    pub result_hash: String,
    /// Current verification status.
    pub status: ResultStatus,
    /// Height at which the result was submitted.
    pub submitted_at: BlockHeight,
}

// ============================================================================
// SECTION: Verifications
// ============================================================================

/// Verifier attestation over a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    /// Verification identifier.
    pub verification_id: VerificationId,
    /// Attested result.
    pub result_id: ResultId,
    /// Attesting principal.
    pub verifier: PrincipalId,
    /// Verification method label (e.g. "Quantum State Tomography").
    pub method: String,
    /// Whether the verifier judged the result valid.
    pub is_valid: bool,
    /// Confidence in whole percent (0..=100).
    pub confidence: u8,
    /// Principals that challenged this attestation.
    pub challengers: Vec<PrincipalId>,
    /// Height at which the attestation was recorded.
    pub verified_at: BlockHeight,
}

impl Verification {
    /// Returns true when the attestation supports the result at `threshold`.
    #[must_use]
    pub const fn endorses(&self, threshold: u8) -> bool {
        self.is_valid && self.confidence >= threshold
    }
}
