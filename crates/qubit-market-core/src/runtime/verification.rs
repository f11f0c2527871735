// crates/qubit-market-core/src/runtime/verification.rs
// ============================================================================
// Module: Verification Operations
// Description: Result submission, attestations, consensus, and challenges.
// Purpose: Decide whether computation results can be trusted.
// Dependencies: crate::{core, interfaces, runtime::engine}, serde
// ============================================================================

//! ## Overview
//! A processor owner submits a result hash for a task. Independent verifiers
//! attest to it; the first attestation settles a pending result as verified or
//! rejected. Consensus verification promotes a result when enough listed
//! verifiers endorse it at the requested threshold, and challenges halve an
//! attestation's confidence so it may no longer count toward consensus.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

use crate::core::ComputationResult;
use crate::core::FULL_CONFIDENCE;
use crate::core::PrincipalId;
use crate::core::ProcessorId;
use crate::core::ResultId;
use crate::core::ResultStatus;
use crate::core::TaskId;
use crate::core::Verification;
use crate::core::VerificationId;
use crate::interfaces::AuditSink;
use crate::interfaces::LedgerStore;
use crate::runtime::engine::CallContext;
use crate::runtime::engine::Market;
use crate::runtime::engine::MarketError;
use crate::runtime::engine::require_owner;
use crate::runtime::engine::validate_label;
use crate::runtime::engine::validate_result_hash;

// ============================================================================
// SECTION: Requests
// ============================================================================

/// Request to submit a computation result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResultRequest {
    /// Caller and height.
    pub context: CallContext,
    /// Task the result answers.
    pub task_id: TaskId,
    /// Producing processor (owned by the caller).
    pub processor_id: ProcessorId,
    /// Opaque result hash.
    pub result_hash: String,
}

/// Request to attest to a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyResultRequest {
    /// Caller and height.
    pub context: CallContext,
    /// Attested result.
    pub result_id: ResultId,
    /// Verification method label.
    pub method: String,
    /// Verifier verdict.
    pub is_valid: bool,
}

/// Request to promote a result by verifier consensus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusVerifyRequest {
    /// Caller and height.
    pub context: CallContext,
    /// Candidate result.
    pub result_id: ResultId,
    /// Verifiers whose attestations are counted.
    pub verifiers: Vec<PrincipalId>,
    /// Threshold in whole percent.
    pub threshold: u8,
}

/// Request to challenge an attestation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeVerificationRequest {
    /// Caller and height.
    pub context: CallContext,
    /// Challenged attestation.
    pub verification_id: VerificationId,
}

// ============================================================================
// SECTION: Operations
// ============================================================================

impl<S, A> Market<S, A>
where
    S: LedgerStore,
    A: AuditSink,
{
    /// Submits a pending result for a task.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError`] when the task or processor is unknown, the
    /// caller does not own the processor, or the hash is malformed.
    pub fn submit_result(&self, request: &SubmitResultRequest) -> Result<ResultId, MarketError> {
        self.execute("result.submit", &request.context, request, |state, policy| {
            validate_result_hash(&request.result_hash, policy.max_hash_len)?;
            if state.task(request.task_id).is_none() {
                return Err(MarketError::TaskNotFound(request.task_id));
            }
            let processor = state
                .processor(request.processor_id)
                .ok_or(MarketError::ProcessorNotFound(request.processor_id))?;
            require_owner(&request.context.caller, &processor.owner, "submit result for processor")?;
            let result_id = ResultId::from_index(state.results.len())
                .ok_or(MarketError::CapacityExhausted("results"))?;
            state.results.push(ComputationResult {
                result_id,
                task_id: request.task_id,
                processor_id: request.processor_id,
                submitter: request.context.caller.clone(),
                result_hash: request.result_hash.clone(),
                status: ResultStatus::Pending,
                submitted_at: request.context.block_height,
            });
            Ok(result_id)
        })
    }

    /// Records the caller's attestation for a result.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError`] when the caller submitted the result or has
    /// already attested to it.
    pub fn verify_result(
        &self,
        request: &VerifyResultRequest,
    ) -> Result<VerificationId, MarketError> {
        self.execute("result.verify", &request.context, request, |state, policy| {
            validate_label("method", &request.method, policy.max_name_len)?;
            let caller = &request.context.caller;
            let result = state
                .result(request.result_id)
                .ok_or(MarketError::ResultNotFound(request.result_id))?;
            if &result.submitter == caller {
                return Err(MarketError::Unauthorized {
                    caller: caller.clone(),
                    action: "verify own result",
                });
            }
            if state.verifications_for(request.result_id).any(|v| &v.verifier == caller) {
                return Err(MarketError::Duplicate(format!(
                    "{caller} already verified result {}",
                    request.result_id
                )));
            }
            let verification_id = VerificationId::from_index(state.verifications.len())
                .ok_or(MarketError::CapacityExhausted("verifications"))?;
            state.verifications.push(Verification {
                verification_id,
                result_id: request.result_id,
                verifier: caller.clone(),
                method: request.method.clone(),
                is_valid: request.is_valid,
                confidence: FULL_CONFIDENCE,
                challengers: Vec::new(),
                verified_at: request.context.block_height,
            });
            let result = state
                .result_mut(request.result_id)
                .ok_or(MarketError::ResultNotFound(request.result_id))?;
            if result.status == ResultStatus::Pending {
                result.status =
                    if request.is_valid { ResultStatus::Verified } else { ResultStatus::Rejected };
            }
            Ok(verification_id)
        })
    }

    /// Promotes a result to consensus-verified and returns the number of
    /// endorsing verifiers.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::ConsensusNotReached`] when too few listed
    /// verifiers endorse the result at the threshold.
    pub fn consensus_verify(&self, request: &ConsensusVerifyRequest) -> Result<usize, MarketError> {
        self.execute("result.consensus", &request.context, request, |state, policy| {
            if request.threshold < policy.min_consensus_threshold || request.threshold > 100 {
                return Err(MarketError::InvalidInput(format!(
                    "threshold must be within {}..=100",
                    policy.min_consensus_threshold
                )));
            }
            let distinct: BTreeSet<&PrincipalId> = request.verifiers.iter().collect();
            if distinct.len() != request.verifiers.len() {
                return Err(MarketError::InvalidInput("verifiers must be distinct".to_string()));
            }
            if distinct.len() < 2 {
                return Err(MarketError::InvalidInput(
                    "consensus requires at least two verifiers".to_string(),
                ));
            }
            let result = state
                .result(request.result_id)
                .ok_or(MarketError::ResultNotFound(request.result_id))?;
            if result.status == ResultStatus::ConsensusVerified {
                return Err(MarketError::InvalidTransition {
                    entity: "result",
                    from: result.status.as_str(),
                    to: ResultStatus::ConsensusVerified.as_str(),
                });
            }
            let approvals = request
                .verifiers
                .iter()
                .filter(|verifier| {
                    state.verifications_for(request.result_id).any(|verification| {
                        &verification.verifier == *verifier
                            && verification.endorses(request.threshold)
                    })
                })
                .count();
            let required = usize::from(request.threshold).saturating_mul(request.verifiers.len());
            if approvals.saturating_mul(100) < required {
                return Err(MarketError::ConsensusNotReached {
                    approvals,
                    verifiers: request.verifiers.len(),
                    threshold: request.threshold,
                });
            }
            let result = state
                .result_mut(request.result_id)
                .ok_or(MarketError::ResultNotFound(request.result_id))?;
            result.status = ResultStatus::ConsensusVerified;
            Ok(approvals)
        })
    }

    /// Challenges an attestation and returns its reduced confidence.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError`] when the caller is the verifier or already
    /// challenged this attestation.
    pub fn challenge_verification(
        &self,
        request: &ChallengeVerificationRequest,
    ) -> Result<u8, MarketError> {
        self.execute("result.challenge", &request.context, request, |state, _| {
            let caller = &request.context.caller;
            let verification = state
                .verification_mut(request.verification_id)
                .ok_or(MarketError::VerificationNotFound(request.verification_id))?;
            if &verification.verifier == caller {
                return Err(MarketError::Unauthorized {
                    caller: caller.clone(),
                    action: "challenge own verification",
                });
            }
            if verification.challengers.contains(caller) {
                return Err(MarketError::Duplicate(format!(
                    "{caller} already challenged verification {}",
                    request.verification_id
                )));
            }
            verification.challengers.push(caller.clone());
            verification.confidence /= 2;
            Ok(verification.confidence)
        })
    }

    /// Returns true when the result exists and is verified or
    /// consensus-verified.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Store`] when the ledger cannot be loaded.
    pub fn is_result_verified(&self, result_id: ResultId) -> Result<bool, MarketError> {
        Ok(self.snapshot()?.result(result_id).is_some_and(|result| result.status.is_verified()))
    }

    /// Returns the result record.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::ResultNotFound`] for unknown identifiers.
    pub fn get_result(&self, result_id: ResultId) -> Result<ComputationResult, MarketError> {
        self.snapshot()?.result(result_id).cloned().ok_or(MarketError::ResultNotFound(result_id))
    }

    /// Returns the verification record.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::VerificationNotFound`] for unknown identifiers.
    pub fn get_verification(
        &self,
        verification_id: VerificationId,
    ) -> Result<Verification, MarketError> {
        self.snapshot()?
            .verification(verification_id)
            .cloned()
            .ok_or(MarketError::VerificationNotFound(verification_id))
    }
}
