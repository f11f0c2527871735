// crates/qubit-market-core/src/runtime/engine.rs
// ============================================================================
// Module: Qubit Market Engine
// Description: Deterministic ledger execution, operation logging, and audit.
// Purpose: Provide the single canonical execution path for market operations.
// Dependencies: crate::{core, interfaces, runtime}, serde, thiserror
// ============================================================================

//! ## Overview
//! [`Market`] is the single canonical execution path for the ledger. Every
//! mutating call loads the latest snapshot, applies the operation to a working
//! copy, appends a hashed [`OperationRecord`], persists the snapshot, and emits
//! an audit event. Rejected calls never reach the store. Operation-specific
//! entry points live in the sibling `registry`, `entanglement`, `allocation`,
//! and `verification` modules.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::BlockHeight;
use crate::core::GroupId;
use crate::core::HashAlgorithm;
use crate::core::HashDigest;
use crate::core::HashError;
use crate::core::JobId;
use crate::core::LedgerState;
use crate::core::MarketId;
use crate::core::OperationRecord;
use crate::core::PrincipalId;
use crate::core::ProcessorId;
use crate::core::ResultId;
use crate::core::TaskId;
use crate::core::VerificationId;
use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::digest_canonical;
use crate::interfaces::AuditSink;
use crate::interfaces::LedgerStore;
use crate::interfaces::StoreError;
use crate::runtime::audit::LedgerAuditEvent;

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Default entanglement window in blocks.
pub const DEFAULT_ENTANGLEMENT_WINDOW: u64 = 100;
/// Default maximum qubits per processor.
pub const DEFAULT_MAX_QUBITS: u32 = 4096;
/// Default maximum name length in bytes.
pub const DEFAULT_MAX_NAME_LEN: usize = 64;
/// Default maximum result hash length in bytes.
pub const DEFAULT_MAX_HASH_LEN: usize = 128;
/// Default minimum consensus threshold in whole percent.
pub const DEFAULT_MIN_CONSENSUS_THRESHOLD: u8 = 51;
/// Default maximum processors per entangled group.
pub const DEFAULT_MAX_GROUP_SIZE: usize = 64;

/// Tunable limits applied by the market engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketPolicy {
    /// Blocks after the last sync during which a group stays entangled.
    pub entanglement_window: u64,
    /// Maximum qubits a processor may register.
    pub max_qubits: u32,
    /// Maximum length of names and labels in bytes.
    pub max_name_len: usize,
    /// Maximum length of result hashes in bytes.
    pub max_hash_len: usize,
    /// Lowest consensus threshold a caller may request.
    pub min_consensus_threshold: u8,
    /// Maximum processors per entangled group.
    pub max_group_size: usize,
    /// Hash algorithm used for operation records.
    pub hash_algorithm: HashAlgorithm,
}

impl Default for MarketPolicy {
    fn default() -> Self {
        Self {
            entanglement_window: DEFAULT_ENTANGLEMENT_WINDOW,
            max_qubits: DEFAULT_MAX_QUBITS,
            max_name_len: DEFAULT_MAX_NAME_LEN,
            max_hash_len: DEFAULT_MAX_HASH_LEN,
            min_consensus_threshold: DEFAULT_MIN_CONSENSUS_THRESHOLD,
            max_group_size: DEFAULT_MAX_GROUP_SIZE,
            hash_algorithm: DEFAULT_HASH_ALGORITHM,
        }
    }
}

impl MarketPolicy {
    /// Validates policy limits.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::InvalidPolicy`] when a limit is out of range.
    pub fn validate(&self) -> Result<(), MarketError> {
        if self.entanglement_window == 0 {
            return Err(MarketError::InvalidPolicy(
                "entanglement_window must be greater than zero".to_string(),
            ));
        }
        if self.max_qubits == 0 {
            return Err(MarketError::InvalidPolicy(
                "max_qubits must be greater than zero".to_string(),
            ));
        }
        if self.max_name_len == 0 || self.max_hash_len == 0 {
            return Err(MarketError::InvalidPolicy(
                "length limits must be greater than zero".to_string(),
            ));
        }
        if !(51..=100).contains(&self.min_consensus_threshold) {
            return Err(MarketError::InvalidPolicy(
                "min_consensus_threshold must be within 51..=100".to_string(),
            ));
        }
        if self.max_group_size < 2 {
            return Err(MarketError::InvalidPolicy(
                "max_group_size must be at least 2".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Call Context
// ============================================================================

/// Caller and block height attached to every mutating request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    /// Calling principal.
    pub caller: PrincipalId,
    /// Height at which the call executes.
    pub block_height: BlockHeight,
}

impl CallContext {
    /// Creates a call context.
    #[must_use]
    pub fn new(caller: impl Into<PrincipalId>, block_height: u64) -> Self {
        Self {
            caller: caller.into(),
            block_height: BlockHeight::new(block_height),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Market engine errors.
#[derive(Debug, Error)]
pub enum MarketError {
    /// Policy limits are invalid.
    #[error("invalid market policy: {0}")]
    InvalidPolicy(String),
    /// Caller principal is malformed.
    #[error("invalid principal: {0:?}")]
    InvalidPrincipal(String),
    /// Request field failed validation.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Caller is not permitted to perform the action.
    #[error("unauthorized: {caller} may not {action}")]
    Unauthorized {
        /// Rejected caller.
        caller: PrincipalId,
        /// Attempted action.
        action: &'static str,
    },
    /// Processor does not exist.
    #[error("processor not found: {0}")]
    ProcessorNotFound(ProcessorId),
    /// Group does not exist.
    #[error("group not found: {0}")]
    GroupNotFound(GroupId),
    /// Job does not exist.
    #[error("job not found: {0}")]
    JobNotFound(JobId),
    /// Task does not exist.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),
    /// Result does not exist.
    #[error("result not found: {0}")]
    ResultNotFound(ResultId),
    /// Verification does not exist.
    #[error("verification not found: {0}")]
    VerificationNotFound(VerificationId),
    /// Lifecycle transition is not allowed from the current state.
    #[error("invalid {entity} transition from {from} to {to}")]
    InvalidTransition {
        /// Entity kind.
        entity: &'static str,
        /// Current state label.
        from: &'static str,
        /// Requested state label.
        to: &'static str,
    },
    /// Processor is not accepting allocations.
    #[error("processor {0} is not available")]
    ProcessorUnavailable(ProcessorId),
    /// Processor is too small for the task.
    #[error("processor {processor_id} has {available} qubits but the task requires {required}")]
    InsufficientQubits {
        /// Candidate processor.
        processor_id: ProcessorId,
        /// Qubits offered by the processor.
        available: u32,
        /// Qubits required by the task.
        required: u32,
    },
    /// Maintenance attempted to raise the error rate.
    #[error("maintenance may not raise the error rate from {current} to {requested}")]
    ErrorRateIncrease {
        /// Error rate before maintenance.
        current: u8,
        /// Requested error rate.
        requested: u8,
    },
    /// Group has drifted out of its entanglement window.
    #[error("group {0} is not entangled")]
    GroupNotEntangled(GroupId),
    /// Synchronization height does not advance the group clock.
    #[error("sync height {requested} must exceed last sync {last_sync}")]
    StaleSync {
        /// Previous synchronization height.
        last_sync: BlockHeight,
        /// Requested synchronization height.
        requested: BlockHeight,
    },
    /// Request height precedes the latest accepted operation.
    #[error("block height {requested} precedes last accepted height {last}")]
    StaleBlockHeight {
        /// Latest accepted height.
        last: BlockHeight,
        /// Requested height.
        requested: BlockHeight,
    },
    /// Processor does not belong to the job's group.
    #[error("processor {processor_id} is not a member of group {group_id}")]
    NotGroupMember {
        /// Reporting processor.
        processor_id: ProcessorId,
        /// Job group.
        group_id: GroupId,
    },
    /// Submission repeats an earlier one.
    #[error("duplicate submission: {0}")]
    Duplicate(String),
    /// Job completion attempted before every member reported.
    #[error("job {job_id} awaits results from {missing} processors")]
    ResultsOutstanding {
        /// Job being completed.
        job_id: JobId,
        /// Processors yet to report.
        missing: usize,
    },
    /// Verifier quorum did not reach the threshold.
    #[error(
        "consensus not reached: {approvals} of {verifiers} verifiers endorse (threshold {threshold}%)"
    )]
    ConsensusNotReached {
        /// Endorsing verifiers.
        approvals: usize,
        /// Listed verifiers.
        verifiers: usize,
        /// Requested threshold in whole percent.
        threshold: u8,
    },
    /// Identifier space for an entity kind is exhausted.
    #[error("ledger capacity exhausted for {0}")]
    CapacityExhausted(&'static str),
    /// Store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Hashing failure.
    #[error(transparent)]
    Hash(#[from] HashError),
}

impl MarketError {
    /// Returns a stable label for audit logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidPolicy(_) => "invalid_policy",
            Self::InvalidPrincipal(_) => "invalid_principal",
            Self::InvalidInput(_) => "invalid_input",
            Self::Unauthorized {
                ..
            } => "unauthorized",
            Self::ProcessorNotFound(_)
            | Self::GroupNotFound(_)
            | Self::JobNotFound(_)
            | Self::TaskNotFound(_)
            | Self::ResultNotFound(_)
            | Self::VerificationNotFound(_) => "not_found",
            Self::InvalidTransition {
                ..
            } => "invalid_transition",
            Self::ProcessorUnavailable(_) => "processor_unavailable",
            Self::InsufficientQubits {
                ..
            } => "insufficient_qubits",
            Self::ErrorRateIncrease {
                ..
            } => "error_rate_increase",
            Self::GroupNotEntangled(_) => "group_not_entangled",
            Self::StaleSync {
                ..
            } => "stale_sync",
            Self::StaleBlockHeight {
                ..
            } => "stale_block_height",
            Self::NotGroupMember {
                ..
            } => "not_group_member",
            Self::Duplicate(_) => "duplicate",
            Self::ResultsOutstanding {
                ..
            } => "results_outstanding",
            Self::ConsensusNotReached {
                ..
            } => "consensus_not_reached",
            Self::CapacityExhausted(_) => "capacity_exhausted",
            Self::Store(StoreError::Conflict {
                ..
            }) => "conflict",
            Self::Store(_) => "store",
            Self::Hash(_) => "hash",
        }
    }
}

// ============================================================================
// SECTION: Market Engine
// ============================================================================

/// Market engine implementing deterministic ledger execution.
pub struct Market<S, A> {
    /// Market identifier used as the store key.
    market_id: MarketId,
    /// Ledger store implementation.
    store: S,
    /// Audit sink implementation.
    audit: A,
    /// Engine limits.
    policy: MarketPolicy,
    /// Serializes this engine's load-apply-save cycles. Writers in other
    /// engines or processes are caught by the store's conditional save.
    write_lock: Mutex<()>,
}

impl<S, A> Market<S, A>
where
    S: LedgerStore,
    A: AuditSink,
{
    /// Creates a new market engine.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::InvalidPolicy`] when the policy fails validation.
    pub fn new(
        market_id: MarketId,
        store: S,
        audit: A,
        policy: MarketPolicy,
    ) -> Result<Self, MarketError> {
        policy.validate()?;
        Ok(Self {
            market_id,
            store,
            audit,
            policy,
            write_lock: Mutex::new(()),
        })
    }

    /// Returns the market identifier.
    #[must_use]
    pub const fn market_id(&self) -> &MarketId {
        &self.market_id
    }

    /// Returns the engine policy.
    #[must_use]
    pub const fn policy(&self) -> &MarketPolicy {
        &self.policy
    }

    /// Returns the latest ledger snapshot (empty when nothing was saved yet).
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Store`] when loading fails.
    pub fn snapshot(&self) -> Result<LedgerState, MarketError> {
        Ok(self
            .store
            .load(&self.market_id)?
            .unwrap_or_else(|| LedgerState::new(self.market_id.clone())))
    }

    /// Returns the canonical digest of the latest ledger snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError`] when loading or hashing fails.
    pub fn ledger_hash(&self) -> Result<HashDigest, MarketError> {
        Ok(self.snapshot()?.canonical_hash(self.policy.hash_algorithm)?)
    }

    /// Applies a mutating operation and records its outcome.
    pub(crate) fn execute<Req, Res, F>(
        &self,
        method: &'static str,
        context: &CallContext,
        request: &Req,
        apply: F,
    ) -> Result<Res, MarketError>
    where
        Req: Serialize,
        Res: Serialize,
        F: FnOnce(&mut LedgerState, &MarketPolicy) -> Result<Res, MarketError>,
    {
        let request_hash = match digest_canonical(self.policy.hash_algorithm, request) {
            Ok(digest) => digest,
            Err(err) => {
                let err = MarketError::from(err);
                self.record_rejection(method, context, &err, None);
                return Err(err);
            }
        };
        match self.apply_and_save(method, context, &request_hash, apply) {
            Ok((response, seq)) => {
                self.audit.record(&LedgerAuditEvent::accepted(
                    method,
                    &self.market_id,
                    &context.caller,
                    context.block_height,
                    seq,
                    request_hash,
                ));
                Ok(response)
            }
            Err(err) => {
                self.record_rejection(method, context, &err, Some(request_hash));
                Err(err)
            }
        }
    }

    /// Emits an audit event for a rejected call.
    fn record_rejection(
        &self,
        method: &'static str,
        context: &CallContext,
        err: &MarketError,
        request_hash: Option<HashDigest>,
    ) {
        self.audit.record(&LedgerAuditEvent::rejected(
            method,
            &self.market_id,
            &context.caller,
            context.block_height,
            err.kind(),
            request_hash,
        ));
    }

    /// Loads, mutates, logs, and saves the ledger under the write lock.
    ///
    /// The save only succeeds if the stored ledger still has the operation
    /// count that was loaded; otherwise the call fails with
    /// [`StoreError::Conflict`] and nothing is persisted.
    fn apply_and_save<Res, F>(
        &self,
        method: &'static str,
        context: &CallContext,
        request_hash: &HashDigest,
        apply: F,
    ) -> Result<(Res, u64), MarketError>
    where
        Res: Serialize,
        F: FnOnce(&mut LedgerState, &MarketPolicy) -> Result<Res, MarketError>,
    {
        if !context.caller.is_well_formed() {
            return Err(MarketError::InvalidPrincipal(context.caller.to_string()));
        }
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| StoreError::Store("market write lock poisoned".to_string()))?;
        let mut state = self.snapshot()?;
        let loaded_operations = state.operation_count();
        if let Some(last) = state.last_block_height
            && context.block_height < last
        {
            return Err(MarketError::StaleBlockHeight {
                last,
                requested: context.block_height,
            });
        }
        let response = apply(&mut state, &self.policy)?;
        let seq = next_seq(&state.operations);
        state.operations.push(OperationRecord {
            seq,
            method: method.to_string(),
            caller: context.caller.clone(),
            block_height: context.block_height,
            request_hash: request_hash.clone(),
            response_hash: digest_canonical(self.policy.hash_algorithm, &response)?,
        });
        state.last_block_height = Some(context.block_height);
        self.store.save(&state, loaded_operations)?;
        Ok((response, seq))
    }
}

// ============================================================================
// SECTION: Shared Helpers
// ============================================================================

/// Computes the next 1-based sequence number for an append-only list.
pub(crate) fn next_seq<T>(items: &[T]) -> u64 {
    u64::try_from(items.len()).map_or(u64::MAX, |len| len.saturating_add(1))
}

/// Rejects callers other than `owner`.
pub(crate) fn require_owner(
    caller: &PrincipalId,
    owner: &PrincipalId,
    action: &'static str,
) -> Result<(), MarketError> {
    if caller == owner {
        Ok(())
    } else {
        Err(MarketError::Unauthorized {
            caller: caller.clone(),
            action,
        })
    }
}

/// Validates a human-readable label (names, methods, kinds).
pub(crate) fn validate_label(
    field: &'static str,
    value: &str,
    max_len: usize,
) -> Result<(), MarketError> {
    if value.trim().is_empty() {
        return Err(MarketError::InvalidInput(format!("{field} must not be empty")));
    }
    if value.len() > max_len {
        return Err(MarketError::InvalidInput(format!(
            "{field} exceeds {max_len} bytes"
        )));
    }
    if value.chars().any(char::is_control) {
        return Err(MarketError::InvalidInput(format!(
            "{field} must not contain control characters"
        )));
    }
    Ok(())
}

/// Validates an opaque result hash.
pub(crate) fn validate_result_hash(value: &str, max_len: usize) -> Result<(), MarketError> {
    if value.is_empty() {
        return Err(MarketError::InvalidInput("result_hash must not be empty".to_string()));
    }
    if value.len() > max_len {
        return Err(MarketError::InvalidInput(format!(
            "result_hash exceeds {max_len} bytes"
        )));
    }
    if !value.chars().all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | ':')) {
        return Err(MarketError::InvalidInput(
            "result_hash must be ascii alphanumeric, '-', '_' or ':'".to_string(),
        ));
    }
    Ok(())
}
