// crates/qubit-market-core/src/runtime/entanglement.rs
// ============================================================================
// Module: Entanglement Operations
// Description: Entangled groups, synchronization, and parallel jobs.
// Purpose: Coordinate multi-processor jobs within an entanglement window.
// Dependencies: crate::{core, interfaces, runtime::engine}, serde
// ============================================================================

//! ## Overview
//! An entangled group binds two or more registered processors. A group stays
//! entangled while fewer than `entanglement_window` blocks have elapsed since
//! its last synchronization; parallel jobs may only be submitted to entangled
//! groups. Each member processor reports one result hash per job, and the
//! job's submitter completes it once every member has reported.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

use crate::core::BlockHeight;
use crate::core::EntangledGroup;
use crate::core::GroupId;
use crate::core::JobId;
use crate::core::JobStatus;
use crate::core::ParallelJob;
use crate::core::ProcessorId;
use crate::core::ProcessorResult;
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

/// Request to create an entangled group owned by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateGroupRequest {
    /// Caller and height.
    pub context: CallContext,
    /// Display name.
    pub name: String,
    /// Member processors.
    pub processor_ids: Vec<ProcessorId>,
    /// Entanglement kind label.
    pub entanglement_type: String,
}

/// Request to resynchronize a group at the request height.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynchronizeGroupRequest {
    /// Caller and height.
    pub context: CallContext,
    /// Target group.
    pub group_id: GroupId,
}

/// Request to submit a parallel job to a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitParallelJobRequest {
    /// Caller and height.
    pub context: CallContext,
    /// Executing group.
    pub group_id: GroupId,
    /// Display name.
    pub name: String,
    /// Number of data partitions.
    pub data_partitions: u32,
}

/// Request to report one member processor's result for a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitProcessorResultRequest {
    /// Caller and height.
    pub context: CallContext,
    /// Target job.
    pub job_id: JobId,
    /// Reporting processor.
    pub processor_id: ProcessorId,
    /// Opaque result hash.
    pub result_hash: String,
}

/// Request to complete a parallel job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteParallelJobRequest {
    /// Caller and height.
    pub context: CallContext,
    /// Target job.
    pub job_id: JobId,
}

// ============================================================================
// SECTION: Operations
// ============================================================================

impl<S, A> Market<S, A>
where
    S: LedgerStore,
    A: AuditSink,
{
    /// Creates an entangled group synchronized at the request height.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError`] when the member list is too short, repeats a
    /// processor, or names an unknown processor.
    pub fn create_entangled_group(
        &self,
        request: &CreateGroupRequest,
    ) -> Result<GroupId, MarketError> {
        self.execute("group.create", &request.context, request, |state, policy| {
            validate_label("name", &request.name, policy.max_name_len)?;
            validate_label("entanglement_type", &request.entanglement_type, policy.max_name_len)?;
            let members = request.processor_ids.len();
            if members < 2 || members > policy.max_group_size {
                return Err(MarketError::InvalidInput(format!(
                    "groups require 2..={} processors",
                    policy.max_group_size
                )));
            }
            let mut seen = BTreeSet::new();
            for processor_id in &request.processor_ids {
                if !seen.insert(*processor_id) {
                    return Err(MarketError::InvalidInput(format!(
                        "processor {processor_id} listed more than once"
                    )));
                }
                if state.processor(*processor_id).is_none() {
                    return Err(MarketError::ProcessorNotFound(*processor_id));
                }
            }
            let group_id = GroupId::from_index(state.groups.len())
                .ok_or(MarketError::CapacityExhausted("groups"))?;
            state.groups.push(EntangledGroup {
                group_id,
                owner: request.context.caller.clone(),
                name: request.name.clone(),
                processor_ids: request.processor_ids.clone(),
                entanglement_type: request.entanglement_type.clone(),
                created_at: request.context.block_height,
                last_sync: request.context.block_height,
            });
            Ok(group_id)
        })
    }

    /// Resynchronizes a group and returns the new sync height.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::StaleSync`] unless the request height advances
    /// the group's last sync.
    pub fn synchronize_group(
        &self,
        request: &SynchronizeGroupRequest,
    ) -> Result<BlockHeight, MarketError> {
        self.execute("group.sync", &request.context, request, |state, _| {
            let group = state
                .group_mut(request.group_id)
                .ok_or(MarketError::GroupNotFound(request.group_id))?;
            require_owner(&request.context.caller, &group.owner, "synchronize group")?;
            if request.context.block_height <= group.last_sync {
                return Err(MarketError::StaleSync {
                    last_sync: group.last_sync,
                    requested: request.context.block_height,
                });
            }
            group.last_sync = request.context.block_height;
            Ok(group.last_sync)
        })
    }

    /// Submits a parallel job to an entangled group.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::GroupNotEntangled`] when the group's window has
    /// lapsed at the request height.
    pub fn submit_parallel_job(
        &self,
        request: &SubmitParallelJobRequest,
    ) -> Result<JobId, MarketError> {
        self.execute("job.submit", &request.context, request, |state, policy| {
            validate_label("name", &request.name, policy.max_name_len)?;
            if request.data_partitions == 0 {
                return Err(MarketError::InvalidInput(
                    "data_partitions must be greater than zero".to_string(),
                ));
            }
            let group = state
                .group(request.group_id)
                .ok_or(MarketError::GroupNotFound(request.group_id))?;
            if !group.is_entangled_at(request.context.block_height, policy.entanglement_window) {
                return Err(MarketError::GroupNotEntangled(request.group_id));
            }
            let job_id =
                JobId::from_index(state.jobs.len()).ok_or(MarketError::CapacityExhausted("jobs"))?;
            state.jobs.push(ParallelJob {
                job_id,
                group_id: request.group_id,
                submitter: request.context.caller.clone(),
                name: request.name.clone(),
                data_partitions: request.data_partitions,
                status: JobStatus::Running,
                submitted_at: request.context.block_height,
                completed_at: None,
                results: Vec::new(),
            });
            Ok(job_id)
        })
    }

    /// Records a member processor's result and returns how many members have
    /// reported so far.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError`] when the caller does not own the processor, the
    /// processor is not a member, or it already reported.
    pub fn submit_processor_result(
        &self,
        request: &SubmitProcessorResultRequest,
    ) -> Result<usize, MarketError> {
        self.execute("job.submit_result", &request.context, request, |state, policy| {
            validate_result_hash(&request.result_hash, policy.max_hash_len)?;
            let processor = state
                .processor(request.processor_id)
                .ok_or(MarketError::ProcessorNotFound(request.processor_id))?;
            require_owner(&request.context.caller, &processor.owner, "report for processor")?;
            let job = state.job(request.job_id).ok_or(MarketError::JobNotFound(request.job_id))?;
            let group_id = job.group_id;
            let group = state.group(group_id).ok_or(MarketError::GroupNotFound(group_id))?;
            if !group.contains(request.processor_id) {
                return Err(MarketError::NotGroupMember {
                    processor_id: request.processor_id,
                    group_id,
                });
            }
            let job = state
                .job_mut(request.job_id)
                .ok_or(MarketError::JobNotFound(request.job_id))?;
            if job.status != JobStatus::Running {
                return Err(MarketError::InvalidTransition {
                    entity: "job",
                    from: job.status.as_str(),
                    to: "result",
                });
            }
            if job.has_result_from(request.processor_id) {
                return Err(MarketError::Duplicate(format!(
                    "processor {} already reported for job {}",
                    request.processor_id, request.job_id
                )));
            }
            job.results.push(ProcessorResult {
                processor_id: request.processor_id,
                result_hash: request.result_hash.clone(),
                submitted_at: request.context.block_height,
            });
            Ok(job.results.len())
        })
    }

    /// Completes a job once every member processor has reported.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::ResultsOutstanding`] while members are missing.
    pub fn complete_parallel_job(
        &self,
        request: &CompleteParallelJobRequest,
    ) -> Result<BlockHeight, MarketError> {
        self.execute("job.complete", &request.context, request, |state, _| {
            let job = state.job(request.job_id).ok_or(MarketError::JobNotFound(request.job_id))?;
            require_owner(&request.context.caller, &job.submitter, "complete job")?;
            if job.status != JobStatus::Running {
                return Err(MarketError::InvalidTransition {
                    entity: "job",
                    from: job.status.as_str(),
                    to: JobStatus::Completed.as_str(),
                });
            }
            let group = state.group(job.group_id).ok_or(MarketError::GroupNotFound(job.group_id))?;
            let missing = group
                .processor_ids
                .iter()
                .filter(|processor_id| !job.has_result_from(**processor_id))
                .count();
            if missing > 0 {
                return Err(MarketError::ResultsOutstanding {
                    job_id: request.job_id,
                    missing,
                });
            }
            let job = state
                .job_mut(request.job_id)
                .ok_or(MarketError::JobNotFound(request.job_id))?;
            job.status = JobStatus::Completed;
            job.completed_at = Some(request.context.block_height);
            Ok(request.context.block_height)
        })
    }

    /// Returns true when the group exists and is entangled at `current`.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Store`] when the ledger cannot be loaded.
    pub fn is_group_entangled(
        &self,
        group_id: GroupId,
        current: BlockHeight,
    ) -> Result<bool, MarketError> {
        let window = self.policy().entanglement_window;
        Ok(self
            .snapshot()?
            .group(group_id)
            .is_some_and(|group| group.is_entangled_at(current, window)))
    }

    /// Returns the group record.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::GroupNotFound`] for unknown identifiers.
    pub fn get_group(&self, group_id: GroupId) -> Result<EntangledGroup, MarketError> {
        self.snapshot()?.group(group_id).cloned().ok_or(MarketError::GroupNotFound(group_id))
    }

    /// Returns the job record.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::JobNotFound`] for unknown identifiers.
    pub fn get_job(&self, job_id: JobId) -> Result<ParallelJob, MarketError> {
        self.snapshot()?.job(job_id).cloned().ok_or(MarketError::JobNotFound(job_id))
    }
}
