// crates/qubit-market-core/src/runtime/allocation.rs
// ============================================================================
// Module: Allocation Operations
// Description: Task submission, processor allocation, and task execution.
// Purpose: Move computation tasks through their lifecycle.
// Dependencies: crate::{core, interfaces, runtime::engine}, serde
// ============================================================================

//! ## Overview
//! Tasks progress `pending -> allocated -> running -> completed`. The
//! submitter binds a pending task to an available processor with enough
//! qubits; the owner of that processor then starts and completes it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::Allocation;
use crate::core::AllocationId;
use crate::core::ComputationTask;
use crate::core::LedgerState;
use crate::core::PrincipalId;
use crate::core::ProcessorId;
use crate::core::TaskId;
use crate::core::TaskStatus;
use crate::interfaces::AuditSink;
use crate::interfaces::LedgerStore;
use crate::runtime::engine::CallContext;
use crate::runtime::engine::Market;
use crate::runtime::engine::MarketError;
use crate::runtime::engine::require_owner;
use crate::runtime::engine::validate_label;

// ============================================================================
// SECTION: Requests
// ============================================================================

/// Request to submit a computation task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitTaskRequest {
    /// Caller and height.
    pub context: CallContext,
    /// Display name.
    pub name: String,
    /// Qubits required.
    pub qubits_required: u32,
    /// Superposition states to explore.
    pub superposition_states: u32,
}

/// Request to bind a pending task to a processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocateResourcesRequest {
    /// Caller and height.
    pub context: CallContext,
    /// Task to allocate.
    pub task_id: TaskId,
    /// Candidate processor.
    pub processor_id: ProcessorId,
}

/// Request to start or complete an allocated task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskExecutionRequest {
    /// Caller and height.
    pub context: CallContext,
    /// Target task.
    pub task_id: TaskId,
}

// ============================================================================
// SECTION: Operations
// ============================================================================

impl<S, A> Market<S, A>
where
    S: LedgerStore,
    A: AuditSink,
{
    /// Submits a pending task and returns its identifier.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::InvalidInput`] for empty names or zero sizes.
    pub fn submit_task(&self, request: &SubmitTaskRequest) -> Result<TaskId, MarketError> {
        self.execute("task.submit", &request.context, request, |state, policy| {
            validate_label("name", &request.name, policy.max_name_len)?;
            if request.qubits_required == 0 || request.qubits_required > policy.max_qubits {
                return Err(MarketError::InvalidInput(format!(
                    "qubits_required must be within 1..={}",
                    policy.max_qubits
                )));
            }
            if request.superposition_states == 0 {
                return Err(MarketError::InvalidInput(
                    "superposition_states must be greater than zero".to_string(),
                ));
            }
            let task_id = TaskId::from_index(state.tasks.len())
                .ok_or(MarketError::CapacityExhausted("tasks"))?;
            state.tasks.push(ComputationTask {
                task_id,
                submitter: request.context.caller.clone(),
                name: request.name.clone(),
                qubits_required: request.qubits_required,
                superposition_states: request.superposition_states,
                status: TaskStatus::Pending,
                submitted_at: request.context.block_height,
                allocation_id: None,
            });
            Ok(task_id)
        })
    }

    /// Allocates a processor to a pending task.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError`] when the caller is not the submitter, the task
    /// is not pending, or the processor is unavailable or too small.
    pub fn allocate_resources(
        &self,
        request: &AllocateResourcesRequest,
    ) -> Result<AllocationId, MarketError> {
        self.execute("task.allocate", &request.context, request, |state, _| {
            let task =
                state.task(request.task_id).ok_or(MarketError::TaskNotFound(request.task_id))?;
            require_owner(&request.context.caller, &task.submitter, "allocate task")?;
            ensure_task_status(task, TaskStatus::Pending, TaskStatus::Allocated)?;
            let qubits_required = task.qubits_required;
            let processor = state
                .processor(request.processor_id)
                .ok_or(MarketError::ProcessorNotFound(request.processor_id))?;
            if !processor.is_available() {
                return Err(MarketError::ProcessorUnavailable(request.processor_id));
            }
            if processor.qubits < qubits_required {
                return Err(MarketError::InsufficientQubits {
                    processor_id: request.processor_id,
                    available: processor.qubits,
                    required: qubits_required,
                });
            }
            let allocation_id = AllocationId::from_index(state.allocations.len())
                .ok_or(MarketError::CapacityExhausted("allocations"))?;
            state.allocations.push(Allocation {
                allocation_id,
                task_id: request.task_id,
                processor_id: request.processor_id,
                allocated_at: request.context.block_height,
            });
            let task = state
                .task_mut(request.task_id)
                .ok_or(MarketError::TaskNotFound(request.task_id))?;
            task.status = TaskStatus::Allocated;
            task.allocation_id = Some(allocation_id);
            Ok(allocation_id)
        })
    }

    /// Moves an allocated task to running.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError`] when the caller does not own the allocated
    /// processor or the task is not allocated.
    pub fn start_task(&self, request: &TaskExecutionRequest) -> Result<TaskStatus, MarketError> {
        self.execute("task.start", &request.context, request, |state, _| {
            advance_task(state, request, TaskStatus::Allocated, TaskStatus::Running)
        })
    }

    /// Moves a running task to completed.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError`] when the caller does not own the allocated
    /// processor or the task is not running.
    pub fn complete_task(&self, request: &TaskExecutionRequest) -> Result<TaskStatus, MarketError> {
        self.execute("task.complete", &request.context, request, |state, _| {
            advance_task(state, request, TaskStatus::Running, TaskStatus::Completed)
        })
    }

    /// Returns the estimated completion time of a task in blocks.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::TaskNotFound`] for unknown identifiers.
    pub fn estimate_completion_time(&self, task_id: TaskId) -> Result<u64, MarketError> {
        self.snapshot()?
            .task(task_id)
            .map(ComputationTask::estimated_time)
            .ok_or(MarketError::TaskNotFound(task_id))
    }

    /// Returns the task record.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::TaskNotFound`] for unknown identifiers.
    pub fn get_task(&self, task_id: TaskId) -> Result<ComputationTask, MarketError> {
        self.snapshot()?.task(task_id).cloned().ok_or(MarketError::TaskNotFound(task_id))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Rejects a transition unless the task is in `expected`.
fn ensure_task_status(
    task: &ComputationTask,
    expected: TaskStatus,
    next: TaskStatus,
) -> Result<(), MarketError> {
    if task.status == expected {
        Ok(())
    } else {
        Err(MarketError::InvalidTransition {
            entity: "task",
            from: task.status.as_str(),
            to: next.as_str(),
        })
    }
}

/// Returns the owner of the processor allocated to a task.
fn allocated_owner(state: &LedgerState, task: &ComputationTask) -> Result<PrincipalId, MarketError> {
    let allocation_id = task.allocation_id.ok_or(MarketError::InvalidTransition {
        entity: "task",
        from: task.status.as_str(),
        to: TaskStatus::Running.as_str(),
    })?;
    let allocation = state.allocation(allocation_id).ok_or_else(|| {
        MarketError::InvalidInput(format!("allocation {allocation_id} is missing"))
    })?;
    state
        .processor(allocation.processor_id)
        .map(|processor| processor.owner.clone())
        .ok_or(MarketError::ProcessorNotFound(allocation.processor_id))
}

/// Advances a task from `expected` to `next` on behalf of the processor owner.
fn advance_task(
    state: &mut LedgerState,
    request: &TaskExecutionRequest,
    expected: TaskStatus,
    next: TaskStatus,
) -> Result<TaskStatus, MarketError> {
    let task = state.task(request.task_id).ok_or(MarketError::TaskNotFound(request.task_id))?;
    ensure_task_status(task, expected, next)?;
    let owner = allocated_owner(state, task)?;
    require_owner(&request.context.caller, &owner, "execute task")?;
    let task =
        state.task_mut(request.task_id).ok_or(MarketError::TaskNotFound(request.task_id))?;
    task.status = next;
    Ok(next)
}
