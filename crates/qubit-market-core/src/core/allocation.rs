// crates/qubit-market-core/src/core/allocation.rs
// ============================================================================
// Module: Task Allocation Records
// Description: Superposition computation tasks and processor allocations.
// Purpose: Define canonical task lifecycle and allocation records.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Tasks move through `pending -> allocated -> running -> completed`. The
//! estimated completion time of a task is the product of its required qubits
//! and superposition states.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::AllocationId;
use crate::core::identifiers::PrincipalId;
use crate::core::identifiers::ProcessorId;
use crate::core::identifiers::TaskId;
use crate::core::time::BlockHeight;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Lifecycle of a computation task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Submitted, awaiting allocation.
    Pending,
    /// Bound to a processor.
    Allocated,
    /// Executing on the allocated processor.
    Running,
    /// Execution finished.
    Completed,
}

impl TaskStatus {
    /// Returns the stable label for the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Allocated => "allocated",
            Self::Running => "running",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Computation task submitted to the market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputationTask {
    /// Task identifier.
    pub task_id: TaskId,
    /// Submitting principal.
    pub submitter: PrincipalId,
    /// Display name.
    pub name: String,
    /// Qubits required (always > 0).
    pub qubits_required: u32,
    /// Superposition states to explore (always > 0).
    pub superposition_states: u32,
    /// Current lifecycle status.
    pub status: TaskStatus,
    /// Height at which the task was submitted.
    pub submitted_at: BlockHeight,
    /// Allocation bound to the task, once allocated.
    pub allocation_id: Option<AllocationId>,
}

impl ComputationTask {
    /// Returns the estimated completion time in blocks.
    ///
    /// Both factors are `u32`, so the `u64` product cannot overflow.
    #[must_use]
    pub fn estimated_time(&self) -> u64 {
        u64::from(self.qubits_required) * u64::from(self.superposition_states)
    }
}

/// Binding of a task to a processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    /// Allocation identifier.
    pub allocation_id: AllocationId,
    /// Allocated task.
    pub task_id: TaskId,
    /// Processor executing the task.
    pub processor_id: ProcessorId,
    /// Height at which the allocation was made.
    pub allocated_at: BlockHeight,
}
