// crates/qubit-market-core/src/core/entanglement.rs
// ============================================================================
// Module: Entangled Group Records
// Description: Entangled processor groups and the parallel jobs they run.
// Purpose: Define canonical group, job, and per-processor result records.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! An entangled group binds two or more registered processors. A group stays
//! entangled while the blocks elapsed since its last synchronization are
//! below the configured window. Parallel jobs run on a group and complete once
//! every member processor has reported a result.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::GroupId;
use crate::core::identifiers::JobId;
use crate::core::identifiers::PrincipalId;
use crate::core::identifiers::ProcessorId;
use crate::core::time::BlockHeight;

// ============================================================================
// SECTION: Groups
// ============================================================================

/// Entangled processor group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntangledGroup {
    /// Group identifier.
    pub group_id: GroupId,
    /// Owning principal.
    pub owner: PrincipalId,
    /// Display name.
    pub name: String,
    /// Member processors (distinct, at least two).
    pub processor_ids: Vec<ProcessorId>,
    /// Entanglement kind label (e.g. "GHZ State").
    pub entanglement_type: String,
    /// Height at which the group was created.
    pub created_at: BlockHeight,
    /// Height of the latest synchronization.
    pub last_sync: BlockHeight,
}

impl EntangledGroup {
    /// Returns true when fewer than `window` blocks elapsed since the last sync.
    ///
    /// Heights before `last_sync` report false: only the latest sync is kept,
    /// so earlier entanglement cannot be reconstructed.
    #[must_use]
    pub const fn is_entangled_at(&self, current: BlockHeight, window: u64) -> bool {
        current.get() >= self.last_sync.get()
            && current.saturating_since(self.last_sync) < window
    }

    /// Returns true when the processor belongs to the group.
    #[must_use]
    pub fn contains(&self, processor_id: ProcessorId) -> bool {
        self.processor_ids.contains(&processor_id)
    }
}

// ============================================================================
// SECTION: Parallel Jobs
// ============================================================================

/// Lifecycle of a parallel job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job accepts processor results.
    Running,
    /// Job finished; results are frozen.
    Completed,
}

impl JobStatus {
    /// Returns the stable label for the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parallel job executed across an entangled group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParallelJob {
    /// Job identifier.
    pub job_id: JobId,
    /// Group executing the job.
    pub group_id: GroupId,
    /// Submitting principal.
    pub submitter: PrincipalId,
    /// Display name.
    pub name: String,
    /// Number of data partitions (always > 0).
    pub data_partitions: u32,
    /// Current job status.
    pub status: JobStatus,
    /// Height at which the job was submitted.
    pub submitted_at: BlockHeight,
    /// Height at which the job completed.
    pub completed_at: Option<BlockHeight>,
    /// Results reported by member processors, in submission order.
    pub results: Vec<ProcessorResult>,
}

impl ParallelJob {
    /// Returns true when the processor already reported for this job.
    #[must_use]
    pub fn has_result_from(&self, processor_id: ProcessorId) -> bool {
        self.results.iter().any(|result| result.processor_id == processor_id)
    }
}

/// Result hash reported by a single member processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorResult {
    /// Reporting processor.
    pub processor_id: ProcessorId,
    /// Opaque result hash.
    pub result_hash: String,
    /// Height at which the result was reported.
    pub submitted_at: BlockHeight,
}
