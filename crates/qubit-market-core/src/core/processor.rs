// crates/qubit-market-core/src/core/processor.rs
// ============================================================================
// Module: Processor Records
// Description: Registered quantum processors and their maintenance history.
// Purpose: Define the canonical processor record stored in the ledger.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A processor is a registered computing unit with a fixed qubit count, an
//! owner principal, an error rate, and an operating status. Only `active`
//! processors accept allocations.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::PrincipalId;
use crate::core::identifiers::ProcessorId;
use crate::core::time::BlockHeight;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum error rate, in whole percent.
pub const MAX_ERROR_RATE: u8 = 100;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Operating status of a processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessorStatus {
    /// Processor accepts allocations.
    Active,
    /// Processor is under maintenance.
    Maintenance,
    /// Processor is offline.
    Offline,
}

impl ProcessorStatus {
    /// Returns the stable label for the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Maintenance => "maintenance",
            Self::Offline => "offline",
        }
    }
}

impl fmt::Display for ProcessorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registered quantum processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Processor {
    /// Processor identifier.
    pub processor_id: ProcessorId,
    /// Owning principal.
    pub owner: PrincipalId,
    /// Display name.
    pub name: String,
    /// Number of qubits (always > 0).
    pub qubits: u32,
    /// Error rate in whole percent (0..=100).
    pub error_rate: u8,
    /// Current operating status.
    pub status: ProcessorStatus,
    /// Height at which the processor was registered.
    pub registered_at: BlockHeight,
    /// Height of the most recent maintenance, if any.
    pub last_maintenance: Option<BlockHeight>,
    /// Append-only maintenance history.
    pub maintenance_log: Vec<MaintenanceRecord>,
}

impl Processor {
    /// Returns true when the processor accepts allocations.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.status == ProcessorStatus::Active
    }
}

/// Single maintenance entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceRecord {
    /// 1-based sequence within the processor history.
    pub seq: u64,
    /// Maintenance kind (e.g. "Quantum Gate Calibration").
    pub maintenance_type: String,
    /// Error rate before maintenance.
    pub previous_error_rate: u8,
    /// Error rate after maintenance.
    pub new_error_rate: u8,
    /// Height at which maintenance was performed.
    pub performed_at: BlockHeight,
}
