// crates/qubit-market-core/src/runtime/registry.rs
// ============================================================================
// Module: Processor Registry Operations
// Description: Registration, status changes, and maintenance of processors.
// Purpose: Maintain the processor catalog used by allocation and groups.
// Dependencies: crate::{core, interfaces, runtime::engine}, serde
// ============================================================================

//! ## Overview
//! Processors are registered by their owner and start out active. Only the
//! owner may change status or record maintenance, and maintenance may only
//! keep or lower the error rate.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::MAX_ERROR_RATE;
use crate::core::MaintenanceRecord;
use crate::core::Processor;
use crate::core::ProcessorId;
use crate::core::ProcessorStatus;
use crate::interfaces::AuditSink;
use crate::interfaces::LedgerStore;
use crate::runtime::engine::CallContext;
use crate::runtime::engine::Market;
use crate::runtime::engine::MarketError;
use crate::runtime::engine::next_seq;
use crate::runtime::engine::require_owner;
use crate::runtime::engine::validate_label;

// ============================================================================
// SECTION: Requests
// ============================================================================

/// Request to register a processor owned by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterProcessorRequest {
    /// Caller and height.
    pub context: CallContext,
    /// Display name.
    pub name: String,
    /// Number of qubits.
    pub qubits: u32,
    /// Error rate in whole percent.
    pub error_rate: u8,
}

/// Request to change a processor's operating status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateProcessorStatusRequest {
    /// Caller and height.
    pub context: CallContext,
    /// Target processor.
    pub processor_id: ProcessorId,
    /// New status.
    pub status: ProcessorStatus,
}

/// Request to record processor maintenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceRequest {
    /// Caller and height.
    pub context: CallContext,
    /// Target processor.
    pub processor_id: ProcessorId,
    /// Maintenance kind label.
    pub maintenance_type: String,
    /// Error rate after maintenance.
    pub new_error_rate: u8,
}

// ============================================================================
// SECTION: Operations
// ============================================================================

impl<S, A> Market<S, A>
where
    S: LedgerStore,
    A: AuditSink,
{
    /// Registers a new processor and returns its identifier.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError`] when validation or persistence fails.
    pub fn register_processor(
        &self,
        request: &RegisterProcessorRequest,
    ) -> Result<ProcessorId, MarketError> {
        self.execute("processor.register", &request.context, request, |state, policy| {
            validate_label("name", &request.name, policy.max_name_len)?;
            if request.qubits == 0 || request.qubits > policy.max_qubits {
                return Err(MarketError::InvalidInput(format!(
                    "qubits must be within 1..={}",
                    policy.max_qubits
                )));
            }
            if request.error_rate > MAX_ERROR_RATE {
                return Err(MarketError::InvalidInput(format!(
                    "error_rate must be within 0..={MAX_ERROR_RATE}"
                )));
            }
            let processor_id = ProcessorId::from_index(state.processors.len())
                .ok_or(MarketError::CapacityExhausted("processors"))?;
            state.processors.push(Processor {
                processor_id,
                owner: request.context.caller.clone(),
                name: request.name.clone(),
                qubits: request.qubits,
                error_rate: request.error_rate,
                status: ProcessorStatus::Active,
                registered_at: request.context.block_height,
                last_maintenance: None,
                maintenance_log: Vec::new(),
            });
            Ok(processor_id)
        })
    }

    /// Sets a processor's status and returns the previous one.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError`] when the processor is unknown or the caller is
    /// not its owner.
    pub fn update_processor_status(
        &self,
        request: &UpdateProcessorStatusRequest,
    ) -> Result<ProcessorStatus, MarketError> {
        self.execute("processor.update_status", &request.context, request, |state, _| {
            let processor = state
                .processor_mut(request.processor_id)
                .ok_or(MarketError::ProcessorNotFound(request.processor_id))?;
            require_owner(&request.context.caller, &processor.owner, "update processor status")?;
            let previous = processor.status;
            processor.status = request.status;
            Ok(previous)
        })
    }

    /// Records maintenance for a processor and returns the new log entry.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError`] when the caller is not the owner or the error
    /// rate would increase.
    pub fn perform_maintenance(
        &self,
        request: &MaintenanceRequest,
    ) -> Result<MaintenanceRecord, MarketError> {
        self.execute("processor.maintain", &request.context, request, |state, policy| {
            validate_label("maintenance_type", &request.maintenance_type, policy.max_name_len)?;
            let processor = state
                .processor_mut(request.processor_id)
                .ok_or(MarketError::ProcessorNotFound(request.processor_id))?;
            require_owner(&request.context.caller, &processor.owner, "perform maintenance")?;
            if request.new_error_rate > processor.error_rate {
                return Err(MarketError::ErrorRateIncrease {
                    current: processor.error_rate,
                    requested: request.new_error_rate,
                });
            }
            let record = MaintenanceRecord {
                seq: next_seq(&processor.maintenance_log),
                maintenance_type: request.maintenance_type.clone(),
                previous_error_rate: processor.error_rate,
                new_error_rate: request.new_error_rate,
                performed_at: request.context.block_height,
            };
            processor.error_rate = request.new_error_rate;
            processor.last_maintenance = Some(request.context.block_height);
            processor.maintenance_log.push(record.clone());
            Ok(record)
        })
    }

    /// Returns true when the processor exists and is active.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Store`] when the ledger cannot be loaded.
    pub fn is_processor_available(&self, processor_id: ProcessorId) -> Result<bool, MarketError> {
        Ok(self.snapshot()?.processor(processor_id).is_some_and(Processor::is_available))
    }

    /// Returns the processor record.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::ProcessorNotFound`] for unknown identifiers.
    pub fn get_processor(&self, processor_id: ProcessorId) -> Result<Processor, MarketError> {
        self.snapshot()?
            .processor(processor_id)
            .cloned()
            .ok_or(MarketError::ProcessorNotFound(processor_id))
    }
}
