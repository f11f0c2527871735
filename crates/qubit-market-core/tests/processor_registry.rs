// crates/qubit-market-core/tests/processor_registry.rs
// ============================================================================
// Module: Processor Registry Tests
// Description: Registration, status, and maintenance of processors.
// ============================================================================
//! ## Overview
//! Validates processor registration limits, owner-only mutations, and the
//! monotonic maintenance rule.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use qubit_market_core::BlockHeight;
use qubit_market_core::CallContext;
use qubit_market_core::MaintenanceRequest;
use qubit_market_core::MarketError;
use qubit_market_core::ProcessorId;
use qubit_market_core::ProcessorStatus;
use qubit_market_core::RegisterProcessorRequest;
use qubit_market_core::UpdateProcessorStatusRequest;

use crate::common::OTHER;
use crate::common::OWNER;
use crate::common::market;
use crate::common::register;

// ============================================================================
// SECTION: Registration
// ============================================================================

/// Tests a registered processor starts active with sequential ids.
#[test]
fn test_register_processor_assigns_sequential_ids() {
    let (market, _) = market();
    let alpha = register(&market, OWNER, 10, "Quantum Processor Alpha", 64, 5);
    let beta = register(&market, OTHER, 11, "Quantum Processor Beta", 128, 2);

    assert_eq!(alpha.get(), 1);
    assert_eq!(beta.get(), 2);

    let processor = market.get_processor(alpha).unwrap();
    assert_eq!(processor.name, "Quantum Processor Alpha");
    assert_eq!(processor.qubits, 64);
    assert_eq!(processor.error_rate, 5);
    assert_eq!(processor.owner.as_str(), OWNER);
    assert_eq!(processor.status, ProcessorStatus::Active);
    assert_eq!(processor.registered_at, BlockHeight::new(10));
    assert!(processor.last_maintenance.is_none());
    assert!(market.is_processor_available(alpha).unwrap());
}

/// Tests registration rejects zero qubits, oversized processors, and bad rates.
#[test]
fn test_register_processor_rejects_out_of_range_values() {
    let (market, _) = market();
    let cases = [(0_u32, 5_u8), (4097, 5), (64, 101)];
    for (qubits, error_rate) in cases {
        let err = market
            .register_processor(&RegisterProcessorRequest {
                context: CallContext::new(OWNER, 1),
                name: "Quantum Processor Alpha".to_string(),
                qubits,
                error_rate,
            })
            .unwrap_err();
        assert!(matches!(err, MarketError::InvalidInput(_)), "unexpected error: {err}");
    }
    assert!(market.snapshot().unwrap().processors.is_empty());
}

/// Tests registration rejects empty and oversized names.
#[test]
fn test_register_processor_rejects_bad_names() {
    let (market, _) = market();
    for name in [String::new(), "   ".to_string(), "x".repeat(65)] {
        let err = market
            .register_processor(&RegisterProcessorRequest {
                context: CallContext::new(OWNER, 1),
                name,
                qubits: 64,
                error_rate: 5,
            })
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
    }
}

/// Tests malformed principals are rejected before touching the ledger.
#[test]
fn test_register_processor_rejects_malformed_principal() {
    let (market, _) = market();
    let err = market
        .register_processor(&RegisterProcessorRequest {
            context: CallContext::new("ST1 BAD", 1),
            name: "Quantum Processor Alpha".to_string(),
            qubits: 64,
            error_rate: 5,
        })
        .unwrap_err();
    assert!(matches!(err, MarketError::InvalidPrincipal(_)));
}

// ============================================================================
// SECTION: Status
// ============================================================================

/// Tests the owner moves a processor into maintenance.
#[test]
fn test_update_status_returns_previous_status() {
    let (market, _) = market();
    let processor_id = register(&market, OWNER, 1, "Quantum Processor Alpha", 64, 5);

    let previous = market
        .update_processor_status(&UpdateProcessorStatusRequest {
            context: CallContext::new(OWNER, 2),
            processor_id,
            status: ProcessorStatus::Maintenance,
        })
        .unwrap();

    assert_eq!(previous, ProcessorStatus::Active);
    assert_eq!(market.get_processor(processor_id).unwrap().status, ProcessorStatus::Maintenance);
    assert!(!market.is_processor_available(processor_id).unwrap());
}

/// Tests only the owner may change status.
#[test]
fn test_update_status_rejects_non_owner() {
    let (market, _) = market();
    let processor_id = register(&market, OWNER, 1, "Quantum Processor Alpha", 64, 5);

    let err = market
        .update_processor_status(&UpdateProcessorStatusRequest {
            context: CallContext::new(OTHER, 2),
            processor_id,
            status: ProcessorStatus::Offline,
        })
        .unwrap_err();

    assert!(matches!(err, MarketError::Unauthorized { .. }));
    assert!(market.is_processor_available(processor_id).unwrap());
}

/// Tests unknown processors are reported as unavailable.
#[test]
fn test_unknown_processor_is_unavailable() {
    let (market, _) = market();
    let unknown = ProcessorId::from_raw(42).unwrap();
    assert!(!market.is_processor_available(unknown).unwrap());
    assert!(matches!(market.get_processor(unknown), Err(MarketError::ProcessorNotFound(_))));
}

// ============================================================================
// SECTION: Maintenance
// ============================================================================

/// Tests maintenance lowers the error rate and appends to the log.
#[test]
fn test_perform_maintenance_records_history() {
    let (market, _) = market();
    let processor_id = register(&market, OWNER, 1, "Quantum Processor Alpha", 64, 5);

    let record = market
        .perform_maintenance(&MaintenanceRequest {
            context: CallContext::new(OWNER, 20),
            processor_id,
            maintenance_type: "Quantum Gate Calibration".to_string(),
            new_error_rate: 2,
        })
        .unwrap();

    assert_eq!(record.seq, 1);
    assert_eq!(record.previous_error_rate, 5);
    assert_eq!(record.new_error_rate, 2);

    let processor = market.get_processor(processor_id).unwrap();
    assert_eq!(processor.error_rate, 2);
    assert_eq!(processor.last_maintenance, Some(BlockHeight::new(20)));
    assert_eq!(processor.maintenance_log, vec![record]);
}

/// Tests maintenance refuses to raise the error rate.
#[test]
fn test_perform_maintenance_rejects_error_rate_increase() {
    let (market, _) = market();
    let processor_id = register(&market, OWNER, 1, "Quantum Processor Alpha", 64, 2);

    let err = market
        .perform_maintenance(&MaintenanceRequest {
            context: CallContext::new(OWNER, 2),
            processor_id,
            maintenance_type: "Quantum Gate Calibration".to_string(),
            new_error_rate: 5,
        })
        .unwrap_err();

    assert!(matches!(err, MarketError::ErrorRateIncrease { current: 2, requested: 5 }));
    assert!(market.get_processor(processor_id).unwrap().maintenance_log.is_empty());
}

/// Tests maintenance by a non-owner is rejected.
#[test]
fn test_perform_maintenance_rejects_non_owner() {
    let (market, _) = market();
    let processor_id = register(&market, OWNER, 1, "Quantum Processor Alpha", 64, 5);

    let err = market
        .perform_maintenance(&MaintenanceRequest {
            context: CallContext::new(OTHER, 2),
            processor_id,
            maintenance_type: "Quantum Gate Calibration".to_string(),
            new_error_rate: 1,
        })
        .unwrap_err();

    assert_eq!(err.kind(), "unauthorized");
}
