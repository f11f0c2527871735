// crates/qubit-market-core/tests/allocation.rs
// ============================================================================
// Module: Allocation Tests
// Description: Task submission, allocation, execution, and estimates.
// ============================================================================
//! ## Overview
//! Validates the task lifecycle, allocation preconditions, and the completion
//! estimate.

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

use qubit_market_core::AllocateResourcesRequest;
use qubit_market_core::AllocationId;
use qubit_market_core::CallContext;
use qubit_market_core::MarketError;
use qubit_market_core::ProcessorId;
use qubit_market_core::ProcessorStatus;
use qubit_market_core::TaskExecutionRequest;
use qubit_market_core::TaskId;
use qubit_market_core::TaskStatus;
use qubit_market_core::UpdateProcessorStatusRequest;

use crate::common::OTHER;
use crate::common::OWNER;
use crate::common::TestMarket;
use crate::common::market;
use crate::common::register;
use crate::common::submit_task;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Allocates `task_id` to `processor_id` on behalf of `caller`.
fn allocate(
    market: &TestMarket,
    caller: &str,
    task_id: TaskId,
    processor_id: ProcessorId,
    height: u64,
) -> Result<AllocationId, MarketError> {
    market.allocate_resources(&AllocateResourcesRequest {
        context: CallContext::new(caller, height),
        task_id,
        processor_id,
    })
}

/// Builds an execution request for `task_id`.
fn execution(caller: &str, task_id: TaskId, height: u64) -> TaskExecutionRequest {
    TaskExecutionRequest {
        context: CallContext::new(caller, height),
        task_id,
    }
}

// ============================================================================
// SECTION: Submission
// ============================================================================

/// Tests a submitted task starts pending with an estimate of qubits * states.
#[test]
fn test_submit_task_starts_pending() {
    let (market, _) = market();
    let task_id = submit_task(&market, OTHER, 5, 32, 16);

    let task = market.get_task(task_id).unwrap();
    assert_eq!(task_id.get(), 1);
    assert_eq!(task.status, TaskStatus::Pending);
    assert!(task.allocation_id.is_none());
    assert_eq!(market.estimate_completion_time(task_id).unwrap(), 512);
}

/// Tests zero-sized tasks are rejected.
#[test]
fn test_submit_task_rejects_zero_sizes() {
    let (market, _) = market();
    for (qubits, states) in [(0_u32, 16_u32), (32, 0)] {
        let err = market
            .submit_task(&qubit_market_core::SubmitTaskRequest {
                context: CallContext::new(OTHER, 1),
                name: "Quantum Factorization".to_string(),
                qubits_required: qubits,
                superposition_states: states,
            })
            .unwrap_err();
        assert!(matches!(err, MarketError::InvalidInput(_)));
    }
}

/// Tests estimates for unknown tasks fail.
#[test]
fn test_estimate_unknown_task_fails() {
    let (market, _) = market();
    let err = market.estimate_completion_time(TaskId::from_raw(7).unwrap()).unwrap_err();
    assert!(matches!(err, MarketError::TaskNotFound(_)));
}

// ============================================================================
// SECTION: Allocation
// ============================================================================

/// Tests the full lifecycle pending -> allocated -> running -> completed.
#[test]
fn test_task_lifecycle_happy_path() {
    let (market, _) = market();
    let processor_id = register(&market, OWNER, 1, "Quantum Processor Alpha", 64, 5);
    let task_id = submit_task(&market, OTHER, 2, 32, 16);

    let allocation_id = allocate(&market, OTHER, task_id, processor_id, 3).unwrap();
    assert_eq!(allocation_id.get(), 1);

    let task = market.get_task(task_id).unwrap();
    assert_eq!(task.status, TaskStatus::Allocated);
    assert_eq!(task.allocation_id, Some(allocation_id));

    assert_eq!(market.start_task(&execution(OWNER, task_id, 4)).unwrap(), TaskStatus::Running);
    assert_eq!(
        market.complete_task(&execution(OWNER, task_id, 5)).unwrap(),
        TaskStatus::Completed
    );
    assert_eq!(market.get_task(task_id).unwrap().status, TaskStatus::Completed);
}

/// Tests allocation requires enough qubits on an active processor.
#[test]
fn test_allocate_checks_processor_capacity_and_status() {
    let (market, _) = market();
    let small = register(&market, OWNER, 1, "Quantum Processor Mini", 16, 5);
    let large = register(&market, OWNER, 1, "Quantum Processor Alpha", 64, 5);
    let task_id = submit_task(&market, OTHER, 2, 32, 16);

    let err = allocate(&market, OTHER, task_id, small, 3).unwrap_err();
    assert!(matches!(err, MarketError::InsufficientQubits { available: 16, required: 32, .. }));

    market
        .update_processor_status(&UpdateProcessorStatusRequest {
            context: CallContext::new(OWNER, 4),
            processor_id: large,
            status: ProcessorStatus::Maintenance,
        })
        .unwrap();
    let err = allocate(&market, OTHER, task_id, large, 5).unwrap_err();
    assert!(matches!(err, MarketError::ProcessorUnavailable(_)));

    assert!(market.snapshot().unwrap().allocations.is_empty());
    assert_eq!(market.get_task(task_id).unwrap().status, TaskStatus::Pending);
}

/// Tests only the submitter allocates and only once.
#[test]
fn test_allocate_requires_submitter_and_pending_task() {
    let (market, _) = market();
    let processor_id = register(&market, OWNER, 1, "Quantum Processor Alpha", 64, 5);
    let task_id = submit_task(&market, OTHER, 2, 32, 16);

    let err = allocate(&market, OWNER, task_id, processor_id, 3).unwrap_err();
    assert!(matches!(err, MarketError::Unauthorized { .. }));

    allocate(&market, OTHER, task_id, processor_id, 3).unwrap();
    let err = allocate(&market, OTHER, task_id, processor_id, 4).unwrap_err();
    assert!(matches!(
        err,
        MarketError::InvalidTransition { entity: "task", from: "allocated", to: "allocated" }
    ));
}

// ============================================================================
// SECTION: Execution
// ============================================================================

/// Tests execution is restricted to the allocated processor's owner.
#[test]
fn test_execution_requires_processor_owner() {
    let (market, _) = market();
    let processor_id = register(&market, OWNER, 1, "Quantum Processor Alpha", 64, 5);
    let task_id = submit_task(&market, OTHER, 2, 32, 16);
    allocate(&market, OTHER, task_id, processor_id, 3).unwrap();

    let err = market.start_task(&execution(OTHER, task_id, 4)).unwrap_err();
    assert!(matches!(err, MarketError::Unauthorized { .. }));
}

/// Tests transitions cannot skip states.
#[test]
fn test_execution_rejects_out_of_order_transitions() {
    let (market, _) = market();
    let processor_id = register(&market, OWNER, 1, "Quantum Processor Alpha", 64, 5);
    let task_id = submit_task(&market, OTHER, 2, 32, 16);

    let err = market.start_task(&execution(OWNER, task_id, 3)).unwrap_err();
    assert!(matches!(err, MarketError::InvalidTransition { from: "pending", to: "running", .. }));

    allocate(&market, OTHER, task_id, processor_id, 3).unwrap();
    let err = market.complete_task(&execution(OWNER, task_id, 4)).unwrap_err();
    assert!(matches!(
        err,
        MarketError::InvalidTransition { from: "allocated", to: "completed", .. }
    ));
}
