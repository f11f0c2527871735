// crates/qubit-market-core/tests/entanglement.rs
// ============================================================================
// Module: Entanglement Tests
// Description: Entangled groups, synchronization, and parallel jobs.
// ============================================================================
//! ## Overview
//! Validates group membership rules, the entanglement window, and the parallel
//! job lifecycle from submission to completion.

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
use qubit_market_core::CompleteParallelJobRequest;
use qubit_market_core::CreateGroupRequest;
use qubit_market_core::JobId;
use qubit_market_core::JobStatus;
use qubit_market_core::MarketError;
use qubit_market_core::ProcessorId;
use qubit_market_core::SubmitParallelJobRequest;
use qubit_market_core::SubmitProcessorResultRequest;
use qubit_market_core::SynchronizeGroupRequest;

use crate::common::OTHER;
use crate::common::OWNER;
use crate::common::TestMarket;
use crate::common::entangled_pair;
use crate::common::market;
use crate::common::register;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Submits a job to `group_id` at `height` on behalf of `OWNER`.
fn submit_job(
    market: &TestMarket,
    group_id: qubit_market_core::GroupId,
    height: u64,
) -> Result<JobId, MarketError> {
    market.submit_parallel_job(&SubmitParallelJobRequest {
        context: CallContext::new(OWNER, height),
        group_id,
        name: "Distributed Shor".to_string(),
        data_partitions: 4,
    })
}

/// Reports a result for `processor_id` on `job_id`.
fn report(
    market: &TestMarket,
    caller: &str,
    job_id: JobId,
    processor_id: ProcessorId,
    height: u64,
) -> Result<usize, MarketError> {
    market.submit_processor_result(&SubmitProcessorResultRequest {
        context: CallContext::new(caller, height),
        job_id,
        processor_id,
        result_hash: format!("0x{:04x}", processor_id.get()),
    })
}

// ============================================================================
// SECTION: Groups
// ============================================================================

/// Tests a new group is synchronized at creation.
#[test]
fn test_create_group_is_entangled_at_creation() {
    let (market, _) = market();
    let (group_id, first, second) = entangled_pair(&market, 12_345);

    let group = market.get_group(group_id).unwrap();
    assert_eq!(group_id.get(), 1);
    assert_eq!(group.processor_ids, vec![first, second]);
    assert_eq!(group.entanglement_type, "GHZ State");
    assert_eq!(group.last_sync, BlockHeight::new(12_345));
    assert!(market.is_group_entangled(group_id, BlockHeight::new(12_345)).unwrap());
}

/// Tests groups need at least two distinct, registered processors.
#[test]
fn test_create_group_rejects_invalid_membership() {
    let (market, _) = market();
    let alpha = register(&market, OWNER, 1, "Quantum Processor Alpha", 64, 5);
    let unknown = ProcessorId::from_raw(99).unwrap();

    let cases = [vec![alpha], vec![alpha, alpha], vec![alpha, unknown]];
    for processor_ids in cases {
        let err = market
            .create_entangled_group(&CreateGroupRequest {
                context: CallContext::new(OWNER, 2),
                name: "Entangled Cluster".to_string(),
                processor_ids,
                entanglement_type: "GHZ State".to_string(),
            })
            .unwrap_err();
        assert!(
            matches!(err, MarketError::InvalidInput(_) | MarketError::ProcessorNotFound(_)),
            "unexpected error: {err}"
        );
    }
    assert!(market.snapshot().unwrap().groups.is_empty());
}

// ============================================================================
// SECTION: Synchronization
// ============================================================================

/// Tests synchronization advances the group clock and extends the window.
#[test]
fn test_synchronize_group_extends_window() {
    let (market, _) = market();
    let (group_id, _, _) = entangled_pair(&market, 12_345);

    let synced = market
        .synchronize_group(&SynchronizeGroupRequest {
            context: CallContext::new(OWNER, 12_400),
            group_id,
        })
        .unwrap();

    assert_eq!(synced, BlockHeight::new(12_400));
    assert!(market.is_group_entangled(group_id, BlockHeight::new(12_450)).unwrap());
    assert!(market.is_group_entangled(group_id, BlockHeight::new(12_499)).unwrap());
    assert!(!market.is_group_entangled(group_id, BlockHeight::new(12_500)).unwrap());
}

/// Tests heights before the latest synchronization are not reported entangled.
#[test]
fn test_group_is_not_entangled_before_last_sync() {
    let (market, _) = market();
    let (group_id, _, _) = entangled_pair(&market, 12_345);
    market
        .synchronize_group(&SynchronizeGroupRequest {
            context: CallContext::new(OWNER, 12_400),
            group_id,
        })
        .unwrap();

    assert!(!market.is_group_entangled(group_id, BlockHeight::new(12_399)).unwrap());
    assert!(!market.is_group_entangled(group_id, BlockHeight::new(12_344)).unwrap());
    assert!(!market.is_group_entangled(group_id, BlockHeight::new(0)).unwrap());
    assert!(market.is_group_entangled(group_id, BlockHeight::new(12_400)).unwrap());
}

/// Tests synchronization must strictly advance and is owner-only.
#[test]
fn test_synchronize_group_rejects_stale_or_foreign_calls() {
    let (market, _) = market();
    let (group_id, _, _) = entangled_pair(&market, 100);

    let stale = market
        .synchronize_group(&SynchronizeGroupRequest {
            context: CallContext::new(OWNER, 100),
            group_id,
        })
        .unwrap_err();
    assert!(matches!(stale, MarketError::StaleSync { .. }));

    let foreign = market
        .synchronize_group(&SynchronizeGroupRequest {
            context: CallContext::new(OTHER, 150),
            group_id,
        })
        .unwrap_err();
    assert!(matches!(foreign, MarketError::Unauthorized { .. }));
}

// ============================================================================
// SECTION: Parallel Jobs
// ============================================================================

/// Tests jobs are refused once the window lapses.
#[test]
fn test_submit_job_requires_entangled_group() {
    let (market, _) = market();
    let (group_id, _, _) = entangled_pair(&market, 1_000);

    let err = submit_job(&market, group_id, 1_100).unwrap_err();
    assert!(matches!(err, MarketError::GroupNotEntangled(_)));

    market
        .synchronize_group(&SynchronizeGroupRequest {
            context: CallContext::new(OWNER, 1_150),
            group_id,
        })
        .unwrap();
    assert_eq!(submit_job(&market, group_id, 1_160).unwrap().get(), 1);
}

/// Tests the full job lifecycle across both member processors.
#[test]
fn test_parallel_job_completes_after_all_members_report() {
    let (market, _) = market();
    let (group_id, first, second) = entangled_pair(&market, 10);
    let job_id = submit_job(&market, group_id, 11).unwrap();

    assert_eq!(report(&market, OWNER, job_id, first, 12).unwrap(), 1);

    let early = market
        .complete_parallel_job(&CompleteParallelJobRequest {
            context: CallContext::new(OWNER, 13),
            job_id,
        })
        .unwrap_err();
    assert!(matches!(early, MarketError::ResultsOutstanding { missing: 1, .. }));

    assert_eq!(report(&market, OWNER, job_id, second, 14).unwrap(), 2);
    let completed_at = market
        .complete_parallel_job(&CompleteParallelJobRequest {
            context: CallContext::new(OWNER, 15),
            job_id,
        })
        .unwrap();

    let job = market.get_job(job_id).unwrap();
    assert_eq!(completed_at, BlockHeight::new(15));
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.completed_at, Some(BlockHeight::new(15)));
    assert_eq!(job.results.len(), 2);
}

/// Tests duplicate, foreign, and non-member reports are rejected.
#[test]
fn test_submit_processor_result_guards() {
    let (market, _) = market();
    let (group_id, first, _) = entangled_pair(&market, 10);
    let outsider = register(&market, OWNER, 10, "Quantum Processor Gamma", 32, 4);
    let job_id = submit_job(&market, group_id, 11).unwrap();

    report(&market, OWNER, job_id, first, 12).unwrap();
    assert!(matches!(
        report(&market, OWNER, job_id, first, 13),
        Err(MarketError::Duplicate(_))
    ));
    assert!(matches!(
        report(&market, OTHER, job_id, first, 13),
        Err(MarketError::Unauthorized { .. })
    ));
    assert!(matches!(
        report(&market, OWNER, job_id, outsider, 13),
        Err(MarketError::NotGroupMember { .. })
    ));
}

/// Tests completed jobs no longer accept results.
#[test]
fn test_completed_job_is_frozen() {
    let (market, _) = market();
    let (group_id, first, second) = entangled_pair(&market, 10);
    let job_id = submit_job(&market, group_id, 11).unwrap();
    report(&market, OWNER, job_id, first, 12).unwrap();
    report(&market, OWNER, job_id, second, 12).unwrap();
    market
        .complete_parallel_job(&CompleteParallelJobRequest {
            context: CallContext::new(OWNER, 13),
            job_id,
        })
        .unwrap();

    let err = market
        .complete_parallel_job(&CompleteParallelJobRequest {
            context: CallContext::new(OWNER, 14),
            job_id,
        })
        .unwrap_err();
    assert!(matches!(err, MarketError::InvalidTransition { entity: "job", .. }));
}
