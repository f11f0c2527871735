// crates/qubit-market-core/tests/proptest_market.rs
// ============================================================================
// Module: Market Property-Based Tests
// Description: Randomized checks for id assignment, estimates, and windows.
// Purpose: Ensure ledger arithmetic and ordering hold across inputs.
// ============================================================================
//! ## Overview
//! Exercises the market engine with randomized inputs to confirm sequential
//! identifier assignment, overflow-free completion estimates, and the
//! half-open entanglement window.

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
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use proptest::prelude::*;
use qubit_market_core::BlockHeight;
use qubit_market_core::MarketPolicy;

use crate::common::OWNER;
use crate::common::entangled_pair;
use crate::common::market;
use crate::common::market_with_policy;
use crate::common::register;
use crate::common::submit_task;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn processor_ids_are_sequential(count in 1_usize..12) {
        let (market, _) = market();
        for expected in 1..=count {
            let id = register(&market, OWNER, 1, "Quantum Processor", 64, 5);
            prop_assert_eq!(id.get(), u64::try_from(expected).unwrap());
        }
        let ledger = market.snapshot().unwrap();
        prop_assert_eq!(ledger.processors.len(), count);
        prop_assert_eq!(ledger.operations.len(), count);
    }

    #[test]
    fn estimate_is_exact_product(qubits in 1_u32..=4096, states in 1_u32..=u32::MAX) {
        let (market, _) = market();
        let task_id = submit_task(&market, OWNER, 1, qubits, states);
        let estimate = market.estimate_completion_time(task_id).unwrap();
        prop_assert_eq!(estimate, u64::from(qubits) * u64::from(states));
    }

    #[test]
    fn entanglement_window_is_half_open(
        window in 1_u64..1_000,
        sync in 0_u64..1_000_000,
        offset in 0_u64..2_000,
    ) {
        let (market, _) = market_with_policy(MarketPolicy {
            entanglement_window: window,
            ..MarketPolicy::default()
        });
        let (group_id, _, _) = entangled_pair(&market, sync);
        let entangled = market
            .is_group_entangled(group_id, BlockHeight::new(sync + offset))
            .unwrap();
        prop_assert_eq!(entangled, offset < window);
    }
}
