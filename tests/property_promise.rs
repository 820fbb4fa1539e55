//! Property-based tests for promise settlement.
//!
//! # RunOnce
//! - At most once: any number of consumers start the producer exactly once
//! - Multicast: every consumer sees the same value
//!
//! # Cancellation
//! - A delivery after cancel never reaches the terminal
//! - Exactly one terminal delivery per chain
//!
//! # Fan-in
//! - Values keep input order under any completion order
//! - The lowest-indexed failure is reported
//!
//! # CancelReason::strengthen
//! - Folding any set of reasons yields the most severe kind

#[macro_use]
mod common;

use common::*;
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tether::prelude::*;
use tether::CancelKind;

const ALL_CANCEL_KINDS: [CancelKind; 5] = [
    CancelKind::User,
    CancelKind::Timeout,
    CancelKind::RaceLost,
    CancelKind::Dropped,
    CancelKind::Shutdown,
];

fn arb_cancel_kind() -> impl Strategy<Value = CancelKind> {
    (0usize..ALL_CANCEL_KINDS.len()).prop_map(|idx| ALL_CANCEL_KINDS[idx])
}

/// Fan-in inputs as `(value, fails)` pairs.
fn arb_inputs() -> impl Strategy<Value = Vec<(u32, bool)>> {
    prop::collection::vec((any::<u32>(), prop::bool::weighted(0.2)), 0..12)
}

// ============================================================================
// RunOnce
// ============================================================================

proptest! {
    #![proptest_config(test_proptest_config(200))]

    /// Any number of consumers start the shared producer exactly once.
    #[test]
    fn run_once_starts_producer_once(consumers in 1usize..24, value in any::<u64>()) {
        init_test_logging();
        let queue = ManualQueue::new();
        let starts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&starts);
        let once = Promise::once(queue.context("prop"), move |deliver| {
            counter.fetch_add(1, Ordering::SeqCst);
            deliver.resolve(value);
            None
        });

        let recorders: Vec<Recorder<u64>> = (0..consumers).map(|_| Recorder::new()).collect();
        let _tasks: Vec<TaskHandle> = recorders.iter().map(|r| r.attach(once.sink())).collect();
        queue.run_until_idle();

        prop_assert_eq!(starts.load(Ordering::SeqCst), 1);
        for recorder in &recorders {
            prop_assert_eq!(recorder.snapshot(), vec![Outcome::Ok(value)]);
        }
    }

    /// Consumers that cancel never receive the value; the others all do.
    #[test]
    fn run_once_multicasts_to_remaining_consumers(
        cancel_mask in prop::collection::vec(any::<bool>(), 1..16),
    ) {
        init_test_logging();
        let queue = ManualQueue::new();
        let once = Promise::once(queue.context("prop"), |deliver| {
            deliver.resolve(7_u8);
            None
        });

        let recorders: Vec<Recorder<u8>> = cancel_mask.iter().map(|_| Recorder::new()).collect();
        let tasks: Vec<TaskHandle> = recorders.iter().map(|r| r.attach(once.sink())).collect();
        for (task, cancel) in tasks.iter().zip(&cancel_mask) {
            if *cancel {
                task.cancel();
            }
        }
        queue.run_until_idle();

        for (recorder, cancel) in recorders.iter().zip(&cancel_mask) {
            let outcomes = recorder.snapshot();
            prop_assert_eq!(outcomes.len(), 1);
            if *cancel {
                prop_assert!(outcomes[0].is_cancelled());
            } else {
                prop_assert_eq!(&outcomes[0], &Outcome::Ok(7));
            }
        }
    }
}

// ============================================================================
// Cancellation
// ============================================================================

proptest! {
    #![proptest_config(test_proptest_config(200))]

    /// Cancelling at any depth of a map chain before delivery suppresses the
    /// late value and delivers exactly one cancellation.
    #[test]
    fn cancel_before_delivery_suppresses_value(depth in 0usize..8, value in any::<i64>()) {
        init_test_logging();
        let stash = Arc::new(parking_lot::Mutex::new(None));
        let slot = Arc::clone(&stash);
        let mut promise = Promise::new(ExecutionContext::inline(), move |deliver: Deliver<i64>| {
            *slot.lock() = Some(deliver);
            None
        });
        for _ in 0..depth {
            promise = promise.map(|v| v.wrapping_add(1));
        }

        let recorder = Recorder::new();
        let task = recorder.attach(promise);
        task.cancel();
        if let Some(deliver) = stash.lock().take() {
            deliver.resolve(value);
        }

        let outcomes = recorder.snapshot();
        prop_assert_eq!(outcomes.len(), 1);
        prop_assert!(outcomes[0].is_cancelled());
    }

    /// A map chain over a settled value delivers exactly once, transformed
    /// once per stage.
    #[test]
    fn settled_chain_delivers_exactly_once(depth in 0usize..16, value in any::<i64>()) {
        init_test_logging();
        let queue = ManualQueue::new();
        let mut promise = Promise::ready(queue.context("prop"), Ok(value));
        for _ in 0..depth {
            promise = promise.map(|v| v.wrapping_add(1));
        }

        let recorder = Recorder::new();
        let task = recorder.attach(promise);
        queue.run_until_idle();
        task.cancel();
        queue.run_until_idle();

        prop_assert_eq!(recorder.snapshot(), vec![Outcome::Ok(value.wrapping_add(depth as i64))]);
    }
}

// ============================================================================
// Fan-in
// ============================================================================

proptest! {
    #![proptest_config(test_proptest_config(200))]

    /// Values keep input order; the first failing index is reported.
    #[test]
    fn fan_in_orders_values_and_failures(
        inputs in arb_inputs(),
        seed in any::<u64>(),
    ) {
        init_test_logging();
        let queue_exec = ManualQueue::new();
        let ctx = queue_exec.context("fan");

        // Each input parks its callback; the test completes them in a
        // shuffled order.
        let parked: Arc<parking_lot::Mutex<Vec<(usize, Deliver<u32>)>>> =
            Arc::new(parking_lot::Mutex::new(Vec::new()));
        let promises: Vec<Promise<u32>> = (0..inputs.len())
            .map(|index| {
                let parked = Arc::clone(&parked);
                Promise::new(ctx.clone(), move |deliver| {
                    parked.lock().push((index, deliver));
                    None
                })
            })
            .collect();

        let recorder = Recorder::new();
        let _task = recorder.attach(tether::queue(promises));
        queue_exec.run_until_idle();

        let mut pending = std::mem::take(&mut *parked.lock());
        let mut state = seed;
        while !pending.is_empty() {
            state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
            let pick = (state >> 33) as usize % pending.len();
            let (index, deliver) = pending.swap_remove(pick);
            let (value, fails) = inputs[index];
            if fails {
                deliver.reject(Error::failed(format!("input {index}")));
            } else {
                deliver.resolve(value);
            }
            queue_exec.run_until_idle();
        }

        let outcomes = recorder.snapshot();
        prop_assert_eq!(outcomes.len(), 1);
        match inputs.iter().position(|(_, fails)| *fails) {
            Some(first) => {
                let err = outcomes[0].err().cloned();
                prop_assert_eq!(err.and_then(|e| e.failed_input()), Some(first));
            }
            None => {
                let expected: Vec<u32> = inputs.iter().map(|(v, _)| *v).collect();
                prop_assert_eq!(&outcomes[0], &Outcome::Ok(expected));
            }
        }
    }
}

// ============================================================================
// CancelReason::strengthen
// ============================================================================

proptest! {
    #![proptest_config(test_proptest_config(300))]

    /// Folding reasons with strengthen keeps the most severe kind.
    #[test]
    fn strengthen_fold_yields_max(kinds in prop::collection::vec(arb_cancel_kind(), 1..8)) {
        init_test_logging();
        let mut folded = CancelReason::new(kinds[0]);
        for kind in &kinds[1..] {
            folded.strengthen(&CancelReason::new(*kind));
        }
        let strongest = kinds.iter().map(|k| k.severity()).max();
        prop_assert_eq!(Some(folded.kind().severity()), strongest);
    }
}
