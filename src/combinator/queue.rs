//! Fan-in: join an ordered list of promises into one promise of their values.
//!
//! # Policy
//!
//! Wait for all, then report. Every input runs to completion; the aggregate
//! then resolves with the values in input order if all succeeded, fails with
//! the failure of the lowest-indexed failing input otherwise, and is
//! cancelled only if some input was cancelled and none failed.
//!
//! An empty input list resolves immediately with an empty list and schedules
//! nothing.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Error;
use crate::promise::{Deliver, Promise};
use crate::task::{AsyncTaskContainer, TaskHandle};
use crate::tracing_compat::trace;
use crate::types::{CancelReason, Outcome};

/// Aggregates input outcomes under the wait-for-all policy.
///
/// A failure at index `i` becomes [`Error::aggregate`]`(i, cause)`. Among
/// cancellations the strongest reason wins.
pub fn aggregate_outcomes<T>(outcomes: Vec<Outcome<T>>) -> Outcome<Vec<T>> {
    let mut values = Vec::with_capacity(outcomes.len());
    let mut first_error: Option<Error> = None;
    let mut strongest_cancel: Option<CancelReason> = None;

    for (index, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Outcome::Ok(value) => values.push(value),
            Outcome::Err(err) => {
                if first_error.is_none() {
                    first_error = Some(Error::aggregate(index, err));
                }
            }
            Outcome::Cancelled(reason) => match &mut strongest_cancel {
                None => strongest_cancel = Some(reason),
                Some(existing) => {
                    existing.strengthen(&reason);
                }
            },
        }
    }

    match (first_error, strongest_cancel) {
        (Some(err), _) => Outcome::Err(err),
        (None, Some(reason)) => Outcome::Cancelled(reason),
        (None, None) => Outcome::Ok(values),
    }
}

struct FanIn<T: Send + 'static> {
    slots: Vec<Option<Outcome<T>>>,
    remaining: usize,
    deliver: Option<Deliver<Vec<T>>>,
}

impl<T: Send + 'static> FanIn<T> {
    fn record(state: &Mutex<Self>, index: usize, outcome: Outcome<T>) {
        let finished = {
            let mut state = state.lock();
            if state.slots[index].is_some() {
                return;
            }
            state.slots[index] = Some(outcome);
            state.remaining -= 1;
            if state.remaining > 0 {
                return;
            }
            let slots = std::mem::take(&mut state.slots);
            state.deliver.take().map(|deliver| (slots, deliver))
        };

        if let Some((slots, deliver)) = finished {
            trace!(inputs = slots.len(), "fan-in complete");
            let outcome = aggregate_outcomes(slots.into_iter().flatten().collect());
            deliver.forward(outcome);
        }
    }
}

/// Runs every promise and collects their values in input order.
///
/// The aggregate runs on the first input's context. Cancelling it cancels
/// every input.
pub fn queue<T: Send + 'static>(promises: Vec<Promise<T>>) -> Promise<Vec<T>> {
    let Some(first) = promises.first() else {
        return Promise::success(Vec::new());
    };
    let ctx = first.context().clone();

    Promise::derived(ctx, move |deliver| {
        let total = promises.len();
        let state = Arc::new(Mutex::new(FanIn {
            slots: (0..total).map(|_| None).collect(),
            remaining: total,
            deliver: Some(deliver),
        }));
        let tasks = Arc::new(AsyncTaskContainer::new());

        let prepared: Vec<_> = promises
            .into_iter()
            .enumerate()
            .map(|(index, promise)| {
                let state = Arc::clone(&state);
                promise.prepare(Box::new(move |outcome| FanIn::record(&state, index, outcome)))
            })
            .collect();
        for input in &prepared {
            tasks.add(input.handle());
        }
        for input in prepared {
            input.launch();
        }
        Some(tasks as TaskHandle)
    })
}

impl<T: Send + 'static> Promise<Vec<T>> {
    /// Joins `promises` into one promise of their values, in order.
    ///
    /// See [`queue`](crate::combinator::queue()) for the failure policy.
    pub fn queue(promises: Vec<Promise<T>>) -> Self {
        queue(promises)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::runtime::{ExecutionContext, ManualQueue};
    use crate::task::AsyncTask;
    use crate::test_utils::{init_test_logging, Recorder};

    fn run<T: Clone + Send + 'static>(promise: Promise<T>) -> Recorder<T> {
        let recorder = Recorder::new();
        let sink = recorder.clone();
        let _ = promise.sink(
            {
                let sink = sink.clone();
                move |v| sink.record(Outcome::Ok(v))
            },
            move |e| sink.record(Outcome::Err(e)),
        );
        recorder
    }

    #[test]
    fn empty_input_resolves_without_scheduling() {
        init_test_logging();
        let recorder = run(Promise::<Vec<u8>>::queue(Vec::new()));
        assert_eq!(recorder.snapshot(), vec![Outcome::Ok(Vec::new())]);
    }

    #[test]
    fn values_keep_input_order() {
        let queue_exec = ManualQueue::new();
        let ctx = queue_exec.context("q");
        let inputs = (0..5_u32)
            .map(|i| {
                Promise::new(ctx.clone(), move |deliver| {
                    deliver.resolve(i * 10);
                    None
                })
            })
            .collect();
        let recorder = run(queue(inputs));
        queue_exec.run_until_idle();
        assert_eq!(recorder.snapshot(), vec![Outcome::Ok(vec![0, 10, 20, 30, 40])]);
    }

    #[test]
    fn waits_for_all_and_reports_lowest_index() {
        let (tx, rx) = std::sync::mpsc::channel();
        let inputs: Vec<Promise<u8>> = (0..3)
            .map(|i| {
                let tx = tx.clone();
                Promise::new(ExecutionContext::inline(), move |deliver| {
                    tx.send((i, deliver)).unwrap();
                    None
                })
            })
            .collect();
        let recorder = run(Promise::queue(inputs));
        let mut delivers: Vec<_> = rx.try_iter().collect();
        delivers.sort_by_key(|(i, _)| *i);
        let mut delivers = delivers.into_iter().map(|(_, d)| d);
        let (d0, d1, d2) = (
            delivers.next().unwrap(),
            delivers.next().unwrap(),
            delivers.next().unwrap(),
        );

        d2.reject(Error::failed("late"));
        assert!(recorder.is_empty());
        d1.reject(Error::failed("early"));
        assert!(recorder.is_empty());
        d0.resolve(1);

        let err = recorder.snapshot()[0].err().cloned().unwrap();
        assert_eq!(err.kind(), ErrorKind::AggregateFailure);
        assert_eq!(err.failed_input(), Some(1));
        assert_eq!(err.cause().and_then(Error::message), Some("early"));
    }

    #[test]
    fn cancel_reaches_every_input() {
        let tokens: Vec<_> = (0..3).map(|_| crate::task::CancelToken::new()).collect();
        let inputs: Vec<Promise<u8>> = tokens
            .iter()
            .map(|token| {
                let handle = token.handle();
                Promise::new(ExecutionContext::inline(), move |deliver| {
                    deliver.dismiss();
                    Some(handle)
                })
            })
            .collect();
        let task = queue(inputs).finally(|_| {});
        task.cancel();
        assert!(tokens.iter().all(crate::task::CancelToken::is_cancelled));
    }

    #[test]
    fn aggregate_prefers_error_over_cancel() {
        let outcomes = vec![
            Outcome::Cancelled(CancelReason::timeout()),
            Outcome::Err(Error::failed("x")),
            Outcome::Ok(3_u8),
        ];
        let err = aggregate_outcomes(outcomes).err().cloned().unwrap();
        assert_eq!(err.failed_input(), Some(1));
    }

    #[test]
    fn aggregate_keeps_strongest_cancel() {
        let outcomes: Vec<Outcome<u8>> = vec![
            Outcome::Cancelled(CancelReason::timeout()),
            Outcome::Cancelled(CancelReason::shutdown()),
        ];
        match aggregate_outcomes(outcomes) {
            Outcome::Cancelled(reason) => {
                assert_eq!(reason.kind(), crate::types::CancelKind::Shutdown);
            }
            other => panic!("expected cancellation, got {other:?}"),
        }
    }
}
