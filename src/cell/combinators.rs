//! Combinators building computation graphs out of completion cells
//!
//! Every combinator registers one or more continuations on its input cells
//! and returns a fresh output cell, whose completer is owned by those
//! continuations. Nothing blocks: the output cell settles whenever its inputs
//! do, on whichever thread settles them (or on an executor for the `_async`
//! variants).
//!
//! User-provided functions never run under a cell lock. A panic inside them is
//! caught at the combinator boundary and becomes the failure of the output
//! cell. Failures of the inputs propagate to the output without running the
//! user function, except in the recovery combinators (`handle`,
//! `exceptionally`) whose purpose is precisely to look at them.

use crate::cell::{CompletionCell, Placement};
use crate::completer::Completer;
use crate::error::{Error, Result};
use crate::executor::ExecutorHandle;
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, trace};


/// Run a user function, turning a panic into a failure
fn guarded<R>(f: impl FnOnce() -> R) -> Result<R> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(Error::from_panic)
}


impl<T: Clone + Send + 'static> CompletionCell<T> {
    /// Create a cell which is settled by running a function on an executor
    ///
    /// If the cell is cancelled before the executor gets to it, the function
    /// is not run at all.
    ///
    pub fn supply_async<F>(executor: &ExecutorHandle, f: F) -> Self
        where F: FnOnce() -> T + Send + 'static
    {
        let (completer, out) = Self::pair();
        executor.submit(Box::new(move || {
            if completer.is_cancelled() {
                trace!("cell cancelled before its supplier ran");
                return;
            }
            completer.settle(guarded(f));
        }));
        out
    }

    /// Register a stage producing a new cell, which the stage is in charge of
    /// settling. Stages whose output was cancelled are skipped.
    fn derive<U, F>(&self, placement: Placement, stage: F) -> CompletionCell<U>
        where U: Clone + Send + 'static,
              F: FnOnce(Result<T>, Completer<U>) + Send + 'static
    {
        let (completer, out) = CompletionCell::pair();
        self.register(placement, move |outcome| {
            if completer.is_cancelled() {
                trace!("output cell cancelled, skipping stage");
                return;
            }
            stage(outcome, completer);
        });
        out
    }

    fn apply_with<U, F>(&self, placement: Placement, f: F) -> CompletionCell<U>
        where U: Clone + Send + 'static,
              F: FnOnce(T) -> Result<U> + Send + 'static
    {
        self.derive(placement, move |outcome, completer| {
            let outcome = outcome.and_then(|value| guarded(move || f(value)))
                                 .and_then(|result| result);
            completer.settle(outcome);
        })
    }

    /// Transform the value of the cell once it has settled successfully
    ///
    /// The function runs inline, on whichever thread settles this cell, or
    /// right away on the calling thread if the cell has already settled.
    ///
    pub fn then_apply<U, F>(&self, f: F) -> CompletionCell<U>
        where U: Clone + Send + 'static,
              F: FnOnce(T) -> U + Send + 'static
    {
        self.apply_with(Placement::Inline, move |value| Ok(f(value)))
    }

    /// Like `then_apply`, but the function runs on an executor
    pub fn then_apply_async<U, F>(&self,
                                  executor: &ExecutorHandle,
                                  f: F) -> CompletionCell<U>
        where U: Clone + Send + 'static,
              F: FnOnce(T) -> U + Send + 'static
    {
        self.apply_with(Placement::Executor(executor.clone()),
                        move |value| Ok(f(value)))
    }

    /// Transform the value of the cell with a function which may fail
    pub fn then_try_apply<U, F>(&self, f: F) -> CompletionCell<U>
        where U: Clone + Send + 'static,
              F: FnOnce(T) -> Result<U> + Send + 'static
    {
        self.apply_with(Placement::Inline, f)
    }

    /// Like `then_try_apply`, but the function runs on an executor
    pub fn then_try_apply_async<U, F>(&self,
                                      executor: &ExecutorHandle,
                                      f: F) -> CompletionCell<U>
        where U: Clone + Send + 'static,
              F: FnOnce(T) -> Result<U> + Send + 'static
    {
        self.apply_with(Placement::Executor(executor.clone()), f)
    }

    /// Consume the value of the cell once it has settled successfully
    pub fn then_accept<F>(&self, f: F) -> CompletionCell<()>
        where F: FnOnce(T) + Send + 'static
    {
        self.then_apply(f)
    }

    /// Like `then_accept`, but the function runs on an executor
    pub fn then_accept_async<F>(&self,
                                executor: &ExecutorHandle,
                                f: F) -> CompletionCell<()>
        where F: FnOnce(T) + Send + 'static
    {
        self.then_apply_async(executor, f)
    }

    /// Run an action once the cell has settled successfully
    pub fn then_run<F>(&self, f: F) -> CompletionCell<()>
        where F: FnOnce() + Send + 'static
    {
        self.then_apply(move |_| f())
    }

    /// Like `then_run`, but the action runs on an executor
    pub fn then_run_async<F>(&self,
                             executor: &ExecutorHandle,
                             f: F) -> CompletionCell<()>
        where F: FnOnce() + Send + 'static
    {
        self.then_apply_async(executor, move |_| f())
    }

    fn compose_with<U, F>(&self, placement: Placement, f: F) -> CompletionCell<U>
        where U: Clone + Send + 'static,
              F: FnOnce(T) -> CompletionCell<U> + Send + 'static
    {
        self.derive(placement, move |outcome, completer| {
            match outcome.and_then(|value| guarded(move || f(value))) {
                Ok(inner) => inner.register(Placement::Inline, move |result| {
                    completer.settle(result);
                }),
                Err(error) => {
                    completer.fail(error);
                },
            }
        })
    }

    /// Chain another asynchronous computation after this one
    ///
    /// The function returns a cell of its own, and the output cell mirrors
    /// that cell's eventual outcome instead of wrapping it.
    ///
    pub fn then_compose<U, F>(&self, f: F) -> CompletionCell<U>
        where U: Clone + Send + 'static,
              F: FnOnce(T) -> CompletionCell<U> + Send + 'static
    {
        self.compose_with(Placement::Inline, f)
    }

    /// Like `then_compose`, but the function runs on an executor
    pub fn then_compose_async<U, F>(&self,
                                    executor: &ExecutorHandle,
                                    f: F) -> CompletionCell<U>
        where U: Clone + Send + 'static,
              F: FnOnce(T) -> CompletionCell<U> + Send + 'static
    {
        self.compose_with(Placement::Executor(executor.clone()), f)
    }

    /// Pair the values of this cell and another one
    ///
    /// The output succeeds once both inputs have succeeded, and fails with the
    /// first failure observed otherwise. If both inputs fail, the second
    /// failure is dropped.
    ///
    pub fn zip<U>(&self, other: &CompletionCell<U>) -> CompletionCell<(T, U)>
        where U: Clone + Send + 'static
    {
        let (completer, out) = CompletionCell::pair();
        let state = Arc::new(Mutex::new(ZipState {
            left: None,
            right: None,
            completer: Some(completer),
        }));

        let left_state = state.clone();
        self.register(Placement::Inline, move |outcome| {
            let mut state = left_state.lock();
            let ready = match outcome {
                Ok(left) => match state.right.take() {
                    Some(right) => {
                        state.completer.take().map(|c| (c, Ok((left, right))))
                    },
                    None => {
                        state.left = Some(left);
                        None
                    },
                },
                Err(error) => state.completer.take().map(|c| (c, Err(error))),
            };
            drop(state);
            if let Some((completer, outcome)) = ready {
                completer.settle(outcome);
            }
        });

        let right_state = state;
        other.register(Placement::Inline, move |outcome| {
            let mut state = right_state.lock();
            let ready = match outcome {
                Ok(right) => match state.left.take() {
                    Some(left) => {
                        state.completer.take().map(|c| (c, Ok((left, right))))
                    },
                    None => {
                        state.right = Some(right);
                        None
                    },
                },
                Err(error) => state.completer.take().map(|c| (c, Err(error))),
            };
            drop(state);
            if let Some((completer, outcome)) = ready {
                completer.settle(outcome);
            }
        });

        out
    }

    /// Merge the values of this cell and another one once both have succeeded
    pub fn then_combine<U, V, F>(&self,
                                 other: &CompletionCell<U>,
                                 f: F) -> CompletionCell<V>
        where U: Clone + Send + 'static,
              V: Clone + Send + 'static,
              F: FnOnce(T, U) -> V + Send + 'static
    {
        self.zip(other).then_apply(move |(left, right)| f(left, right))
    }

    /// Like `then_combine`, but the merge function runs on an executor
    pub fn then_combine_async<U, V, F>(&self,
                                       other: &CompletionCell<U>,
                                       executor: &ExecutorHandle,
                                       f: F) -> CompletionCell<V>
        where U: Clone + Send + 'static,
              V: Clone + Send + 'static,
              F: FnOnce(T, U) -> V + Send + 'static
    {
        self.zip(other)
            .then_apply_async(executor, move |(left, right)| f(left, right))
    }

    /// Consume the values of this cell and another one once both succeeded
    pub fn then_accept_both<U, F>(&self,
                                  other: &CompletionCell<U>,
                                  f: F) -> CompletionCell<()>
        where U: Clone + Send + 'static,
              F: FnOnce(T, U) + Send + 'static
    {
        self.zip(other).then_accept(move |(left, right)| f(left, right))
    }

    /// Transform the outcome of whichever of this cell and another one
    /// settles first
    ///
    /// If the first cell to settle fails, so does the output. No guarantee is
    /// made as to which cell wins when both settle at about the same time.
    ///
    pub fn apply_to_either<U, F>(&self,
                                 other: &CompletionCell<T>,
                                 f: F) -> CompletionCell<U>
        where U: Clone + Send + 'static,
              F: FnOnce(T) -> U + Send + 'static
    {
        Self::any_of([self, other]).then_apply(f)
    }

    /// Like `apply_to_either`, but the function runs on an executor
    pub fn apply_to_either_async<U, F>(&self,
                                       other: &CompletionCell<T>,
                                       executor: &ExecutorHandle,
                                       f: F) -> CompletionCell<U>
        where U: Clone + Send + 'static,
              F: FnOnce(T) -> U + Send + 'static
    {
        Self::any_of([self, other]).then_apply_async(executor, f)
    }

    /// Consume the value of whichever of this cell and another one settles
    /// first
    pub fn accept_either<F>(&self,
                            other: &CompletionCell<T>,
                            f: F) -> CompletionCell<()>
        where F: FnOnce(T) + Send + 'static
    {
        Self::any_of([self, other]).then_accept(f)
    }

    /// Mirror the outcome of whichever input cell settles first
    ///
    /// The outcomes of the other cells are discarded. Racing an empty set of
    /// cells fails immediately with `Error::NoInputs`.
    ///
    pub fn any_of<'a, I>(cells: I) -> Self
        where I: IntoIterator<Item = &'a CompletionCell<T>>
    {
        let cells: Vec<&CompletionCell<T>> = cells.into_iter().collect();
        if cells.is_empty() {
            debug!("any_of called without inputs");
            return Self::failed(Error::NoInputs);
        }

        let (completer, out) = Self::pair();
        let winner = Arc::new(Mutex::new(Some(completer)));
        for cell in cells {
            let winner = winner.clone();
            cell.register(Placement::Inline, move |outcome| {
                let completer = winner.lock().take();
                if let Some(completer) = completer {
                    completer.settle(outcome);
                }
            });
        }
        out
    }

    /// Collect the values of all input cells, in input order
    ///
    /// The output fails with the first failure observed. An empty set of
    /// cells yields an empty vector right away.
    ///
    pub fn all_of<'a, I>(cells: I) -> CompletionCell<Vec<T>>
        where I: IntoIterator<Item = &'a CompletionCell<T>>
    {
        let cells: Vec<&CompletionCell<T>> = cells.into_iter().collect();
        if cells.is_empty() {
            return CompletionCell::completed(Vec::new());
        }

        let (completer, out) = CompletionCell::pair();
        let state = Arc::new(Mutex::new(AllState {
            values: vec![None; cells.len()],
            remaining: cells.len(),
            completer: Some(completer),
        }));
        for (index, cell) in cells.into_iter().enumerate() {
            let state = state.clone();
            cell.register(Placement::Inline, move |outcome| {
                let mut state = state.lock();
                let ready = match outcome {
                    Ok(value) => {
                        state.values[index] = Some(value);
                        state.remaining -= 1;
                        if state.remaining == 0 {
                            let values: Vec<T> =
                                state.values.drain(..).flatten().collect();
                            state.completer.take().map(|c| (c, Ok(values)))
                        } else {
                            None
                        }
                    },
                    Err(error) => {
                        state.completer.take().map(|c| (c, Err(error)))
                    },
                };
                drop(state);
                if let Some((completer, outcome)) = ready {
                    completer.settle(outcome);
                }
            });
        }
        out
    }

    fn when_complete_with<F>(&self, placement: Placement, observer: F) -> Self
        where F: FnOnce(&Result<T>) + Send + 'static
    {
        self.derive(placement, move |outcome, completer| {
            let outcome = match guarded(|| observer(&outcome)) {
                Ok(()) => outcome,
                Err(error) => Err(error),
            };
            completer.settle(outcome);
        })
    }

    /// Observe the outcome of the cell for side effects
    ///
    /// The output mirrors this cell, unless the observer panics, in which
    /// case that panic supersedes the original outcome.
    ///
    pub fn when_complete<F>(&self, observer: F) -> Self
        where F: FnOnce(&Result<T>) + Send + 'static
    {
        self.when_complete_with(Placement::Inline, observer)
    }

    /// Like `when_complete`, but the observer runs on an executor
    pub fn when_complete_async<F>(&self,
                                  executor: &ExecutorHandle,
                                  observer: F) -> Self
        where F: FnOnce(&Result<T>) + Send + 'static
    {
        self.when_complete_with(Placement::Executor(executor.clone()), observer)
    }

    /// Map both the success and the failure of the cell to a new value
    pub fn handle<U, F>(&self, f: F) -> CompletionCell<U>
        where U: Clone + Send + 'static,
              F: FnOnce(Result<T>) -> U + Send + 'static
    {
        self.derive(Placement::Inline, move |outcome, completer| {
            completer.settle(guarded(move || f(outcome)));
        })
    }

    /// Recover from a failure of the cell by computing a replacement value
    pub fn exceptionally<F>(&self, f: F) -> Self
        where F: FnOnce(Error) -> T + Send + 'static
    {
        self.derive(Placement::Inline, move |outcome, completer| {
            let outcome = match outcome {
                Ok(value) => Ok(value),
                Err(error) => guarded(move || f(error)),
            };
            completer.settle(outcome);
        })
    }
}
//
impl CompletionCell<()> {
    /// Create a cell which is settled once an action has run on an executor
    pub fn run_async<F>(executor: &ExecutorHandle, f: F) -> Self
        where F: FnOnce() + Send + 'static
    {
        Self::supply_async(executor, f)
    }
}


/// Shared state of the two continuations of `zip`
struct ZipState<T, U>
    where T: Clone + Send + 'static,
          U: Clone + Send + 'static
{
    /// Value of the left input, if it came first
    left: Option<T>,

    /// Value of the right input, if it came first
    right: Option<U>,

    /// Taken by whichever continuation settles the output
    completer: Option<Completer<(T, U)>>,
}


/// Shared state of the continuations of `all_of`
struct AllState<T: Clone + Send + 'static> {
    values: Vec<Option<T>>,
    remaining: usize,
    completer: Option<Completer<Vec<T>>>,
}


/// Unit tests
#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::inline::InlineExecutor;
    use crate::status::CellStatus;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Check mapping of successful and failed cells
    #[test]
    fn then_apply() {
        let doubled = CompletionCell::completed(5).then_apply(|x| x * 2);
        assert_eq!(doubled.wait().unwrap(), 10);

        let called = Arc::new(AtomicBool::new(false));
        let c_called = called.clone();
        let failed = CompletionCell::<i32>::failed(Error::msg("E"))
            .then_apply(move |x| {
                c_called.store(true, Ordering::Relaxed);
                x * 2
            });
        assert_eq!(failed.wait().unwrap_err().to_string(), "E");
        assert!(!called.load(Ordering::Relaxed));
    }

    /// Check that mapping a pending cell waits for it
    #[test]
    fn then_apply_pending() {
        let (completer, cell) = CompletionCell::pair();
        let upper = cell.then_apply(|s: &str| s.to_uppercase());
        assert!(matches!(upper.status(), CellStatus::Pending));
        completer.complete("message");
        assert_eq!(upper.wait().unwrap(), "MESSAGE");
    }

    /// Check that failures of user functions are caught
    #[test]
    fn user_failures() {
        let cell = CompletionCell::completed(1);
        let panicked = cell.then_apply(|_| -> u8 { panic!("bad stage") });
        assert!(panicked.wait().unwrap_err().is_panic());

        let refused = cell.then_try_apply(|x| {
            if x > 0 { Err(Error::msg("too big")) } else { Ok(x) }
        });
        assert_eq!(refused.wait().unwrap_err().to_string(), "too big");
    }

    /// Check the unit-returning stages
    #[test]
    fn accept_and_run() {
        let seen = Arc::new(AtomicUsize::new(0));
        let c_seen = seen.clone();
        let accepted = CompletionCell::completed(3usize)
            .then_accept(move |x| c_seen.store(x, Ordering::Relaxed));
        assert!(accepted.wait().is_ok());
        assert_eq!(seen.load(Ordering::Relaxed), 3);

        let c_seen = seen.clone();
        let ran = CompletionCell::completed("ignored")
            .then_run(move || c_seen.store(9, Ordering::Relaxed));
        assert!(ran.wait().is_ok());
        assert_eq!(seen.load(Ordering::Relaxed), 9);
    }

    /// Check that composition flattens nested cells
    #[test]
    fn then_compose() {
        let composed = CompletionCell::completed(20)
            .then_compose(|x| CompletionCell::completed(x + 1));
        assert_eq!(composed.wait().unwrap(), 21);

        let (completer, inner) = CompletionCell::<u8>::pair();
        let composed = CompletionCell::completed(())
            .then_compose(move |_| inner);
        assert!(!composed.is_done());
        completer.fail(Error::msg("inner"));
        assert_eq!(composed.wait().unwrap_err().to_string(), "inner");

        let skipped = CompletionCell::<u8>::failed(Error::Cancelled)
            .then_compose(|_| -> CompletionCell<u8> { unreachable!() });
        assert!(skipped.wait().unwrap_err().is_cancelled());
    }

    /// Check that zip waits for both inputs
    #[test]
    fn zip_gating() {
        let (left_completer, left) = CompletionCell::pair();
        let (right_completer, right) = CompletionCell::pair();
        let both = left.then_combine(&right, |a: String, b: String| a + &b);

        right_completer.complete("message".to_owned());
        assert!(!both.is_done());
        left_completer.complete("MESSAGE".to_owned());
        assert_eq!(both.wait().unwrap(), "MESSAGEmessage");
    }

    /// Check that zip reports the first failure
    #[test]
    fn zip_failure() {
        let (left_completer, left) = CompletionCell::<u8>::pair();
        let right = CompletionCell::<u8>::pending();
        let both = left.zip(&right);

        left_completer.fail(Error::msg("left"));
        assert_eq!(both.wait().unwrap_err().to_string(), "left");
        right.fail(Error::msg("right"));
        assert_eq!(both.wait().unwrap_err().to_string(), "left");
    }

    /// Check that accept_both sees both values
    #[test]
    fn accept_both() {
        let result = Arc::new(Mutex::new(String::new()));
        let c_result = result.clone();
        let original = CompletionCell::completed("Message");
        let done = original.then_apply(|s| s.to_uppercase()).then_accept_both(
            &original.then_apply(|s| s.to_lowercase()),
            move |upper, lower| c_result.lock().push_str(&(upper + &lower)),
        );
        assert!(done.wait().is_ok());
        assert_eq!(*result.lock(), "MESSAGEmessage");
    }

    /// Check that either settles with one of its inputs
    #[test]
    fn either() {
        let a = CompletionCell::completed("a");
        let b = CompletionCell::completed("b");
        let winner = a.apply_to_either(&b, |s| s).wait().unwrap();
        assert!(winner == "a" || winner == "b");

        let pending = CompletionCell::pending();
        let failed = CompletionCell::<&str>::failed(Error::msg("first"));
        let out = pending.apply_to_either(&failed, |s| s);
        assert_eq!(out.wait().unwrap_err().to_string(), "first");
    }

    /// Check that any_of keeps the first outcome
    #[test]
    fn any_of() {
        let cells: Vec<CompletionCell<u8>> =
            (0..3).map(|_| CompletionCell::pending()).collect();
        let first = CompletionCell::any_of(&cells);
        assert!(!first.is_done());

        cells[1].complete(1);
        cells[0].complete(0);
        cells[2].fail(Error::Cancelled);
        assert_eq!(first.wait().unwrap(), 1);
    }

    /// Check the degenerate empty any_of
    #[test]
    fn any_of_empty() {
        let none = CompletionCell::<u8>::any_of(Vec::new().iter());
        assert!(matches!(none.wait(), Err(Error::NoInputs)));
    }

    /// Check that all_of keeps the input order
    #[test]
    fn all_of() {
        let cells: Vec<CompletionCell<u8>> =
            (0..3).map(|_| CompletionCell::pending()).collect();
        let all = CompletionCell::all_of(&cells);
        cells[2].complete(2);
        cells[0].complete(0);
        assert!(!all.is_done());
        cells[1].complete(1);
        assert_eq!(all.wait().unwrap(), vec![0, 1, 2]);

        let empty = CompletionCell::<u8>::all_of(Vec::new().iter());
        assert!(empty.wait().unwrap().is_empty());

        let failing = CompletionCell::all_of(&[
            CompletionCell::completed(1),
            CompletionCell::failed(Error::msg("second")),
        ]);
        assert_eq!(failing.wait().unwrap_err().to_string(), "second");
    }

    /// Check that when_complete observes without altering the outcome
    #[test]
    fn when_complete() {
        let seen = Arc::new(AtomicUsize::new(0));
        let c_seen = seen.clone();
        let mirrored = CompletionCell::completed(4usize).when_complete(
            move |outcome| c_seen.store(*outcome.as_ref().unwrap(),
                                        Ordering::Relaxed)
        );
        assert_eq!(mirrored.wait().unwrap(), 4);
        assert_eq!(seen.load(Ordering::Relaxed), 4);

        let superseded = CompletionCell::completed(4usize)
            .when_complete(|_| panic!("observer failure"));
        assert!(superseded.wait().unwrap_err().is_panic());
    }

    /// Check the recovery combinators
    #[test]
    fn recovery() {
        let recovered = CompletionCell::<u8>::failed(Error::msg("x"))
            .exceptionally(|_| 7);
        assert_eq!(recovered.wait().unwrap(), 7);

        let untouched = CompletionCell::completed(1u8).exceptionally(|_| 7);
        assert_eq!(untouched.wait().unwrap(), 1);

        let handled = CompletionCell::<u8>::failed(Error::Cancelled)
            .handle(|outcome| outcome.is_err());
        assert!(handled.wait().unwrap());

        let handled = CompletionCell::completed(2u8)
            .handle(|outcome| outcome.map_or(0, |x| x * 10));
        assert_eq!(handled.wait().unwrap(), 20);
    }

    /// Check that accept_either consumes the first value only
    #[test]
    fn accept_either() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let c_seen = seen.clone();
        let (completer, pending) = CompletionCell::pair();
        let accepted = pending.accept_either(
            &CompletionCell::completed("second"),
            move |s| c_seen.lock().push(s),
        );
        assert!(matches!(accepted.wait(), Ok(())));
        completer.complete("first");
        assert_eq!(*seen.lock(), vec!["second"]);

        let failed = CompletionCell::<u8>::failed(Error::msg("E"))
            .accept_either(&CompletionCell::pending(), |_| unreachable!());
        assert_eq!(failed.wait().unwrap_err().to_string(), "E");
    }

    /// Check that a cancelled output skips its stage
    #[test]
    fn cancelled_output() {
        let (completer, input) = CompletionCell::pair();
        let called = Arc::new(AtomicBool::new(false));
        let c_called = called.clone();
        let output = input.then_apply(move |x: u8| {
            c_called.store(true, Ordering::Relaxed);
            x
        });

        assert!(output.cancel());
        completer.complete(1);
        assert!(!called.load(Ordering::Relaxed));
        assert!(output.wait().unwrap_err().is_cancelled());
    }

    /// Check that dropping a pending input abandons its dependants
    #[test]
    fn abandoned_input() {
        let input = CompletionCell::<u8>::pending();
        let output = input.then_apply(|x| x + 1);
        drop(input);
        assert!(matches!(output.wait(), Err(Error::Abandoned)));
    }

    /// Check the async sources with a deterministic executor
    #[test]
    fn async_sources() {
        let executor = InlineExecutor::handle();
        let supplied = CompletionCell::supply_async(&executor, || 5);
        assert_eq!(supplied.wait().unwrap(), 5);

        let ran = Arc::new(AtomicBool::new(false));
        let c_ran = ran.clone();
        let unit = CompletionCell::<()>::run_async(&executor, move || {
            c_ran.store(true, Ordering::Relaxed)
        });
        assert!(unit.wait().is_ok());
        assert!(ran.load(Ordering::Relaxed));

        let mapped = supplied.then_apply_async(&executor, |x| x + 1);
        assert_eq!(mapped.wait().unwrap(), 6);

        let refused = supplied.then_try_apply_async(&executor, |x| {
            if x > 0 { Err(Error::msg("positive")) } else { Ok(x) }
        });
        assert_eq!(refused.wait().unwrap_err().to_string(), "positive");
    }
}
