//! Single-assignment result cells
//!
//! This module provides the `CompletionCell`, a container for the outcome of
//! an asynchronous computation which can be settled exactly once, and observed
//! any number of times.
//!
//! Three observation mechanisms are proposed:
//!
//! - Polling is suitable when a client only wants to peek at the status of a
//!   cell from time to time, see `status()` and the wait-free `monitor()`.
//! - Blocking allows a client to wait for the cell to settle. Although easy to
//!   use and reason about, it should never be done from within a continuation,
//!   as that continuation may be running on the only thread able to make
//!   progress. See `wait()`.
//! - Continuations allow a client to schedule code to be executed once the
//!   cell has settled. This is the most general and powerful mechanism, on top
//!   of which all combinators are built. See `register()` and the combinators
//!   module.
//!
//! Inline continuations which settle further cells do not recurse into the
//! continuations of those cells. Each thread keeps a queue of pending firings,
//! which the outermost `settle()` call drains in a loop. Arbitrarily long
//! chains of stages thus run in constant stack space, and every cell still
//! fires its own continuations in registration order.

pub mod combinators;
pub mod polling;

use crate::completer::Completer;
use crate::error::{Error, Result};
use crate::executor::ExecutorHandle;
use crate::status::CellStatus;
use parking_lot::{Condvar, Mutex};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, trace};


/// Where a continuation should run once its cell has settled
///
/// There is no separate mode for running on the completing thread, since
/// that is what `Inline` does whenever the cell is still pending at
/// registration time.
///
#[derive(Clone)]
pub enum Placement {
    /// Run on whichever thread settles the cell, or on the registering thread
    /// if the cell has already settled
    Inline,

    /// Submit to an executor
    Executor(ExecutorHandle),
}
//
impl fmt::Debug for Placement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Placement::Inline => write!(f, "Inline"),
            Placement::Executor(_) => write!(f, "Executor(..)"),
        }
    }
}


/// Single-assignment asynchronous result container
///
/// Cloning a cell is cheap and yields another handle to the same underlying
/// state. Any handle may settle the cell, but only the first attempt wins.
///
pub struct CompletionCell<T> {
    /// Reference-counted shared state
    shared: Arc<Shared<T>>,
}
//
impl<T> Clone for CompletionCell<T> {
    fn clone(&self) -> Self {
        CompletionCell { shared: self.shared.clone() }
    }
}
//
impl<T> fmt::Debug for CompletionCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // User errors are only formatted once the lock has been released
        let status = match *self.shared.slot.lock() {
            Slot::Pending(ref continuations) => Err(continuations.len()),
            Slot::Settled(Ok(_)) => Ok(None),
            Slot::Settled(Err(ref error)) => Ok(Some(error.clone())),
        };
        let state = match status {
            Err(count) => format!("Pending({} continuations)", count),
            Ok(None) => "Done".to_owned(),
            Ok(Some(error)) => format!("Failed({})", error),
        };
        f.debug_struct("CompletionCell").field("state", &state).finish()
    }
}
//
impl<T: Clone + Send + 'static> CompletionCell<T> {
    /// Create a new pending cell
    pub fn pending() -> Self {
        Self::with_slot(Slot::Pending(Vec::new()))
    }

    /// Create a cell which has already settled successfully
    pub fn completed(value: T) -> Self {
        Self::with_slot(Slot::Settled(Ok(value)))
    }

    /// Create a cell which has already failed
    pub fn failed(error: Error) -> Self {
        Self::with_slot(Slot::Settled(Err(error)))
    }

    /// Create a pending cell along with the handle that is expected to settle
    /// it, which can be sent to the producer thread
    pub fn pair() -> (Completer<T>, Self) {
        let cell = Self::pending();
        (Completer::new(cell.clone()), cell)
    }

    fn with_slot(slot: Slot<T>) -> Self {
        CompletionCell {
            shared: Arc::new(Shared {
                slot: Mutex::new(slot),
                settled_cv: Condvar::new(),
            }),
        }
    }

    /// Attempt to settle the cell successfully
    ///
    /// Returns whether this call performed the transition. If the cell had
    /// already settled, the value is dropped and nothing happens.
    ///
    pub fn complete(&self, value: T) -> bool {
        self.settle(Ok(value))
    }

    /// Attempt to settle the cell with a failure
    pub fn fail(&self, error: Error) -> bool {
        self.settle(Err(error))
    }

    /// Attempt to cancel the cell
    ///
    /// Cancellation is a failure with `Error::Cancelled`. Work which is already
    /// running is not interrupted, but dependent stages which have not started
    /// yet will not run their user function.
    ///
    pub fn cancel(&self) -> bool {
        self.settle(Err(Error::Cancelled))
    }

    /// Attempt to settle the cell with some outcome, then fire all the
    /// continuations which were registered so far
    ///
    /// When called from within a continuation, the new firings are queued
    /// behind those already pending on this thread, and this returns before
    /// they have run.
    ///
    pub fn settle(&self, outcome: Result<T>) -> bool {
        // Perform the transition and take the continuation list in one step
        let continuations = {
            let mut slot = self.shared.slot.lock();
            match *slot {
                Slot::Settled(_) => return false,
                Slot::Pending(ref mut continuations) => {
                    let continuations = mem::take(continuations);
                    *slot = Slot::Settled(outcome.clone());
                    continuations
                },
            }
        };

        // Wake up blocked readers, then run the continuations outside the lock
        self.shared.settled_cv.notify_all();
        trace!(success = outcome.is_ok(), continuations = continuations.len(),
               "cell settled");
        fire_all(continuations.into_iter().map(|continuation| {
            let outcome = outcome.clone();
            Box::new(move || continuation.fire_guarded(outcome)) as Firing
        }).collect());
        true
    }

    /// Register a continuation to be fired with the cell's outcome
    ///
    /// If the cell is pending, the continuation is queued and will be fired by
    /// whoever settles the cell. Otherwise, it is fired right away.
    ///
    pub fn register<F>(&self, placement: Placement, callback: F)
        where F: FnOnce(Result<T>) + Send + 'static
    {
        let continuation = Continuation {
            callback: Box::new(callback),
            placement,
        };

        // Either queue the continuation or fetch the known outcome
        let outcome = {
            let mut slot = self.shared.slot.lock();
            match *slot {
                Slot::Pending(ref mut continuations) => {
                    continuations.push(continuation);
                    return;
                },
                Slot::Settled(ref outcome) => outcome.clone(),
            }
        };
        continuation.fire(outcome);
    }

    /// Query the current status of the cell without blocking
    pub fn status(&self) -> CellStatus<T> {
        match *self.shared.slot.lock() {
            Slot::Pending(_) => CellStatus::Pending,
            Slot::Settled(ref outcome) => CellStatus::from(outcome.clone()),
        }
    }

    /// Get the value of a successful cell, or some default if the cell is
    /// still pending. The failure of a failed cell is returned as an error.
    pub fn get_now(&self, default: T) -> Result<T> {
        self.status().into_result().unwrap_or(Ok(default))
    }

    /// Wait for the cell to settle and return its outcome
    pub fn wait(&self) -> Result<T> {
        let mut slot = self.shared.slot.lock();
        loop {
            if let Slot::Settled(ref outcome) = *slot {
                return outcome.clone();
            }
            self.shared.settled_cv.wait(&mut slot);
        }
    }

    /// Wait for the cell to settle, for at most some amount of time
    ///
    /// Returns None if the cell did not settle within the allotted time.
    ///
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<T>> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.shared.slot.lock();
        loop {
            if let Slot::Settled(ref outcome) = *slot {
                return Some(outcome.clone());
            }
            if self.shared.settled_cv.wait_until(&mut slot, deadline)
                                     .timed_out() {
                return match *slot {
                    Slot::Settled(ref outcome) => Some(outcome.clone()),
                    Slot::Pending(_) => None,
                };
            }
        }
    }
}
//
impl<T> CompletionCell<T> {
    /// Check if the cell has settled
    pub fn is_done(&self) -> bool {
        matches!(*self.shared.slot.lock(), Slot::Settled(_))
    }

    /// Check if the cell has settled with a failure (cancellation included)
    pub fn is_failed(&self) -> bool {
        matches!(*self.shared.slot.lock(), Slot::Settled(Err(_)))
    }

    /// Check if the cell was cancelled
    pub fn is_cancelled(&self) -> bool {
        matches!(*self.shared.slot.lock(), Slot::Settled(Err(Error::Cancelled)))
    }

    /// Number of continuations waiting for the cell to settle
    pub fn pending_continuations(&self) -> usize {
        match *self.shared.slot.lock() {
            Slot::Pending(ref continuations) => continuations.len(),
            Slot::Settled(_) => 0,
        }
    }

    /// Check if two handles refer to the same cell
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}


/// State shared between all handles to a cell
struct Shared<T> {
    /// Cell state and registered continuations (mutex-protected)
    slot: Mutex<Slot<T>>,

    /// Condition variable used to wake up blocked readers
    settled_cv: Condvar,
}


/// Cell state machine
enum Slot<T> {
    /// Not settled yet, continuations are waiting in registration order
    Pending(Vec<Continuation<T>>),

    /// Settled, continuations registered from now on fire immediately
    Settled(Result<T>),
}


/// Registered continuation
///
/// The callback owns the completer of the downstream cell it must settle, if
/// any. Dropping a continuation without firing it thus fails that downstream
/// cell with `Error::Abandoned`.
///
struct Continuation<T> {
    /// Dependent computation
    callback: Box<dyn FnOnce(Result<T>) + Send>,

    /// Where the dependent computation should run
    placement: Placement,
}
//
impl<T: Send + 'static> Continuation<T> {
    /// Run or schedule the continuation according to its placement
    fn fire(self, outcome: Result<T>) {
        let Continuation { callback, placement } = self;
        match placement {
            Placement::Inline => callback(outcome),
            Placement::Executor(executor) => {
                executor.submit(Box::new(move || callback(outcome)))
            },
        }
    }

    /// Fire the continuation, making sure that a panic does not prevent the
    /// settling thread from firing the next ones
    fn fire_guarded(self, outcome: Result<T>) {
        let result = panic::catch_unwind(AssertUnwindSafe(move || {
            self.fire(outcome)
        }));
        if let Err(payload) = result {
            let error = Error::from_panic(payload);
            error!(%error, "continuation panicked");
        }
    }
}


/// Type-erased continuation firing, waiting in a thread's queue
type Firing = Box<dyn FnOnce()>;

thread_local! {
    /// Firings queued on this thread, present while a settle is draining it
    static FIRINGS: RefCell<Option<VecDeque<Firing>>> = RefCell::new(None);
}

/// Fire a batch of continuations, or queue them if this thread is already
/// firing continuations further up the stack
fn fire_all(batch: Vec<Firing>) {
    if batch.is_empty() {
        return;
    }
    let outermost = FIRINGS.with(|firings| {
        let mut firings = firings.borrow_mut();
        if let Some(queue) = firings.as_mut() {
            queue.extend(batch);
            return false;
        }
        *firings = Some(batch.into());
        true
    });
    if !outermost {
        return;
    }

    // Firings never unwind, and may queue more of them as they go
    loop {
        let next = FIRINGS.with(|firings| {
            let mut firings = firings.borrow_mut();
            let next = firings.as_mut().and_then(VecDeque::pop_front);
            if next.is_none() {
                *firings = None;
            }
            next
        });
        match next {
            Some(firing) => firing(),
            None => break,
        }
    }
}
