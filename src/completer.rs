//! Write side of a completion cell
//!
//! This module contains the handle that a producer uses to settle a cell. Any
//! handle to a cell can settle it, but holding a `Completer` additionally
//! comes with a promise: if the completer is dropped before the cell has
//! settled, the cell fails with `Error::Abandoned`, so that whoever waits for
//! it does not hang forever.
//!
//! Every combinator hands the completer of its output cell to the
//! continuations that it registers. When these continuations are dropped
//! without running, for example because the last handle to their input cell
//! went away or because a stopped executor refused them, the output cell
//! fails instead of staying pending.

use crate::cell::CompletionCell;
use crate::error::{Error, Result};
use tracing::debug;


/// Producer interface, used to settle a completion cell
pub struct Completer<T: Clone + Send + 'static> {
    /// Cell which this completer is in charge of
    cell: CompletionCell<T>,

    /// Flag indicating that the completer has made its settling attempt
    settled: bool,
}
//
impl<T: Clone + Send + 'static> Completer<T> {
    /// Create a completer for some cell
    pub(crate) fn new(cell: CompletionCell<T>) -> Self {
        Completer { cell, settled: false }
    }

    /// Settle the cell successfully
    pub fn complete(self, value: T) -> bool {
        self.settle(Ok(value))
    }

    /// Settle the cell with a failure
    pub fn fail(self, error: Error) -> bool {
        self.settle(Err(error))
    }

    /// Settle the cell with some outcome
    ///
    /// Returns false if the cell had already settled, for example because
    /// a consumer cancelled it.
    ///
    pub fn settle(mut self, outcome: Result<T>) -> bool {
        self.settled = true;
        self.cell.settle(outcome)
    }

    /// Check if the client has cancelled the cell
    ///
    /// Producers are encouraged to check this before starting expensive work,
    /// since its result would be dropped anyway.
    ///
    pub fn is_cancelled(&self) -> bool {
        self.cell.is_cancelled()
    }

    /// Access the cell that this completer is in charge of
    pub fn cell(&self) -> &CompletionCell<T> {
        &self.cell
    }
}
//
impl<T: Clone + Send + 'static> Drop for Completer<T> {
    /// If the completer is dropped before the cell has settled, notify the
    /// consumers in order to prevent them from hanging
    fn drop(&mut self) {
        if !self.settled && self.cell.fail(Error::Abandoned) {
            debug!("completer dropped, cell abandoned");
        }
    }
}
