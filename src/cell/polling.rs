//! Polling-based cell monitoring
//!
//! This module provides a way to monitor a completion cell through polling.
//! It provides maximal performance in scenarios where a client does not need
//! to synchronize with the cell, but only to periodically check its status, as
//! is the case for example when updating progress bars and status graphs in
//! user interfaces. Reading the status never takes the cell's lock.

use crate::cell::{CompletionCell, Placement};
use crate::status::{self, CellStatus};
use triple_buffer::{triple_buffer, Output};


/// Wait-free view of the status of a completion cell
pub struct StatusMonitor<T: Clone + Send> {
    /// The cell's final status will be read through this triple buffer
    output: Output<CellStatus<T>>,
}
//
impl<T: Clone + Send + 'static> StatusMonitor<T> {
    /// Access the latest known status of the cell
    pub fn status(&mut self) -> &CellStatus<T> {
        self.output.read()
    }

    /// Check if the cell has settled
    pub fn is_settled(&mut self) -> bool {
        status::is_final(self.status())
    }
}


impl<T: Clone + Send + 'static> CompletionCell<T> {
    /// Set up a wait-free monitor of this cell's status
    pub fn monitor(&self) -> StatusMonitor<T> {
        // Setup triple buffer-based communication...
        let (mut input, output) = triple_buffer(&CellStatus::Pending);

        // ...and have the cell publish its final status into it
        self.register(Placement::Inline, move |outcome| {
            input.write(CellStatus::from(outcome));
        });
        StatusMonitor { output }
    }
}
