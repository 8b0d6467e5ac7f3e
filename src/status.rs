//! Facilities to represent the status of completion cells
//!
//! The model is the following: a completion cell starts out in a pending
//! state, and eventually moves to either a successful or an unsuccessful final
//! state. Once a final state has been reached, the status of the cell will not
//! change anymore.

use crate::error::{Error, Result};


/// Representation of a completion cell's status
///
/// Here are the possible state transitions:
///
/// - Pending -> Done
/// - Pending -> Failed
///
/// Cancellation is modeled as a failure carrying `Error::Cancelled`.
///
#[derive(Clone, Debug)]
pub enum CellStatus<T> {
    /// The cell has not settled yet
    Pending,

    /// The cell has settled successfully with a value
    Done(T),

    /// The cell has settled with a failure
    Failed(Error),
}
//
impl<T> CellStatus<T> {
    /// Turn the status into a result, if the cell has settled
    pub fn into_result(self) -> Option<Result<T>> {
        match self {
            CellStatus::Pending => None,
            CellStatus::Done(value) => Some(Ok(value)),
            CellStatus::Failed(error) => Some(Err(error)),
        }
    }
}
//
impl<T> From<Result<T>> for CellStatus<T> {
    fn from(outcome: Result<T>) -> Self {
        match outcome {
            Ok(value) => CellStatus::Done(value),
            Err(error) => CellStatus::Failed(error),
        }
    }
}


/// Check if a cell status is final (i.e. won't change anymore)
pub fn is_final<T>(s: &CellStatus<T>) -> bool {
    match *s {
        CellStatus::Pending => false,
        CellStatus::Done(_) | CellStatus::Failed(_) => true,
    }
}
