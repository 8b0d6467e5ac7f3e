//! Failures carried by completion cells
//!
//! A failed cell holds an `Error`, which is handed out to every continuation
//! and every reader of the cell. For this reason, errors must be cheaply
//! cloneable, which is why user-provided error types are reference-counted.

use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;


/// Reasons why a completion cell may end up in the failed state
#[derive(Clone, Debug, Error)]
pub enum Error {
    /// The cell was cancelled before it could settle
    #[error("cell was cancelled")]
    Cancelled,

    /// Every handle able to settle the cell was dropped while it was pending
    #[error("cell was abandoned before it settled")]
    Abandoned,

    /// A user-provided function panicked while computing the cell's outcome
    #[error("user function panicked: {0}")]
    Panicked(String),

    /// `any_of` was asked to race an empty set of cells
    #[error("no input cells to wait for")]
    NoInputs,

    /// Application-specific failure described by a message
    #[error("{0}")]
    Message(String),

    /// Application-specific failure with a custom error type
    #[error("{0}")]
    Failed(Arc<dyn StdError + Send + Sync>),
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build an application failure from a message
    pub fn msg(message: impl fmt::Display) -> Self {
        Error::Message(message.to_string())
    }

    /// Build an application failure from a custom error
    pub fn custom<E: StdError + Send + Sync + 'static>(error: E) -> Self {
        Error::Failed(Arc::new(error))
    }

    /// Check if this failure stems from a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// Check if this failure stems from a panic in user code
    pub fn is_panic(&self) -> bool {
        matches!(self, Error::Panicked(_))
    }

    /// Convert the payload of a caught panic into a failure
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_owned()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "<non-string panic payload>".to_owned()
        };
        Error::Panicked(message)
    }
}
