//! Single-assignment asynchronous result cells
//!
//! Picture yourself in a situation where: you have delegated some work to
//! another thread, a worker pool, or some external device, and you know that
//! it will eventually produce a result. Meanwhile, other parts of your program
//! would like to react to that result, transform it, combine it with other
//! results, or race it against them, without anyone having to sit there and
//! wait for it.
//!
//! The central abstraction of this crate is the `CompletionCell`. A cell starts
//! out pending, and is settled exactly once, either with a value or with an
//! error. Any number of continuations can be attached to a cell, before or
//! after it has settled, and every one of them will observe the same final
//! outcome exactly once, no matter which thread got to settle the cell.
//!
//! Continuations are the building blocks of computation graphs: mapping a
//! cell, chaining it with another asynchronous computation, zipping two cells
//! together, or racing several of them all produce new cells which are settled
//! automatically once their inputs are.
//!
//! Where continuations run is decided by their `Placement`. Inline
//! continuations run on whichever thread settles the cell (or on the
//! registering thread if the cell is already settled), whereas executor
//! continuations are handed over to an `Executor` such as the `ThreadPool`.

pub mod cell;
pub mod completer;
pub mod error;
pub mod executor;
pub mod status;

pub use cell::polling::StatusMonitor;
pub use cell::{CompletionCell, Placement};
pub use completer::Completer;
pub use error::{Error, Result};
pub use executor::inline::InlineExecutor;
pub use executor::pool::{ThreadPool, ThreadPoolBuilder};
pub use executor::{Executor, ExecutorHandle, Task};
pub use status::CellStatus;
