//! Continuation executors
//!
//! Whenever a completion cell settles, one important design issue is to
//! decide where its continuations should be executed.
//!
//! A traditional answer to this problem has been to run continuations directly
//! on the thread that settles the cell, as part of the settling process. While
//! this approach, also known as inline execution, works and has minimal
//! scheduling overhead, it also has some issues that prevent it from being
//! universally applicable:
//!
//! - Long-running continuations can stall the thread that settled the cell,
//!   which may be doing something more important
//! - A continuation registered on an already settled cell would run on the
//!   registering thread, which may not want to block on it
//!
//! For this reason, continuations may instead be submitted to an executor,
//! which is in charge of running them at some point in the future on a thread
//! of its own choosing. The executor is always passed in explicitly, so that
//! tests can substitute a deterministic one.

pub mod inline;
pub mod pool;

use std::sync::Arc;


/// Unit of work submitted to an executor
pub type Task = Box<dyn FnOnce() + Send + 'static>;


/// Entry point to continuation scheduling
///
/// Submission is fire-and-forget: no ordering is guaranteed between tasks, and
/// an executor which cannot run a task anymore simply drops it. Dropping a task
/// drops the completers it holds, which fails the corresponding cells with
/// `Error::Abandoned` rather than leaving them pending forever.
///
pub trait Executor: Send + Sync {
    /// Schedule a task for execution
    fn submit(&self, task: Task);
}


/// Shared handle to an executor, as stored inside continuations
pub type ExecutorHandle = Arc<dyn Executor>;
