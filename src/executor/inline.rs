//! Inline executor, implementing synchronous task execution
//!
//! This executor follows the traditional pattern of directly executing tasks
//! on the thread that submits them. It can harm the performance of whoever
//! settles a cell, but for short continuations and for deterministic testing
//! it is a good choice.

use crate::executor::{Executor, ExecutorHandle, Task};
use std::sync::Arc;


/// Executor implementation suitable for inline task execution
#[derive(Clone, Copy, Debug, Default)]
pub struct InlineExecutor {}
//
impl InlineExecutor {
    /// Create a new inline executor
    pub fn new() -> Self {
        InlineExecutor {}
    }

    /// Create a shared handle to a new inline executor
    pub fn handle() -> ExecutorHandle {
        Arc::new(Self::new())
    }
}
//
impl Executor for InlineExecutor {
    fn submit(&self, task: Task) {
        task();
    }
}
