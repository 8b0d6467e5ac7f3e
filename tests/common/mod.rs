#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use completion_cells::{Executor, Task};
use parking_lot::Mutex;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, registry};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

pub fn init_tracing() {
    let mut filter = EnvFilter::from_default_env();
    filter = filter.add_directive(LevelFilter::WARN.into());
    let print = fmt::layer().compact().with_test_writer();
    let _ = registry().with(filter).with(print).try_init();
}

/// Executor which only runs tasks when told to, for deterministic tests
#[derive(Default)]
pub struct ManualExecutor {
    queue: Mutex<VecDeque<Task>>,
}

impl ManualExecutor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn queued(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn run_all(&self) -> usize {
        let mut ran = 0;
        loop {
            let task = self.queue.lock().pop_front();
            match task {
                Some(task) => task(),
                None       => return ran,
            }
            ran += 1;
        }
    }
}

impl Executor for ManualExecutor {
    fn submit(&self, task: Task) {
        self.queue.lock().push_back(task);
    }
}
