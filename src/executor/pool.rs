//! Thread pool executor
//!
//! This executor runs tasks on a fixed set of worker threads, which are fed
//! through a shared channel. It is the right choice for continuations which
//! may take a while, since they won't hold up whoever settled the cell.
//!
//! The pool follows structured concurrency rules: dropping the `ThreadPool`
//! stops it, lets the workers finish the tasks which were already queued, and
//! joins them. Executor handles may outlive the pool, but tasks submitted
//! through them after that point are dropped, which fails their output cells
//! with `Error::Abandoned`.

use crate::executor::{Executor, ExecutorHandle, Task};
use crossbeam_channel::{unbounded, Receiver, SendError, Sender};
use parking_lot::RwLock;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, warn};


/// Messages sent from the pool handles to the workers
enum Message {
    /// Run the enclosed task
    Run(Task),

    /// Exit the worker loop
    Stop,
}


/// Configuration of a thread pool, used to spawn it
#[derive(Clone, Debug)]
pub struct ThreadPoolBuilder {
    /// Prefix of the worker thread names
    name: String,

    /// Number of worker threads
    threads: usize,
}
//
impl Default for ThreadPoolBuilder {
    fn default() -> Self {
        let threads = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        ThreadPoolBuilder {
            name: "cell-worker".to_owned(),
            threads,
        }
    }
}
//
impl ThreadPoolBuilder {
    /// Set the prefix of the worker thread names
    pub fn name<N: Into<String>>(self, name: N) -> Self {
        ThreadPoolBuilder { name: name.into(), ..self }
    }

    /// Set the number of worker threads (at least one will be spawned)
    pub fn threads(self, threads: usize) -> Self {
        ThreadPoolBuilder { threads: threads.max(1), ..self }
    }

    /// Spawn the worker threads
    pub fn spawn(self) -> io::Result<ThreadPool> {
        let (sender, receiver) = unbounded();
        let shared = Arc::new(PoolShared {
            sender,
            stopped: RwLock::new(false),
        });

        let mut workers = Vec::with_capacity(self.threads);
        for index in 0..self.threads {
            let name = format!("{}-{}", self.name, index);
            let receiver = receiver.clone();
            let worker = thread::Builder::new()
                .name(name.clone())
                .spawn(move || work(name, receiver))?;
            workers.push(worker);
        }
        debug!(name = %self.name, threads = self.threads, "thread pool started");

        Ok(ThreadPool { shared, workers })
    }
}


/// Fixed-size pool of worker threads implementing `Executor`
pub struct ThreadPool {
    /// State shared with the executor handles
    shared: Arc<PoolShared>,

    /// Worker threads, joined when the pool is dropped
    workers: Vec<JoinHandle<()>>,
}
//
impl ThreadPool {
    /// Configure a new thread pool
    pub fn builder() -> ThreadPoolBuilder {
        ThreadPoolBuilder::default()
    }

    /// Spawn a thread pool with the default configuration
    pub fn new() -> io::Result<Self> {
        Self::builder().spawn()
    }

    /// Number of worker threads
    pub fn threads(&self) -> usize {
        self.workers.len()
    }

    /// Get a shared handle through which tasks can be submitted
    pub fn handle(&self) -> ExecutorHandle {
        self.shared.clone()
    }
}
//
impl Executor for ThreadPool {
    fn submit(&self, task: Task) {
        self.shared.submit(task);
    }
}
//
impl Drop for ThreadPool {
    fn drop(&mut self) {
        // Refuse new work, then queue one stop message per worker behind the
        // tasks which were already submitted. Submitters hold the lock across
        // their check and send, so no task can land behind the stop messages.
        {
            let mut stopped = self.shared.stopped.write();
            *stopped = true;
            for _ in 0..self.workers.len() {
                let _ = self.shared.sender.send(Message::Stop);
            }
        }

        // A worker cannot join itself, which would happen if the last task of
        // the pool is the one dropping it
        let current = thread::current().id();
        for worker in self.workers.drain(..) {
            if worker.thread().id() == current {
                continue;
            }
            if worker.join().is_err() {
                error!("thread pool worker terminated abnormally");
            }
        }
    }
}


/// State shared between the pool and its executor handles
struct PoolShared {
    /// Queue of tasks and control messages
    sender: Sender<Message>,

    /// Set once the owning pool has been dropped
    stopped: RwLock<bool>,
}
//
impl Executor for PoolShared {
    fn submit(&self, task: Task) {
        let rejected = {
            let stopped = self.stopped.read();
            if *stopped {
                Err(Message::Run(task))
            } else {
                self.sender.send(Message::Run(task))
                           .map_err(SendError::into_inner)
            }
        };

        // Dropping a task may abandon cells and fire their continuations,
        // which must not happen under the lock
        if let Err(message) = rejected {
            warn!("thread pool is stopped, dropping submitted task");
            drop(message);
        }
    }
}


/// Worker thread loop
fn work(name: String, receiver: Receiver<Message>) {
    debug!(worker = %name, "worker starting");
    for message in receiver.iter() {
        match message {
            Message::Run(task) => {
                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
                    let error = crate::error::Error::from_panic(payload);
                    error!(worker = %name, %error, "task panicked");
                }
            },
            Message::Stop => break,
        }
    }
    debug!(worker = %name, "worker exiting");
}
