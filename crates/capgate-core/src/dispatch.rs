//! In-process task queue used as a dispatch target.
//!
//! The coordinator never runs completion work on the thread that happens to
//! deliver a platform callback. Instead it posts tasks onto a [`TaskQueue`]
//! and the owning execution context drains them. Two queues matter in
//! practice: the UI-affined queue the coordinator is constructed with, and
//! the per-request queue supplied by
//! [`Requester::dispatch_target`](crate::Requester::dispatch_target), which
//! preserves "the action callback runs on the context that issued the
//! check".
//!
//! A `TaskQueue` value is a cheap handle; clones share the same underlying
//! queue.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce() + Send>;

/// Shared FIFO of deferred work bound to one execution context.
#[derive(Clone, Default)]
pub struct TaskQueue {
    inner: Arc<Mutex<VecDeque<Task>>>,
}

impl TaskQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues a task. May be called from any thread.
    pub fn post<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.lock().unwrap().push_back(Box::new(task));
    }

    /// Runs queued tasks until the queue is empty, on the calling thread.
    ///
    /// Tasks posted while draining are picked up in the same pass. The lock
    /// is released while each task runs, so tasks may post more work without
    /// deadlocking. Returns the number of tasks executed.
    pub fn drain(&self) -> usize {
        let mut ran = 0;
        loop {
            let task = self.inner.lock().unwrap().pop_front();
            match task {
                Some(task) => {
                    task();
                    ran += 1;
                },
                None => return ran,
            }
        }
    }

    /// Number of tasks currently queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    /// Returns `true` if no tasks are queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }

    /// Returns `true` if `other` is a handle to the same underlying queue.
    #[must_use]
    pub fn same_queue(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueue")
            .field("len", &self.len())
            .finish()
    }
}
