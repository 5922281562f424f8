//! FIFO queue of submitted tasks.

use conductor_core::{DispatchError, Result, TaskOutcome, TaskRequest};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::{Notify, oneshot};

/// A request waiting for dispatch, plus the optional waiter for its outcome.
pub struct QueuedTask {
    /// Submitted request
    pub request: TaskRequest,
    /// Resolved with the terminal outcome, if the submitter is waiting
    pub waiter: Option<oneshot::Sender<TaskOutcome>>,
}

impl QueuedTask {
    /// Wraps a request nobody waits on.
    pub const fn detached(request: TaskRequest) -> Self {
        Self {
            request,
            waiter: None,
        }
    }
}

#[derive(Default)]
struct QueueState {
    items: VecDeque<QueuedTask>,
    closed: bool,
}

/// Submission-ordered task queue with a wake-up signal for the dispatcher.
#[derive(Default)]
pub struct TaskQueue {
    state: Mutex<QueueState>,
    notify: Notify,
}

impl TaskQueue {
    /// Creates an empty, open queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a task. `on_accept` runs under the queue lock right before
    /// the append, so anything it publishes happens-before the task can be
    /// dequeued.
    ///
    /// # Errors
    /// Returns `ShutDown` once the queue has been closed
    pub fn push<F>(&self, task: QueuedTask, on_accept: F) -> Result<()>
    where
        F: FnOnce(&TaskRequest),
    {
        {
            let mut state = self.lock();
            if state.closed {
                return Err(DispatchError::ShutDown);
            }
            on_accept(&task.request);
            state.items.push_back(task);
        }
        self.notify.notify_one();
        Ok(())
    }

    /// Removes the oldest task.
    pub fn pop_front(&self) -> Option<QueuedTask> {
        self.lock().items.pop_front()
    }

    /// Puts a task back at the head, ahead of everything else.
    pub fn push_front(&self, task: QueuedTask) {
        self.lock().items.push_front(task);
    }

    /// Number of waiting tasks.
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// Whether no task is waiting.
    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    /// Waits for the next submission signal.
    pub async fn notified(&self) {
        self.notify.notified().await;
    }

    /// Rejects further submissions and returns every waiting task, oldest
    /// first.
    pub fn close(&self) -> Vec<QueuedTask> {
        let mut state = self.lock();
        state.closed = true;
        state.items.drain(..).collect()
    }

    /// Whether the queue has been closed.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
