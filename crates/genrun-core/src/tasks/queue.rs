//! Bounded FIFO buffer of pending tasks.

use std::sync::Mutex;

use tokio::sync::mpsc;

use crate::core_types::Task;
use crate::errors::AgentError;

pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

/// Bounded task queue. `enqueue` suspends the producer when the buffer
/// is full; that backpressure is deliberate. Exactly one consumer may
/// take the receiver, preserving per-queue ordering of status
/// transitions.
pub struct TaskQueue {
    tx: Mutex<Option<mpsc::Sender<Task>>>,
    rx: Mutex<Option<mpsc::Receiver<Task>>>,
}

impl TaskQueue {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self {
            tx: Mutex::new(Some(tx)),
            rx: Mutex::new(Some(rx)),
        }
    }

    /// Push a task, suspending while the buffer is full. Fails once the
    /// queue has been closed or a panicking producer poisoned the lock.
    pub async fn enqueue(&self, task: Task) -> Result<(), AgentError> {
        let tx = self
            .tx
            .lock()
            .map_err(|_| AgentError::Internal("queue lock poisoned".to_string()))?
            .clone()
            .ok_or_else(|| AgentError::Internal("task queue is closed".to_string()))?;
        tx.send(task)
            .await
            .map_err(|_| AgentError::Internal("task queue is closed".to_string()))
    }

    /// Hand out the consumer end. Returns `None` after the first call;
    /// a queue is drained by a single worker. A poisoned lock also
    /// reads as exhausted.
    pub fn take_receiver(&self) -> Option<mpsc::Receiver<Task>> {
        self.rx.lock().ok()?.take()
    }

    /// Close the producer side. The consumer drains whatever is already
    /// buffered and then observes end-of-queue.
    pub fn close(&self) {
        if let Ok(mut tx) = self.tx.lock() {
            tx.take();
        }
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}
