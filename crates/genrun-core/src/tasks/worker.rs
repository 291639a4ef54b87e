//! Single consumer draining the task queue.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core_types::{Task, TaskResult, TaskStatus};
use crate::errors::AgentError;
use crate::tasks::notify::{Notification, NotificationKind, Notifier};
use crate::tasks::store::TaskStore;

/// The unit of work a worker performs per dequeued task.
///
/// The worker owns every status write for tasks it dequeues; a processor
/// only reports success or failure and the worker translates that into
/// the terminal transition. This keeps the store monotonic per id: no
/// second writer can regress a terminal status.
#[async_trait]
pub trait TaskProcessor: Send + Sync {
    async fn process(&self, task: &Task) -> Result<TaskResult, AgentError>;
}

/// Fixed-latency stand-in for the real generation-and-execution round
/// trip. The reference flow uses this; a deployment swaps in a processor
/// that calls the orchestrator, with the same transition contract.
pub struct SimulatedProcessor;

const SIMULATED_STEP: Duration = Duration::from_millis(10);

#[async_trait]
impl TaskProcessor for SimulatedProcessor {
    async fn process(&self, _task: &Task) -> Result<TaskResult, AgentError> {
        tokio::time::sleep(SIMULATED_STEP).await;
        Ok(TaskResult {
            output: String::new(),
            error: None,
            duration: SIMULATED_STEP,
        })
    }
}

/// Long-lived consumer for one `TaskQueue`. Each dequeued task is moved
/// to running, handed to the processor, and moved to completed or
/// failed, with every transition persisted. On cancellation or stop the
/// loop exits without touching an in-flight task's status again: an
/// interrupted task is deliberately left `running` rather than forced
/// into a terminal state.
pub struct Worker {
    receiver: mpsc::Receiver<Task>,
    store: Arc<TaskStore>,
    notifier: Option<Arc<dyn Notifier>>,
    processor: Arc<dyn TaskProcessor>,
}

pub struct WorkerHandle {
    join: JoinHandle<()>,
    stop: CancellationToken,
}

impl WorkerHandle {
    /// Ask the worker loop to exit.
    pub fn stop(&self) {
        self.stop.cancel();
    }

    pub async fn join(self) {
        let _ = self.join.await;
    }
}

impl Worker {
    pub fn new(receiver: mpsc::Receiver<Task>, store: Arc<TaskStore>) -> Self {
        Self {
            receiver,
            store,
            notifier: None,
            processor: Arc::new(SimulatedProcessor),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_processor(mut self, processor: Arc<dyn TaskProcessor>) -> Self {
        self.processor = processor;
        self
    }

    /// Start the consumer loop. `cancel` is the external shutdown
    /// signal; the returned handle carries a local stop signal as well.
    pub fn spawn(mut self, cancel: CancellationToken) -> WorkerHandle {
        let stop = CancellationToken::new();
        let local_stop = stop.clone();

        let join = tokio::spawn(async move {
            loop {
                // Biased: shutdown signals win over buffered work, so a
                // cancelled worker stops accepting tasks immediately.
                tokio::select! {
                    biased;
                    _ = local_stop.cancelled() => {
                        log::info!("worker stop requested");
                        break;
                    }
                    _ = cancel.cancelled() => {
                        log::info!("worker cancelled");
                        break;
                    }
                    maybe_task = self.receiver.recv() => {
                        match maybe_task {
                            Some(mut task) => self.process(&mut task).await,
                            None => {
                                log::debug!("task queue closed, worker exiting");
                                break;
                            }
                        }
                    }
                }
            }
        });

        WorkerHandle { join, stop }
    }

    async fn process(&self, task: &mut Task) {
        self.transition(task, TaskStatus::Running);
        match self.processor.process(task).await {
            Ok(result) => {
                task.result = Some(result);
                self.transition(task, TaskStatus::Completed);
            }
            Err(e) => {
                log::error!("task {} failed: {}", task.id, e);
                task.result = Some(TaskResult {
                    output: String::new(),
                    error: Some(e.to_string()),
                    duration: Duration::ZERO,
                });
                self.transition(task, TaskStatus::Failed);
            }
        }
    }

    fn transition(&self, task: &mut Task, status: TaskStatus) {
        task.set_status(status);
        if let Err(e) = self.store.save(task) {
            log::error!("failed to persist status for task {}: {}", task.id, e);
        }
        if let Some(notifier) = &self.notifier {
            let note = Notification::new(
                NotificationKind::Status,
                task.id.clone(),
                format!("status={}", task.status),
            );
            if let Err(e) = notifier.notify(&note) {
                log::warn!("notifier failed for task {}: {}", task.id, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::{Language, TaskKind};
    use crate::tasks::queue::TaskQueue;
    use std::sync::Mutex;

    struct RecordingNotifier {
        seen: Mutex<Vec<String>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, notification: &Notification) -> Result<(), AgentError> {
            self.seen
                .lock()
                .unwrap()
                .push(format!("{}:{}", notification.task_id, notification.message));
            Ok(())
        }
    }

    /// Succeeds or fails per task, recording the order it saw ids in.
    struct ScriptedProcessor {
        fail_ids: Vec<String>,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TaskProcessor for ScriptedProcessor {
        async fn process(&self, task: &Task) -> Result<TaskResult, AgentError> {
            self.seen.lock().unwrap().push(task.id.clone());
            if self.fail_ids.contains(&task.id) {
                Err(AgentError::Execution("container unreachable".to_string()))
            } else {
                Ok(TaskResult {
                    output: format!("output of {}", task.id),
                    error: None,
                    duration: Duration::ZERO,
                })
            }
        }
    }

    #[tokio::test]
    async fn test_draining_k_tasks_completes_them_in_submission_order() {
        let store = Arc::new(TaskStore::in_memory().unwrap());
        let notifier = Arc::new(RecordingNotifier {
            seen: Mutex::new(Vec::new()),
        });
        let queue = TaskQueue::new(10);
        let rx = queue.take_receiver().unwrap();
        let handle = Worker::new(rx, store.clone())
            .with_notifier(notifier.clone())
            .spawn(CancellationToken::new());

        for i in 0..5 {
            queue
                .enqueue(Task::with_id(
                    format!("task-{}", i),
                    TaskKind::CodeGen,
                    "x",
                    Language::Go,
                ))
                .await
                .unwrap();
        }
        queue.close();
        handle.join().await;

        for i in 0..5 {
            assert_eq!(
                store.get_status(&format!("task-{}", i)).unwrap(),
                Some(TaskStatus::Completed)
            );
        }

        // Exactly k completions, observed in submission order.
        let seen = notifier.seen.lock().unwrap();
        let completions: Vec<_> = seen
            .iter()
            .filter(|s| s.ends_with("status=completed"))
            .cloned()
            .collect();
        assert_eq!(completions.len(), 5);
        for (i, entry) in completions.iter().enumerate() {
            assert!(entry.starts_with(&format!("task-{}:", i)));
        }

        // Per task, running precedes completed.
        let t0: Vec<_> = seen.iter().filter(|s| s.starts_with("task-0:")).collect();
        assert_eq!(t0, vec!["task-0:status=running", "task-0:status=completed"]);
    }

    #[tokio::test]
    async fn test_processor_outcome_decides_the_terminal_status() {
        let store = Arc::new(TaskStore::in_memory().unwrap());
        let queue = TaskQueue::new(10);
        let rx = queue.take_receiver().unwrap();
        let processor = Arc::new(ScriptedProcessor {
            fail_ids: vec!["bad".to_string()],
            seen: Mutex::new(Vec::new()),
        });
        let handle = Worker::new(rx, store.clone())
            .with_processor(processor.clone())
            .spawn(CancellationToken::new());

        queue
            .enqueue(Task::with_id("good", TaskKind::CodeGen, "x", Language::Go))
            .await
            .unwrap();
        queue
            .enqueue(Task::with_id("bad", TaskKind::CodeGen, "x", Language::Go))
            .await
            .unwrap();
        queue.close();
        handle.join().await;

        assert_eq!(store.get_status("good").unwrap(), Some(TaskStatus::Completed));
        assert_eq!(store.get_status("bad").unwrap(), Some(TaskStatus::Failed));
        assert_eq!(*processor.seen.lock().unwrap(), vec!["good", "bad"]);
    }

    #[tokio::test]
    async fn test_stored_terminal_status_is_written_exactly_once() {
        // One id, one owner: the stored status must settle on the
        // processor's outcome and never regress from a terminal label.
        let store = Arc::new(TaskStore::in_memory().unwrap());
        let notifier = Arc::new(RecordingNotifier {
            seen: Mutex::new(Vec::new()),
        });
        let queue = TaskQueue::new(4);
        let rx = queue.take_receiver().unwrap();
        let processor = Arc::new(ScriptedProcessor {
            fail_ids: vec!["task-x".to_string()],
            seen: Mutex::new(Vec::new()),
        });
        let handle = Worker::new(rx, store.clone())
            .with_notifier(notifier.clone())
            .with_processor(processor)
            .spawn(CancellationToken::new());

        queue
            .enqueue(Task::with_id("task-x", TaskKind::CodeGen, "x", Language::Go))
            .await
            .unwrap();
        queue.close();
        handle.join().await;

        let seen = notifier.seen.lock().unwrap();
        let terminal: Vec<_> = seen
            .iter()
            .filter(|s| s.ends_with("status=completed") || s.ends_with("status=failed"))
            .collect();
        assert_eq!(terminal, vec!["task-x:status=failed"]);
        assert_eq!(store.get_status("task-x").unwrap(), Some(TaskStatus::Failed));
    }

    #[tokio::test]
    async fn test_cancellation_leaves_queued_tasks_untouched() {
        let store = Arc::new(TaskStore::in_memory().unwrap());
        let queue = TaskQueue::new(10);
        let rx = queue.take_receiver().unwrap();

        // Tasks are already buffered when the cancelled worker starts;
        // it must exit without advancing any of them.
        for i in 0..3 {
            queue
                .enqueue(Task::with_id(
                    format!("stranded-{}", i),
                    TaskKind::CodeGen,
                    "x",
                    Language::Go,
                ))
                .await
                .unwrap();
        }
        let cancel = CancellationToken::new();
        cancel.cancel();
        let handle = Worker::new(rx, store.clone()).spawn(cancel);
        handle.join().await;

        for i in 0..3 {
            assert_eq!(store.get_status(&format!("stranded-{}", i)).unwrap(), None);
        }
    }

    #[tokio::test]
    async fn test_local_stop_signal_exits_the_loop() {
        let store = Arc::new(TaskStore::in_memory().unwrap());
        let queue = TaskQueue::new(10);
        let rx = queue.take_receiver().unwrap();
        let handle = Worker::new(rx, store).spawn(CancellationToken::new());

        handle.stop();
        handle.join().await;
    }

    #[tokio::test]
    async fn test_two_queues_run_independent_workers() {
        let store_a = Arc::new(TaskStore::in_memory().unwrap());
        let store_b = Arc::new(TaskStore::in_memory().unwrap());
        let queue_a = TaskQueue::new(4);
        let queue_b = TaskQueue::new(4);
        let handle_a =
            Worker::new(queue_a.take_receiver().unwrap(), store_a.clone()).spawn(CancellationToken::new());
        let handle_b =
            Worker::new(queue_b.take_receiver().unwrap(), store_b.clone()).spawn(CancellationToken::new());

        queue_a
            .enqueue(Task::with_id("a", TaskKind::CodeGen, "x", Language::Go))
            .await
            .unwrap();
        queue_b
            .enqueue(Task::with_id("b", TaskKind::TestGen, "x", Language::Python))
            .await
            .unwrap();
        queue_a.close();
        queue_b.close();
        handle_a.join().await;
        handle_b.join().await;

        assert_eq!(store_a.get_status("a").unwrap(), Some(TaskStatus::Completed));
        assert_eq!(store_b.get_status("b").unwrap(), Some(TaskStatus::Completed));
    }
}
