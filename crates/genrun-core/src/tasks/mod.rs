//! Task lifecycle: bounded queue, single consumer worker, durable
//! status store, and push-style notifications.

pub mod notify;
pub mod queue;
pub mod store;
pub mod worker;

pub use notify::{ConsoleNotifier, Notification, NotificationKind, Notifier};
pub use queue::TaskQueue;
pub use store::TaskStore;
pub use worker::{SimulatedProcessor, TaskProcessor, Worker, WorkerHandle};
