//! Push-style notifications for task events.

use chrono::{DateTime, Utc};

use crate::errors::AgentError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Status,
    Error,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Info => "info",
            NotificationKind::Status => "status",
            NotificationKind::Error => "error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub kind: NotificationKind,
    pub task_id: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    pub fn new(kind: NotificationKind, task_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            task_id: task_id.into(),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification) -> Result<(), AgentError>;
}

/// Writes notifications to stdout.
pub struct ConsoleNotifier;

impl ConsoleNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConsoleNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: &Notification) -> Result<(), AgentError> {
        println!(
            "[{}][{}] {}",
            notification.kind.as_str(),
            notification.task_id,
            notification.message
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingNotifier {
        seen: Mutex<Vec<String>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, notification: &Notification) -> Result<(), AgentError> {
            self.seen
                .lock()
                .unwrap()
                .push(format!("{}:{}", notification.kind.as_str(), notification.message));
            Ok(())
        }
    }

    #[test]
    fn test_notifier_receives_pushed_events() {
        let notifier = RecordingNotifier {
            seen: Mutex::new(Vec::new()),
        };
        notifier
            .notify(&Notification::new(NotificationKind::Status, "t1", "status=running"))
            .unwrap();
        notifier
            .notify(&Notification::new(NotificationKind::Info, "t1", "done"))
            .unwrap();

        let seen = notifier.seen.lock().unwrap();
        assert_eq!(*seen, vec!["status:status=running", "info:done"]);
    }
}
