//! Durable task-status persistence.
//!
//! One SQLite file holds a single `tasks` table mapping task id to the
//! last written status label. The handle is opened once at process start
//! and shared by `Arc`; the connection mutex gives a single in-flight
//! writer while readers see committed state.

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection, OptionalExtension};

use crate::core_types::{Task, TaskStatus};
use crate::errors::AgentError;

pub struct TaskStore {
    conn: Arc<Mutex<Connection>>,
}

impl TaskStore {
    /// Open (or create) the store at `path`. Construct once per process
    /// and pass the handle to every component that needs it.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, AgentError> {
        let conn = Connection::open(path.as_ref()).map_err(|e| {
            AgentError::Storage(format!(
                "failed to open store at {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|e| AgentError::Storage(format!("failed to set pragmas: {}", e)))?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// In-memory store for tests.
    pub fn in_memory() -> Result<Self, AgentError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AgentError::Storage(format!("failed to open in-memory store: {}", e)))?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> Result<(), AgentError> {
        let conn = self.lock()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                status TEXT NOT NULL
            );
            "#,
        )
        .map_err(|e| AgentError::Storage(format!("failed to initialize schema: {}", e)))?;
        Ok(())
    }

    /// Upsert the task's current status under its id.
    pub fn save(&self, task: &Task) -> Result<(), AgentError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO tasks (id, status) VALUES (?1, ?2)
             ON CONFLICT(id) DO UPDATE SET status = excluded.status",
            params![task.id, task.status.as_str()],
        )
        .map_err(|e| AgentError::Storage(format!("failed to save task {}: {}", task.id, e)))?;
        Ok(())
    }

    /// Last written status for `id`, or `None` for an unknown task.
    /// Absence is not an error. Only the label is stored, so after a
    /// restart a task that crashed mid-run still reads `running`.
    pub fn get_status(&self, id: &str) -> Result<Option<TaskStatus>, AgentError> {
        let conn = self.lock()?;
        let label: Option<String> = conn
            .query_row("SELECT status FROM tasks WHERE id = ?1", params![id], |row| {
                row.get(0)
            })
            .optional()
            .map_err(|e| AgentError::Storage(format!("failed to read task {}: {}", id, e)))?;

        label.map(|s| TaskStatus::parse(&s)).transpose()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, AgentError> {
        self.conn
            .lock()
            .map_err(|_| AgentError::Storage("store lock poisoned".to_string()))
    }
}
