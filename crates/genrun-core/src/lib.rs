//! Core library for the Genrun code-generation agent.
//!
//! Genrun turns a natural-language prompt into running code: a model
//! backend generates source, the extractor splits the response into
//! named files, the workspace writer classifies them into entry and
//! dependency units, and the execution orchestrator runs them inside an
//! ephemeral Docker container with the workspace bind-mounted. Around
//! that pipeline sits a task lifecycle: a bounded queue drained by a
//! single cancellable worker, with statuses persisted to an embedded
//! store and observers notified push-style.
//!
//! External collaborators (the model backend and the container runtime)
//! are modelled as capability traits so orchestration logic is testable
//! against mocks.

pub mod config;
pub mod core_types;
pub mod errors;
pub mod executors;
pub mod llm;
pub mod orchestrator;
pub mod tasks;
pub mod workspace;

pub use config::{ConfigLoader, GenrunConfig};
pub use core_types::{Language, Task, TaskKind, TaskResult, TaskStatus};
pub use errors::{AgentError, ExecutorError};
pub use executors::{ContainerExecutor, DockerExecutor, ExecutionOutcome};
pub use llm::{extract_code_files, CompletionProvider, OpenAiClient};
pub use orchestrator::{Generator, InvocationResult, Tester};
pub use tasks::{ConsoleNotifier, Notification, Notifier, TaskProcessor, TaskQueue, TaskStore, Worker};
pub use workspace::{write_files, ClassifiedFiles};
