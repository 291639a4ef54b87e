//! Error types for the generation-to-execution pipeline
//!
//! Two taxonomies live here: `AgentError` covers the outer pipeline
//! (LLM backend, parsing, configuration, persistence), while
//! `ExecutorError` is specific to the container runner boundary so the
//! orchestrator can branch on typed conditions like a non-zero exit
//! instead of matching on rendered error text.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("LLM interaction failed: {0}")]
    Llm(String),
    #[error("Parsing error: {0}")]
    Parsing(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Code execution failed: {0}")]
    Execution(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        AgentError::Llm(err.to_string())
    }
}

impl From<ExecutorError> for AgentError {
    fn from(err: ExecutorError) -> Self {
        AgentError::Execution(err.to_string())
    }
}

/// Failure modes of a single container invocation.
///
/// `NonZeroExit` carries the combined output so callers can inspect the
/// toolchain diagnostics (the orchestrator uses this for its
/// duplicate-entry-point fallback) without re-running the container.
#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Docker client error: {0}")]
    Runtime(#[from] bollard::errors::Error),
    #[error("container exited with code {exit_code}:\n{output}")]
    NonZeroExit { exit_code: i64, output: String },
    #[error("container execution cancelled")]
    Cancelled,
    #[error("I/O error during container run: {0}")]
    Io(#[from] std::io::Error),
    #[error("UTF-8 decoding error in container output: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}
