//! Container execution boundary.
//!
//! Everything the pipeline knows about the container runtime fits behind
//! the `ContainerExecutor` trait: run a command in an ephemeral container,
//! optionally with the workspace bind-mounted, stream the combined output
//! back, and guarantee the container is removed afterwards. The Docker
//! implementation lives in `docker`; tests substitute mocks.

use std::path::Path;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::errors::ExecutorError;

pub mod docker;

pub use docker::DockerExecutor;

/// Combined stdout/stderr of one container invocation, in emission order.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub output: String,
    pub exit_code: i64,
}

/// Opaque create/start/wait/collect-logs/remove collaborator.
///
/// Invocations suspend until the container reaches a non-running state;
/// there is no internal timeout, so the cancellation token is the only
/// bound. Cancellation must best-effort stop and remove the container
/// rather than leak it. A non-zero exit is reported as
/// `ExecutorError::NonZeroExit` carrying the combined output.
#[async_trait]
pub trait ContainerExecutor: Send + Sync {
    async fn run(
        &self,
        image: &str,
        cmd: &[String],
        cancel: &CancellationToken,
    ) -> Result<ExecutionOutcome, ExecutorError>;

    async fn run_with_mount(
        &self,
        image: &str,
        cmd: &[String],
        host_dir: &Path,
        target_dir: &str,
        cancel: &CancellationToken,
    ) -> Result<ExecutionOutcome, ExecutorError>;
}
