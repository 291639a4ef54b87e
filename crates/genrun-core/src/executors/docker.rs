use std::path::Path;

use async_trait::async_trait;
use bollard::container::LogOutput;
use bollard::models::{ContainerCreateBody, HostConfig};
use bollard::query_parameters::{
    CreateContainerOptions as BollardCreateContainerOptionsQuery,
    LogsOptions as BollardLogsOptionsQuery,
    RemoveContainerOptions as BollardRemoveContainerOptionsQuery,
    StartContainerOptions as BollardStartContainerOptionsQuery,
    StopContainerOptions as BollardStopContainerOptionsQuery,
    WaitContainerOptions as BollardWaitContainerOptionsQuery,
};
use bollard::Docker;
use futures_util::stream::StreamExt;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::{ContainerExecutor, ExecutionOutcome};
use crate::errors::ExecutorError;

/// `ContainerExecutor` backed by the local Docker daemon.
///
/// Containers are created with auto-remove so the daemon cleans them up
/// once they stop, whether the run succeeded, failed, or was cancelled.
pub struct DockerExecutor {
    docker: Docker,
}

/// Host configuration for a mountless run: nothing from the host is
/// visible inside the container.
fn base_host_config() -> HostConfig {
    HostConfig {
        auto_remove: Some(true),
        ..Default::default()
    }
}

/// Host configuration binding `host_dir` into the container at
/// `target_dir`. Fails on non-UTF-8 host paths since the bind spec is
/// a string.
fn mount_host_config(host_dir: &Path, target_dir: &str) -> Result<HostConfig, ExecutorError> {
    let host_dir = host_dir.to_str().ok_or_else(|| {
        ExecutorError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "host directory path is not valid UTF-8",
        ))
    })?;

    Ok(HostConfig {
        binds: Some(vec![format!("{}:{}", host_dir, target_dir)]),
        ..base_host_config()
    })
}

impl DockerExecutor {
    pub fn new() -> Result<Self, ExecutorError> {
        let docker = Docker::connect_with_local_defaults()?;
        Ok(Self { docker })
    }

    async fn run_container(
        &self,
        image: &str,
        cmd: &[String],
        host_config: HostConfig,
        working_dir: Option<String>,
        cancel: &CancellationToken,
    ) -> Result<ExecutionOutcome, ExecutorError> {
        let options = Some(BollardCreateContainerOptionsQuery {
            name: Some(format!("genrun-{}", Uuid::new_v4())),
            ..Default::default()
        });

        let config = ContainerCreateBody {
            image: Some(image.to_string()),
            cmd: Some(cmd.to_vec()),
            working_dir,
            host_config: Some(host_config),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            ..Default::default()
        };

        let container = self.docker.create_container(options, config).await?;
        log::debug!("created container {} for image {}", container.id, image);

        self.docker
            .start_container(&container.id, None::<BollardStartContainerOptionsQuery>)
            .await?;

        // Suspend until the container stops or the caller cancels. No
        // internal timeout: the token is the only bound.
        let mut wait_stream = self
            .docker
            .wait_container(&container.id, None::<BollardWaitContainerOptionsQuery>);

        let wait_outcome = tokio::select! {
            res = wait_stream.next() => res,
            _ = cancel.cancelled() => {
                log::warn!("cancellation requested, stopping container {}", container.id);
                let _ = self
                    .docker
                    .stop_container(&container.id, None::<BollardStopContainerOptionsQuery>)
                    .await;
                let _ = self
                    .docker
                    .remove_container(
                        &container.id,
                        Some(BollardRemoveContainerOptionsQuery {
                            force: true,
                            ..Default::default()
                        }),
                    )
                    .await;
                return Err(ExecutorError::Cancelled);
            }
        };

        // The wait endpoint reports a non-zero exit either as a response
        // with a status code or as a dedicated wait error.
        let exit_code = match wait_outcome {
            Some(Ok(response)) => response.status_code,
            Some(Err(bollard::errors::Error::DockerContainerWaitError { code, .. })) => code,
            Some(Err(e)) => return Err(ExecutorError::Runtime(e)),
            None => {
                return Err(ExecutorError::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "container wait stream ended unexpectedly",
                )))
            }
        };

        let mut log_stream = self.docker.logs(
            &container.id,
            Some(BollardLogsOptionsQuery {
                stdout: true,
                stderr: true,
                ..Default::default()
            }),
        );

        // Stdout and stderr frames are appended in the order the daemon
        // emitted them, giving one interleaved transcript.
        let mut output = String::new();
        while let Some(log_result) = log_stream.next().await {
            match log_result {
                Ok(LogOutput::StdOut { message }) | Ok(LogOutput::StdErr { message }) => {
                    output.push_str(std::str::from_utf8(&message)?);
                }
                Ok(_) => {}
                Err(e) => return Err(ExecutorError::Runtime(e)),
            }
        }

        if exit_code != 0 {
            return Err(ExecutorError::NonZeroExit { exit_code, output });
        }

        Ok(ExecutionOutcome { output, exit_code })
    }
}

#[async_trait]
impl ContainerExecutor for DockerExecutor {
    async fn run(
        &self,
        image: &str,
        cmd: &[String],
        cancel: &CancellationToken,
    ) -> Result<ExecutionOutcome, ExecutorError> {
        self.run_container(image, cmd, base_host_config(), None, cancel)
            .await
    }

    async fn run_with_mount(
        &self,
        image: &str,
        cmd: &[String],
        host_dir: &Path,
        target_dir: &str,
        cancel: &CancellationToken,
    ) -> Result<ExecutionOutcome, ExecutorError> {
        let host_config = mount_host_config(host_dir, target_dir)?;
        self.run_container(image, cmd, host_config, Some(target_dir.to_string()), cancel)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mountless_host_config_exposes_nothing_from_the_host() {
        let config = base_host_config();
        assert_eq!(config.auto_remove, Some(true));
        assert!(config.binds.is_none());
    }

    #[test]
    fn test_mount_host_config_binds_workspace_at_target() {
        let config = mount_host_config(Path::new("/tmp/work"), "/app").unwrap();
        assert_eq!(config.binds, Some(vec!["/tmp/work:/app".to_string()]));
        assert_eq!(config.auto_remove, Some(true));
    }

    #[cfg(unix)]
    #[test]
    fn test_mount_host_config_rejects_non_utf8_paths() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let host_dir = Path::new(OsStr::from_bytes(b"/tmp/\xff"));
        assert!(matches!(
            mount_host_config(host_dir, "/app"),
            Err(ExecutorError::Io(_))
        ));
    }
}
