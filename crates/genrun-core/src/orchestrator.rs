//! Generation-to-execution orchestration.
//!
//! `Generator` wires the completion provider, the extractor, the
//! workspace writer, and the container executor into one pipeline. The
//! interesting part is the Go invocation strategy: a single combined
//! `go run` is tried first, and only a duplicate-entry-point conflict
//! triggers the per-entry fallback, so the common case costs one
//! container instead of N.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::core_types::Language;
use crate::errors::{AgentError, ExecutorError};
use crate::executors::ContainerExecutor;
use crate::llm::{extract_code_files, prompts, CompletionProvider};
use crate::workspace::{write_files, ClassifiedFiles};

/// Output of one orchestrated container invocation: the interleaved
/// transcript plus an execution error when the generated code itself
/// failed. Runtime-level failures (daemon unreachable, image missing)
/// surface as `Err` instead.
#[derive(Debug, Clone)]
pub struct InvocationResult {
    pub output: String,
    pub error: Option<String>,
}

pub struct Generator {
    provider: Arc<dyn CompletionProvider>,
    executor: Arc<dyn ContainerExecutor>,
}

impl Generator {
    pub fn new(provider: Arc<dyn CompletionProvider>, executor: Arc<dyn ContainerExecutor>) -> Self {
        Self { provider, executor }
    }

    /// Raw completion for a code-generation prompt.
    pub async fn generate_code(
        &self,
        prompt: &str,
        language: Language,
        model: &str,
    ) -> Result<String, AgentError> {
        self.provider
            .complete(&prompts::code_gen_system_prompt(language), prompt, model)
            .await
    }

    /// Complete, extract, and materialize under `work_dir`. Returns the
    /// raw model response alongside the classified file set.
    pub async fn generate_and_write(
        &self,
        prompt: &str,
        language: Language,
        model: &str,
        work_dir: &Path,
    ) -> Result<(String, ClassifiedFiles), AgentError> {
        let content = self.generate_code(prompt, language, model).await?;
        let files = extract_code_files(&content, language.default_file_name());
        if files.iter().all(|(_, code)| code.is_empty()) {
            return Err(AgentError::Parsing("no usable source extracted".to_string()));
        }
        let classified = write_files(&files, work_dir, language)?;
        Ok((content, classified))
    }

    /// Execute a classified file set inside the container, with
    /// `work_dir` bind-mounted at `mount_target`.
    pub async fn run_in_container(
        &self,
        language: Language,
        work_dir: &Path,
        files: &ClassifiedFiles,
        mount_target: &str,
        cancel: &CancellationToken,
    ) -> Result<InvocationResult, AgentError> {
        if files.entry_files.is_empty() {
            return Err(AgentError::Parsing("no usable source extracted".to_string()));
        }

        match language {
            Language::Python => {
                let cmd = vec![
                    "python".to_string(),
                    rel_path(&files.entry_files[0], work_dir),
                ];
                self.invoke(language, &cmd, work_dir, mount_target, cancel)
                    .await
            }
            Language::Go => {
                self.run_go(work_dir, files, mount_target, cancel).await
            }
        }
    }

    async fn run_go(
        &self,
        work_dir: &Path,
        files: &ClassifiedFiles,
        mount_target: &str,
        cancel: &CancellationToken,
    ) -> Result<InvocationResult, AgentError> {
        let language = Language::Go;
        let entries = rel_paths(&files.entry_files, work_dir);
        let deps = rel_paths(&files.dependency_files, work_dir);

        if entries.len() == 1 {
            let cmd = go_run_cmd(entries.iter().chain(deps.iter()));
            return self
                .invoke(language, &cmd, work_dir, mount_target, cancel)
                .await;
        }

        // Optimistic path: one combined run with every entry and
        // dependency file. Valid whenever the entry files do not collide.
        let cmd_all = go_run_cmd(entries.iter().chain(deps.iter()));
        let combined = self
            .executor
            .run_with_mount(language.image(), &cmd_all, work_dir, mount_target, cancel)
            .await;

        let conflict_output = match combined {
            Ok(outcome) => {
                return Ok(InvocationResult {
                    output: outcome.output,
                    error: None,
                })
            }
            Err(ExecutorError::NonZeroExit { exit_code, output }) => {
                if is_entrypoint_conflict(language, &output) {
                    output
                } else {
                    // Failed for an unrelated reason: hand the result
                    // back unmodified.
                    return Ok(InvocationResult {
                        output,
                        error: Some(format!("container exited with code {}", exit_code)),
                    });
                }
            }
            Err(e) => return Err(e.into()),
        };
        log::info!(
            "combined run hit a duplicate-entry-point conflict, splitting into {} runs",
            entries.len()
        );
        log::debug!("conflicting combined output:\n{}", conflict_output);

        // Fallback: run each entry file on its own, paired with the full
        // dependency set. Failures are reported inline per section so one
        // broken entry does not hide the others.
        let mut report = String::new();
        for (path, rel) in files.entry_files.iter().zip(entries.iter()) {
            let base = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| rel.clone());
            report.push_str(&format!("==== Output for {} ====\n", base));

            let cmd = go_run_cmd(std::iter::once(rel).chain(deps.iter()));
            match self
                .executor
                .run_with_mount(language.image(), &cmd, work_dir, mount_target, cancel)
                .await
            {
                Ok(outcome) => {
                    report.push_str(&outcome.output);
                    report.push('\n');
                }
                Err(ExecutorError::Cancelled) => return Err(ExecutorError::Cancelled.into()),
                Err(ExecutorError::NonZeroExit { exit_code, output }) => {
                    report.push_str(&format!("[ERROR] container exited with code {}\n", exit_code));
                    report.push_str(&output);
                    report.push('\n');
                }
                Err(e) => {
                    report.push_str(&format!("[ERROR] {}\n", e));
                }
            }
        }

        Ok(InvocationResult {
            output: report,
            error: None,
        })
    }

    async fn invoke(
        &self,
        language: Language,
        cmd: &[String],
        work_dir: &Path,
        mount_target: &str,
        cancel: &CancellationToken,
    ) -> Result<InvocationResult, AgentError> {
        match self
            .executor
            .run_with_mount(language.image(), cmd, work_dir, mount_target, cancel)
            .await
        {
            Ok(outcome) => Ok(InvocationResult {
                output: outcome.output,
                error: None,
            }),
            Err(ExecutorError::NonZeroExit { exit_code, output }) => Ok(InvocationResult {
                output,
                error: Some(format!("container exited with code {}", exit_code)),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

/// Generates unit-test code from a prompt, writes it into the workspace
/// under the language's test file name, and runs the test command in the
/// container.
pub struct Tester {
    provider: Arc<dyn CompletionProvider>,
    executor: Arc<dyn ContainerExecutor>,
}

impl Tester {
    pub fn new(provider: Arc<dyn CompletionProvider>, executor: Arc<dyn ContainerExecutor>) -> Self {
        Self { provider, executor }
    }

    pub async fn generate_test(
        &self,
        prompt: &str,
        language: Language,
        model: &str,
    ) -> Result<String, AgentError> {
        self.provider
            .complete(&prompts::test_gen_system_prompt(language), prompt, model)
            .await
    }

    pub async fn generate_test_and_run(
        &self,
        prompt: &str,
        language: Language,
        model: &str,
        work_dir: &Path,
        mount_target: &str,
        cancel: &CancellationToken,
    ) -> Result<(String, InvocationResult), AgentError> {
        let content = self.generate_test(prompt, language, model).await?;
        let files = extract_code_files(&content, language.test_file_name());
        if files.iter().all(|(_, code)| code.is_empty()) {
            return Err(AgentError::Parsing("no usable source extracted".to_string()));
        }
        for (name, code) in &files {
            std::fs::write(work_dir.join(name), code)?;
        }

        let cmd = match language {
            Language::Go => vec!["go".to_string(), "test".to_string(), ".".to_string()],
            Language::Python => vec![
                "pytest".to_string(),
                language.test_file_name().to_string(),
            ],
        };

        let result = match self
            .executor
            .run_with_mount(language.image(), &cmd, work_dir, mount_target, cancel)
            .await
        {
            Ok(outcome) => InvocationResult {
                output: outcome.output,
                error: None,
            },
            Err(ExecutorError::NonZeroExit { exit_code, output }) => InvocationResult {
                output,
                error: Some(format!("container exited with code {}", exit_code)),
            },
            Err(e) => return Err(e.into()),
        };

        Ok((content, result))
    }
}

fn is_entrypoint_conflict(language: Language, output: &str) -> bool {
    language
        .entrypoint_conflict_marker()
        .is_some_and(|marker| output.contains(marker))
}

fn go_run_cmd<'a>(paths: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut cmd = vec!["go".to_string(), "run".to_string()];
    cmd.extend(paths.cloned());
    cmd
}

/// Paths handed to the run command are expressed relative to the working
/// directory as seen inside the container; absolute host paths must never
/// leak into an invocation.
fn rel_paths(paths: &[PathBuf], work_dir: &Path) -> Vec<String> {
    paths.iter().map(|p| rel_path(p, work_dir)).collect()
}

fn rel_path(path: &Path, work_dir: &Path) -> String {
    path.strip_prefix(work_dir)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}
