use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;

use genrun_core::tasks::{ConsoleNotifier, Notification, NotificationKind, Notifier, Worker};
use genrun_core::{
    AgentError, ConfigLoader, DockerExecutor, Generator, Language, OpenAiClient, Task, TaskKind,
    TaskProcessor, TaskQueue, TaskResult, TaskStatus, TaskStore, Tester,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Generate code from the prompt and run it
    Gen,
    /// Generate unit tests from the prompt and run them
    Test,
}

#[derive(Parser, Debug)]
#[clap(
    name = "genrun",
    version = "0.1.0",
    about = "Generate code with an LLM and run it in a disposable container"
)]
struct Cli {
    #[clap(long, short, value_enum, default_value = "gen")]
    mode: Mode,

    #[clap(long, short, help = "Prompt for code or test generation")]
    prompt: String,

    #[clap(long, short, default_value = "go", help = "Target language (go or python)")]
    language: String,

    #[clap(long, short, default_value = "etc/config.yaml", help = "Config file path")]
    config: String,

    #[clap(long, default_value = "./tmp", help = "Working directory for generated files")]
    workdir: PathBuf,

    #[clap(long, help = "Container mount directory (overrides config)")]
    mount: Option<String>,

    #[clap(long, default_value = "info")]
    log_level: String,
}

/// Runs the real generation-and-execution round trip for each dequeued
/// task. All status writes stay inside the worker: this process only
/// reads the stored status back after the worker has drained the queue,
/// so one task id has exactly one writer.
struct PipelineProcessor {
    generator: Generator,
    tester: Tester,
    model: String,
    work_dir: PathBuf,
    mount_target: String,
    cancel: CancellationToken,
    failure: Mutex<Option<String>>,
}

#[async_trait]
impl TaskProcessor for PipelineProcessor {
    async fn process(&self, task: &Task) -> Result<TaskResult, AgentError> {
        let started = Instant::now();
        let outcome = match task.kind {
            TaskKind::CodeGen => {
                run_gen(
                    &self.generator,
                    &task.input,
                    task.language,
                    &self.model,
                    &self.work_dir,
                    &self.mount_target,
                    &self.cancel,
                )
                .await
            }
            TaskKind::TestGen => {
                run_test(
                    &self.tester,
                    &task.input,
                    task.language,
                    &self.model,
                    &self.work_dir,
                    &self.mount_target,
                    &self.cancel,
                )
                .await
            }
        };

        match outcome {
            Ok(output) => Ok(TaskResult {
                output,
                error: None,
                duration: started.elapsed(),
            }),
            Err(e) => {
                if let Ok(mut failure) = self.failure.lock() {
                    *failure = Some(e.to_string());
                }
                Err(e)
            }
        }
    }
}

impl PipelineProcessor {
    fn take_failure(&self) -> Option<String> {
        self.failure.lock().ok().and_then(|mut f| f.take())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .parse_filters(&cli.log_level)
        .init();

    let language = Language::parse(&cli.language).context("invalid --language")?;
    let config = ConfigLoader::from_source(&cli.config).await?;
    if config.api_key.is_empty() {
        bail!("no API key configured: set api_key in {} or OPENAI_API_KEY", cli.config);
    }
    let mount_target = cli.mount.unwrap_or_else(|| config.mount_target.clone());

    // Process-wide handles, constructed once and passed down explicitly.
    let store = Arc::new(TaskStore::open(&config.store_path)?);
    let notifier = Arc::new(ConsoleNotifier::new());

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("interrupt received, cancelling");
                cancel.cancel();
            }
        });
    }

    tokio::fs::create_dir_all(&cli.workdir)
        .await
        .with_context(|| format!("failed to create workdir {}", cli.workdir.display()))?;
    let work_dir = cli
        .workdir
        .canonicalize()
        .context("failed to resolve workdir")?;
    log::info!("working directory: {}", work_dir.display());

    let provider =
        Arc::new(OpenAiClient::new(config.api_key.clone()).with_api_base(config.base_url.clone()));
    let executor = Arc::new(DockerExecutor::new().context("failed to connect to Docker")?);

    let processor = Arc::new(PipelineProcessor {
        generator: Generator::new(provider.clone(), executor.clone()),
        tester: Tester::new(provider, executor),
        model: config.model.clone(),
        work_dir,
        mount_target,
        cancel: cancel.clone(),
        failure: Mutex::new(None),
    });

    // Task lifecycle: the record is queued and the worker alone drives
    // it pending -> running -> completed or failed through the real
    // round trip.
    let queue = TaskQueue::new(config.queue_capacity);
    let receiver = queue
        .take_receiver()
        .context("fresh queue always has a receiver")?;
    let worker = Worker::new(receiver, store.clone())
        .with_notifier(notifier.clone())
        .with_processor(processor.clone())
        .spawn(cancel.clone());

    let kind = match cli.mode {
        Mode::Gen => TaskKind::CodeGen,
        Mode::Test => TaskKind::TestGen,
    };
    let task = Task::new(kind, cli.prompt.clone(), language);
    let task_id = task.id.clone();
    store.save(&task)?;
    queue.enqueue(task).await?;

    queue.close();
    worker.join().await;

    let status = store.get_status(&task_id)?;
    report_status(&*notifier, &task_id, status);

    if status != Some(TaskStatus::Completed) {
        let message = processor
            .take_failure()
            .unwrap_or_else(|| "task did not complete".to_string());
        let _ = notifier.notify(&Notification::new(
            NotificationKind::Error,
            task_id,
            message.clone(),
        ));
        bail!(message);
    }
    Ok(())
}

fn report_status(notifier: &dyn Notifier, task_id: &str, status: Option<TaskStatus>) {
    let label = status.map(|s| s.as_str()).unwrap_or("unknown");
    let _ = notifier.notify(&Notification::new(
        NotificationKind::Status,
        task_id,
        format!("status={}", label),
    ));
}

async fn run_gen(
    generator: &Generator,
    prompt: &str,
    language: Language,
    model: &str,
    work_dir: &Path,
    mount_target: &str,
    cancel: &CancellationToken,
) -> Result<String, AgentError> {
    log::info!("requesting code generation from the model...");
    let (content, classified) = generator
        .generate_and_write(prompt, language, model, work_dir)
        .await?;
    log::info!("model response:\n====================\n{}\n====================", content);
    log::info!(
        "{} entry file(s), {} dependency file(s); executing in container...",
        classified.entry_files.len(),
        classified.dependency_files.len()
    );

    let result = generator
        .run_in_container(language, work_dir, &classified, mount_target, cancel)
        .await?;
    if let Some(err) = &result.error {
        log::warn!("execution finished with an error: {}", err);
    }
    println!("{}", result.output);
    Ok(result.output)
}

async fn run_test(
    tester: &Tester,
    prompt: &str,
    language: Language,
    model: &str,
    work_dir: &Path,
    mount_target: &str,
    cancel: &CancellationToken,
) -> Result<String, AgentError> {
    log::info!("requesting test generation from the model...");
    let (content, result) = tester
        .generate_test_and_run(prompt, language, model, work_dir, mount_target, cancel)
        .await?;
    log::info!("generated test code:\n====================\n{}\n====================", content);
    if let Some(err) = &result.error {
        log::warn!("test run finished with an error: {}", err);
    }
    println!("{}", result.output);
    Ok(result.output)
}
