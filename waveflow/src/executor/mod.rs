//! Stage execution backends.
//!
//! Every stage runs through a [`StageExecutor`]. Which one is chosen is
//! purely data-driven: [`executor_for`] picks [`ContainerExecutor`] when the
//! stage names a container image and [`DirectExecutor`] otherwise. Both
//! resolve the stage into a [`CommandSpec`] and hand it to a shared
//! [`CommandRunner`], enforcing the stage timeout and observing the
//! workflow's cancellation token on the way.

mod container;
mod direct;
mod runner;

pub use container::ContainerExecutor;
pub use direct::DirectExecutor;
pub use runner::{CommandOutput, CommandRunner, CommandSpec, ProcessRunner};

use crate::cancellation::CancellationToken;
use crate::config::EngineConfig;
use crate::core::{Stage, StageResult, StageStatus};
use crate::errors::WorkflowError;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Which backend runs a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutorBackend {
    /// Runs the command with the configured shell.
    Direct,
    /// Runs the script inside the stage's container image.
    Container,
}

impl fmt::Display for ExecutorBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::Container => write!(f, "container"),
        }
    }
}

/// Executes one stage and reports its outcome.
///
/// Executors never return errors: timeouts, non-zero exits, runner failures
/// and cancellation are all folded into a failed [`StageResult`].
#[async_trait]
pub trait StageExecutor: Send + Sync {
    /// Returns the backend this executor represents.
    fn backend(&self) -> ExecutorBackend;

    /// Resolves the stage into the command that will run.
    fn command_for(&self, stage: &Stage, env: &BTreeMap<String, String>) -> CommandSpec;

    /// Executes the stage with its merged environment.
    async fn execute(
        &self,
        stage: &Stage,
        env: &BTreeMap<String, String>,
        cancel: &CancellationToken,
    ) -> StageResult;
}

/// Picks the executor for a stage: containerized when it names an image,
/// direct otherwise.
#[must_use]
pub fn executor_for(
    stage: &Stage,
    config: &EngineConfig,
    runner: Arc<dyn CommandRunner>,
) -> Box<dyn StageExecutor> {
    if stage.is_containerized() {
        Box::new(ContainerExecutor::new(config.container_runtime.clone(), runner))
    } else {
        Box::new(DirectExecutor::new(config.shell.clone(), runner))
    }
}

/// Runs a resolved command under the stage timeout and the cancellation
/// token, then classifies the outcome.
pub(crate) async fn run_command(
    runner: &dyn CommandRunner,
    stage: &Stage,
    spec: CommandSpec,
    cancel: &CancellationToken,
) -> StageResult {
    debug!(stage = %stage.name, command = %spec.command_line(), "Running stage command");
    let started = Utc::now();

    let outcome = tokio::select! {
        biased;
        () = cancel.cancelled() => Err(WorkflowError::cancelled(
            &stage.name,
            cancel.reason().unwrap_or_else(|| "cancelled".to_string()),
        )),
        res = tokio::time::timeout(stage.timeout, runner.run(&spec)) => match res {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(WorkflowError::stage_execution(&stage.name, e.to_string())),
            Err(_) => Err(WorkflowError::stage_timeout(&stage.name, stage.timeout)),
        },
    };

    classify(stage, outcome).with_times(Some(started), Utc::now())
}

/// Exit code zero is success; anything else, or no exit code at all, fails.
fn classify(stage: &Stage, outcome: Result<CommandOutput, WorkflowError>) -> StageResult {
    match outcome {
        Ok(output) if output.success() => StageResult::new(stage, StageStatus::Success)
            .with_exit_code(output.exit_code)
            .with_output(output.combined()),
        Ok(output) => {
            let error = WorkflowError::stage_execution(
                &stage.name,
                format!("exited with code {}", output.exit_code),
            );
            StageResult::failed(stage, error.to_string())
                .with_exit_code(output.exit_code)
                .with_output(output.combined())
        }
        Err(e) => StageResult::failed(stage, e.to_string()),
    }
}
