//! Containerized stage execution.

use super::{run_command, CommandRunner, CommandSpec, ExecutorBackend, StageExecutor};
use crate::cancellation::CancellationToken;
use crate::core::{Stage, StageResult};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Runs a stage's script inside its container image through a container
/// runtime CLI (`docker`, `podman`, ...).
///
/// The generated command is
/// `<runtime> run --rm [--cpus N] [--memory M] [-e K=V]... <image> sh -c <script>`.
/// Resource limits are passed through, never enforced here.
#[derive(Debug, Clone)]
pub struct ContainerExecutor {
    runtime: String,
    runner: Arc<dyn CommandRunner>,
}

impl ContainerExecutor {
    /// Creates a container executor.
    #[must_use]
    pub fn new(runtime: impl Into<String>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runtime: runtime.into(),
            runner,
        }
    }
}

#[async_trait]
impl StageExecutor for ContainerExecutor {
    fn backend(&self) -> ExecutorBackend {
        ExecutorBackend::Container
    }

    fn command_for(&self, stage: &Stage, env: &BTreeMap<String, String>) -> CommandSpec {
        let image = stage.action.container_image().unwrap_or_default().to_string();

        let mut args = vec!["run".to_string(), "--rm".to_string()];
        if let Some(cpus) = stage.resources.cpus {
            args.push("--cpus".to_string());
            args.push(cpus.to_string());
        }
        if let Some(memory) = &stage.resources.memory {
            args.push("--memory".to_string());
            args.push(memory.clone());
        }
        for (key, value) in env {
            args.push("-e".to_string());
            args.push(format!("{key}={value}"));
        }
        args.extend([
            image.clone(),
            "sh".to_string(),
            "-c".to_string(),
            stage.action.script().to_string(),
        ]);

        CommandSpec {
            stage_name: stage.name.clone(),
            program: self.runtime.clone(),
            args,
            env: env.clone(),
            container_image: Some(image),
            isolation_policy: stage.isolation_policy.clone(),
        }
    }

    async fn execute(
        &self,
        stage: &Stage,
        env: &BTreeMap<String, String>,
        cancel: &CancellationToken,
    ) -> StageResult {
        let spec = self.command_for(stage, env);
        run_command(self.runner.as_ref(), stage, spec, cancel).await
    }
}
