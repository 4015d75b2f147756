//! Direct (shell) stage execution.

use super::{run_command, CommandRunner, CommandSpec, ExecutorBackend, StageExecutor};
use crate::cancellation::CancellationToken;
use crate::core::{Stage, StageResult};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Runs a stage's command as `<shell> -c <command>`.
#[derive(Debug, Clone)]
pub struct DirectExecutor {
    shell: String,
    runner: Arc<dyn CommandRunner>,
}

impl DirectExecutor {
    /// Creates a direct executor.
    #[must_use]
    pub fn new(shell: impl Into<String>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            shell: shell.into(),
            runner,
        }
    }
}

#[async_trait]
impl StageExecutor for DirectExecutor {
    fn backend(&self) -> ExecutorBackend {
        ExecutorBackend::Direct
    }

    fn command_for(&self, stage: &Stage, env: &BTreeMap<String, String>) -> CommandSpec {
        CommandSpec {
            stage_name: stage.name.clone(),
            program: self.shell.clone(),
            args: vec!["-c".to_string(), stage.action.script().to_string()],
            env: env.clone(),
            container_image: None,
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ProcessRunner;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_command_uses_shell() {
        let executor = DirectExecutor::new("bash", Arc::new(ProcessRunner));
        let stage = Stage::command("build", "cargo build --release").with_isolation_policy("none");
        let env = BTreeMap::from([("CI".to_string(), "1".to_string())]);

        let spec = executor.command_for(&stage, &env);
        assert_eq!(spec.program, "bash");
        assert_eq!(spec.args, vec!["-c", "cargo build --release"]);
        assert_eq!(spec.env, env);
        assert_eq!(spec.container_image, None);
        assert_eq!(spec.isolation_policy.as_deref(), Some("none"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_runs_real_process() {
        let executor = DirectExecutor::new("sh", Arc::new(ProcessRunner));
        let stage = Stage::command("echo", "echo $TARGET");
        let env = BTreeMap::from([("TARGET".to_string(), "prod".to_string())]);

        let result = executor.execute(&stage, &env, &CancellationToken::new()).await;
        assert!(result.is_success());
        assert_eq!(result.output.trim(), "prod");
    }
}
