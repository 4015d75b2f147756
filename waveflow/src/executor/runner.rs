//! Command runner abstraction and the default process-backed runner.

use crate::errors::WorkflowError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::process::Stdio;

/// A fully resolved command ready to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// The stage this command belongs to.
    pub stage_name: String,
    /// Program to invoke.
    pub program: String,
    /// Program arguments.
    pub args: Vec<String>,
    /// Environment added on top of the runner's own.
    pub env: BTreeMap<String, String>,
    /// Image the command runs in, for containerized stages.
    pub container_image: Option<String>,
    /// Opaque isolation policy from the stage.
    pub isolation_policy: Option<String>,
}

impl CommandSpec {
    /// Returns the command line as a single display string.
    #[must_use]
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// What a finished command produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `-1` when the process was killed by a signal.
    pub exit_code: i32,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// Creates an output with the given exit code and no captured text.
    #[must_use]
    pub fn with_exit_code(exit_code: i32) -> Self {
        Self {
            exit_code,
            ..Self::default()
        }
    }

    /// Returns true for exit code zero.
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Returns stdout followed by stderr.
    #[must_use]
    pub fn combined(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (_, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}{}", self.stdout, self.stderr),
        }
    }
}

/// Runs resolved commands. This is where process spawning, remote
/// execution or fakes plug in.
///
/// Implementations are dropped mid-flight on timeout or cancellation and
/// must release their resources when that happens.
#[async_trait]
pub trait CommandRunner: Send + Sync + Debug {
    /// Runs the command to completion.
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, WorkflowError>;
}

/// Runs commands as local child processes.
///
/// Children are killed when the run future is dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    /// Creates a new process runner.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, WorkflowError> {
        let output = tokio::process::Command::new(&spec.program)
            .args(&spec.args)
            .envs(&spec.env)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        Ok(CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell(script: &str) -> CommandSpec {
        CommandSpec {
            stage_name: "test".to_string(),
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            env: BTreeMap::from([("GREETING".to_string(), "hello".to_string())]),
            container_image: None,
            isolation_policy: None,
        }
    }

    #[test]
    fn test_command_line() {
        assert_eq!(shell("exit 0").command_line(), "sh -c exit 0");
    }

    #[test]
    fn test_combined_output() {
        let out = CommandOutput {
            exit_code: 1,
            stdout: "out\n".to_string(),
            stderr: "err\n".to_string(),
        };
        assert_eq!(out.combined(), "out\nerr\n");
        assert!(!out.success());
        assert!(CommandOutput::with_exit_code(0).success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_captures_output_and_env() {
        let out = ProcessRunner::new().run(&shell("echo $GREETING")).await.unwrap();
        assert!(out.success());
        assert_eq!(out.stdout.trim(), "hello");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_reports_exit_code() {
        let out = ProcessRunner::new().run(&shell("exit 3")).await.unwrap();
        assert_eq!(out.exit_code, 3);
    }

    #[tokio::test]
    async fn test_process_runner_missing_program() {
        let mut spec = shell("true");
        spec.program = "/no/such/program".to_string();

        let err = ProcessRunner::new().run(&spec).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Io(_)));
    }
}
