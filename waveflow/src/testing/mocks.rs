//! Fake command runners for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::errors::WorkflowError;
use crate::executor::{CommandOutput, CommandRunner, CommandSpec};

/// How a scripted stage behaves when run.
#[derive(Debug, Clone, Default)]
pub struct StageScript {
    /// Exit code to report.
    pub exit_code: i32,
    /// How long the fake command "runs".
    pub delay: Duration,
    /// Text reported as stdout.
    pub output: String,
    /// Panic instead of returning.
    pub panic: bool,
    /// Fail as if the process could not be spawned.
    pub runner_error: Option<String>,
}

impl StageScript {
    /// A command that exits zero immediately.
    #[must_use]
    pub fn success() -> Self {
        Self::default()
    }

    /// A command that exits with `code`.
    #[must_use]
    pub fn exit_code(code: i32) -> Self {
        Self {
            exit_code: code,
            ..Self::default()
        }
    }

    /// A command whose runner panics.
    #[must_use]
    pub fn panics() -> Self {
        Self {
            panic: true,
            ..Self::default()
        }
    }

    /// A command that cannot be started.
    #[must_use]
    pub fn runner_error(message: impl Into<String>) -> Self {
        Self {
            runner_error: Some(message.into()),
            ..Self::default()
        }
    }

    /// Sets the delay.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Sets the stdout text.
    #[must_use]
    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = output.into();
        self
    }
}

/// A deterministic [`CommandRunner`] keyed by stage name.
///
/// Stages without a script succeed immediately. Every command is recorded
/// in start order, and the peak number of simultaneous runs is tracked.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    scripts: HashMap<String, StageScript>,
    default_script: StageScript,
    calls: Mutex<Vec<CommandSpec>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedRunner {
    /// Creates a runner where every stage succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the behaviour of one stage.
    #[must_use]
    pub fn script(mut self, stage: impl Into<String>, script: StageScript) -> Self {
        self.scripts.insert(stage.into(), script);
        self
    }

    /// Sets the behaviour of stages without their own script.
    #[must_use]
    pub fn with_default(mut self, script: StageScript) -> Self {
        self.default_script = script;
        self
    }

    /// Returns the commands run so far, in start order.
    #[must_use]
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().clone()
    }

    /// Returns the stage names run so far, in start order.
    #[must_use]
    pub fn started(&self) -> Vec<String> {
        self.calls.lock().iter().map(|c| c.stage_name.clone()).collect()
    }

    /// Returns the recorded command for a stage.
    #[must_use]
    pub fn call_for(&self, stage: &str) -> Option<CommandSpec> {
        self.calls.lock().iter().find(|c| c.stage_name == stage).cloned()
    }

    /// Returns the number of commands run.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Returns the highest number of commands that were running at once.
    #[must_use]
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Decrements the in-flight counter even when the run future is dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, WorkflowError> {
        let script = self
            .scripts
            .get(&spec.stage_name)
            .unwrap_or(&self.default_script)
            .clone();
        self.calls.lock().push(spec.clone());

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        if !script.delay.is_zero() {
            tokio::time::sleep(script.delay).await;
        }
        if script.panic {
            panic!("scripted panic in stage '{}'", spec.stage_name);
        }
        if let Some(message) = script.runner_error {
            return Err(std::io::Error::other(message).into());
        }

        Ok(CommandOutput {
            exit_code: script.exit_code,
            stdout: script.output,
            stderr: String::new(),
        })
    }
}
