//! Engine configuration.

use crate::errors::WorkflowError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How the scheduler reacts to a stage that fails without `allow_failure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    /// Skip the failed stage's dependents; unrelated branches keep running.
    #[default]
    ContinueOnFailure,
    /// Stop dispatching anything new; running stages finish, the rest are skipped.
    FailFast,
}

/// Settings that apply to every workflow an engine runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Shell used by the direct backend, invoked as `<shell> -c <command>`.
    #[serde(default = "default_shell")]
    pub shell: String,
    /// Container runtime binary used by the containerized backend.
    #[serde(default = "default_container_runtime")]
    pub container_runtime: String,
    /// Reaction to required-stage failures.
    #[serde(default)]
    pub failure_mode: FailureMode,
}

fn default_shell() -> String {
    "sh".to_string()
}

fn default_container_runtime() -> String {
    "docker".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            shell: default_shell(),
            container_runtime: default_container_runtime(),
            failure_mode: FailureMode::default(),
        }
    }
}

impl EngineConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from JSON; missing keys take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, WorkflowError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, WorkflowError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Sets the shell.
    #[must_use]
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    /// Sets the container runtime.
    #[must_use]
    pub fn with_container_runtime(mut self, runtime: impl Into<String>) -> Self {
        self.container_runtime = runtime.into();
        self
    }

    /// Sets the failure mode.
    #[must_use]
    pub fn with_failure_mode(mut self, mode: FailureMode) -> Self {
        self.failure_mode = mode;
        self
    }
}
