//! Workflow definition.

use super::Stage;
use crate::errors::WorkflowError;
use crate::utils::generate_id;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Default concurrency bound for a workflow.
pub const DEFAULT_MAX_PARALLEL_STAGES: usize = 3;

/// Default deadline for a whole workflow run.
pub const DEFAULT_WORKFLOW_TIMEOUT: Duration = Duration::from_secs(3600);

fn default_max_parallel_stages() -> usize {
    DEFAULT_MAX_PARALLEL_STAGES
}

fn default_workflow_timeout() -> Duration {
    DEFAULT_WORKFLOW_TIMEOUT
}

/// A named set of interdependent stages plus run-wide settings.
///
/// A definition is plain configuration: the engine never mutates it, and
/// per-run state lives in the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Workflow identifier, generated when absent.
    #[serde(default = "generate_id")]
    pub id: String,
    /// Human-readable name; must not be blank.
    #[serde(default)]
    pub name: String,
    /// Stages in definition order. Order breaks dispatch ties.
    #[serde(default)]
    pub stages: Vec<Stage>,
    /// Maximum number of stages running at once.
    #[serde(default = "default_max_parallel_stages")]
    pub max_parallel_stages: usize,
    /// Deadline for the whole run.
    #[serde(
        rename = "workflow_timeout_secs",
        default = "default_workflow_timeout",
        with = "crate::utils::durations"
    )]
    pub workflow_timeout: Duration,
    /// Environment merged into every stage; stage-local keys win.
    #[serde(default)]
    pub global_environment: BTreeMap<String, String>,
}

impl WorkflowDefinition {
    /// Creates an empty workflow with a fresh id and default settings.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            name: name.into(),
            stages: Vec::new(),
            max_parallel_stages: DEFAULT_MAX_PARALLEL_STAGES,
            workflow_timeout: DEFAULT_WORKFLOW_TIMEOUT,
            global_environment: BTreeMap::new(),
        }
    }

    /// Parses a definition from JSON.
    ///
    /// Parsing does not validate; run the validator (or the engine) for that.
    pub fn from_json_str(json: &str) -> Result<Self, WorkflowError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON definition file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, WorkflowError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Overrides the generated id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Appends a stage.
    #[must_use]
    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    /// Appends several stages.
    #[must_use]
    pub fn with_stages(mut self, stages: impl IntoIterator<Item = Stage>) -> Self {
        self.stages.extend(stages);
        self
    }

    /// Sets the concurrency bound.
    #[must_use]
    pub fn with_max_parallel_stages(mut self, max: usize) -> Self {
        self.max_parallel_stages = max;
        self
    }

    /// Sets the workflow deadline.
    #[must_use]
    pub fn with_workflow_timeout(mut self, timeout: Duration) -> Self {
        self.workflow_timeout = timeout;
        self
    }

    /// Adds a global environment variable.
    #[must_use]
    pub fn with_global_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.global_environment.insert(key.into(), value.into());
        self
    }

    /// Looks up a stage by name.
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.name == name)
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Returns the environment a stage runs with: global values overlaid by
    /// the stage's own.
    #[must_use]
    pub fn merged_environment(&self, stage: &Stage) -> BTreeMap<String, String> {
        let mut env = self.global_environment.clone();
        env.extend(
            stage
                .environment
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        env
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_workflow_defaults() {
        let wf = WorkflowDefinition::new("ci");
        assert_eq!(wf.max_parallel_stages, 3);
        assert_eq!(wf.workflow_timeout, DEFAULT_WORKFLOW_TIMEOUT);
        assert!(!wf.id.is_empty());
        assert_ne!(wf.id, WorkflowDefinition::new("ci").id);
    }

    #[test]
    fn test_stage_env_wins_over_global() {
        let stage = Stage::command("build", "make").with_env("MODE", "release");
        let wf = WorkflowDefinition::new("ci")
            .with_global_env("MODE", "debug")
            .with_global_env("CI", "true")
            .with_stage(stage.clone());

        let env = wf.merged_environment(&stage);
        assert_eq!(env.get("MODE").map(String::as_str), Some("release"));
        assert_eq!(env.get("CI").map(String::as_str), Some("true"));
    }

    #[test]
    fn test_from_json_applies_defaults() {
        let wf = WorkflowDefinition::from_json_str(
            r#"{
                "name": "release",
                "stages": [
                    {"name": "build", "command": "make"},
                    {"name": "scan", "container_image": "scanner:1", "script": "scan .",
                     "allow_failure": true, "depends_on": ["build"]}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(wf.name, "release");
        assert_eq!(wf.stage_count(), 2);
        assert_eq!(wf.max_parallel_stages, DEFAULT_MAX_PARALLEL_STAGES);
        assert!(wf.stage("scan").unwrap().allow_failure);
        assert!(wf.stage("missing").is_none());
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        let err = WorkflowDefinition::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, WorkflowError::Serialization(_)));
    }
}
