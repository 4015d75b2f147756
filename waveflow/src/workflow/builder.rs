//! Workflow builder with validation.

use super::validator::validate;
use crate::core::{Stage, WorkflowDefinition};
use crate::errors::ValidationError;
use std::time::Duration;

/// Builder for creating validated workflow definitions.
#[derive(Debug, Clone)]
pub struct WorkflowBuilder {
    definition: WorkflowDefinition,
}

impl WorkflowBuilder {
    /// Creates a new workflow builder.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            definition: WorkflowDefinition::new(name),
        }
    }

    /// Adds a stage.
    #[must_use]
    pub fn stage(mut self, stage: Stage) -> Self {
        self.definition.stages.push(stage);
        self
    }

    /// Adds a direct stage running `command` after `dependencies`.
    #[must_use]
    pub fn command(self, name: &str, command: &str, dependencies: &[&str]) -> Self {
        self.stage(Stage::command(name, command).with_dependencies(dependencies.iter().copied()))
    }

    /// Sets the workflow id.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.definition.id = id.into();
        self
    }

    /// Sets the concurrency bound.
    #[must_use]
    pub fn max_parallel_stages(mut self, max: usize) -> Self {
        self.definition.max_parallel_stages = max;
        self
    }

    /// Sets the workflow deadline.
    #[must_use]
    pub fn workflow_timeout(mut self, timeout: Duration) -> Self {
        self.definition.workflow_timeout = timeout;
        self
    }

    /// Adds a global environment variable.
    #[must_use]
    pub fn global_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.definition.global_environment.insert(key.into(), value.into());
        self
    }

    /// Composes this builder with another.
    ///
    /// Stages defined identically in both are kept once.
    ///
    /// # Errors
    ///
    /// Returns an error if both define a stage with the same name but
    /// different settings.
    pub fn compose(mut self, other: Self) -> Result<Self, ValidationError> {
        self.definition.name = format!("{}+{}", self.definition.name, other.definition.name);
        for (key, value) in other.definition.global_environment {
            self.definition.global_environment.entry(key).or_insert(value);
        }

        for stage in other.definition.stages {
            match self.definition.stage(&stage.name) {
                Some(existing) if *existing == stage => {}
                Some(_) => {
                    return Err(ValidationError::new(vec![format!(
                        "Conflicting stage definitions for '{}'",
                        stage.name
                    )])
                    .with_stages(vec![stage.name]));
                }
                None => self.definition.stages.push(stage),
            }
        }

        Ok(self)
    }

    /// Returns the workflow name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.definition.stages.len()
    }

    /// Validates and returns the definition.
    ///
    /// # Errors
    ///
    /// Returns every validation issue found.
    pub fn build(self) -> Result<WorkflowDefinition, ValidationError> {
        validate(&self.definition).into_result()?;
        Ok(self.definition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_valid_workflow() {
        let wf = WorkflowBuilder::new("release")
            .command("build", "make", &[])
            .command("test", "make test", &["build"])
            .max_parallel_stages(2)
            .global_env("CI", "1")
            .build()
            .unwrap();

        assert_eq!(wf.name, "release");
        assert_eq!(wf.stage_count(), 2);
        assert_eq!(wf.max_parallel_stages, 2);
    }

    #[test]
    fn test_build_reports_all_errors() {
        let err = WorkflowBuilder::new("")
            .command("deploy", "ship", &["ghost"])
            .build()
            .unwrap_err();

        assert_eq!(err.errors.len(), 2);
        assert!(err.message.contains("Workflow name is required"));
        assert!(err.message.contains("unknown stage 'ghost'"));
    }

    #[test]
    fn test_build_rejects_cycle() {
        let err = WorkflowBuilder::new("loop")
            .command("a", "true", &["b"])
            .command("b", "true", &["a"])
            .build()
            .unwrap_err();

        assert_eq!(err.errors, vec!["Circular dependency detected: a -> b -> a"]);
    }

    #[test]
    fn test_compose_merges_and_dedupes() {
        let left = WorkflowBuilder::new("build").command("compile", "make", &[]);
        let right = WorkflowBuilder::new("test")
            .command("compile", "make", &[])
            .command("unit", "make test", &["compile"]);

        let composed = left.compose(right).unwrap();
        assert_eq!(composed.name(), "build+test");
        assert_eq!(composed.stage_count(), 2);
    }

    #[test]
    fn test_compose_conflict() {
        let left = WorkflowBuilder::new("a").command("compile", "make", &[]);
        let right = WorkflowBuilder::new("b").command("compile", "cargo build", &[]);

        let err = left.compose(right).unwrap_err();
        assert_eq!(err.stages, vec!["compile"]);
    }
}
