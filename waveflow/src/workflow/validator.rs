//! Structural validation of workflow definitions.
//!
//! Every check runs on every call so the caller sees all problems at once.

use super::graph::DependencyGraph;
use crate::core::{StageAction, WorkflowDefinition};
use crate::errors::{CycleDetectedError, ValidationError, ValidationIssue};
use std::collections::HashSet;

/// Outcome of validating a workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    /// True when no issue was found.
    pub valid: bool,
    /// Human-readable messages, one per issue.
    pub errors: Vec<String>,
    /// The typed issues behind `errors`.
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    fn from_issues(issues: Vec<ValidationIssue>) -> Self {
        Self {
            valid: issues.is_empty(),
            errors: issues.iter().map(ToString::to_string).collect(),
            issues,
        }
    }

    /// Returns true when no issue was found.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Converts the report into a result.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] listing every issue and the stages they
    /// involve.
    pub fn into_result(self) -> Result<(), ValidationError> {
        if self.valid {
            return Ok(());
        }
        let mut stages: Vec<String> = Vec::new();
        for name in self.issues.iter().flat_map(ValidationIssue::stages) {
            if !stages.contains(&name) {
                stages.push(name);
            }
        }
        Err(ValidationError::new(self.errors).with_stages(stages))
    }
}

/// Validates a workflow definition.
#[must_use]
pub fn validate(workflow: &WorkflowDefinition) -> ValidationReport {
    let mut issues = Vec::new();

    if workflow.name.trim().is_empty() {
        issues.push(ValidationIssue::MissingName);
    }
    if workflow.stages.is_empty() {
        issues.push(ValidationIssue::NoStages);
    }
    if workflow.max_parallel_stages == 0 {
        issues.push(ValidationIssue::InvalidParallelism);
    }

    let mut seen = HashSet::new();
    for stage in &workflow.stages {
        if !seen.insert(stage.name.as_str()) {
            issues.push(ValidationIssue::DuplicateStage(stage.name.clone()));
        }
        match &stage.action {
            StageAction::Container { container_image, .. } if container_image.trim().is_empty() => {
                issues.push(ValidationIssue::EmptyImage(stage.name.clone()));
            }
            _ => {}
        }
        if stage.action.script().trim().is_empty() {
            issues.push(ValidationIssue::EmptyCommand(stage.name.clone()));
        }
    }

    for stage in &workflow.stages {
        for dep in &stage.depends_on {
            if !seen.contains(dep.as_str()) {
                issues.push(ValidationIssue::UnknownDependency {
                    stage: stage.name.clone(),
                    dependency: dep.clone(),
                });
            }
        }
    }

    if let Some(cycle) = DependencyGraph::build(&workflow.stages).find_cycle() {
        issues.push(ValidationIssue::Cycle(CycleDetectedError::new(cycle)));
    }

    ValidationReport::from_issues(issues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Stage;
    use crate::testing::diamond;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_valid_workflow() {
        let report = validate(&diamond());
        assert!(report.is_valid());
        assert!(report.errors.is_empty());
        assert!(report.into_result().is_ok());
    }

    #[test]
    fn test_collects_every_issue() {
        let workflow = WorkflowDefinition::new("  ").with_max_parallel_stages(0);
        let report = validate(&workflow);

        assert!(!report.valid);
        assert_eq!(
            report.errors,
            vec![
                "Workflow name is required",
                "Workflow must have at least one stage",
                "max_parallel_stages must be at least 1",
            ]
        );
    }

    #[test]
    fn test_unknown_dependency() {
        let workflow = WorkflowDefinition::new("ci").with_stages([
            Stage::command("build", "make"),
            Stage::command("deploy", "ship").depends_on("nonexistent"),
        ]);

        let report = validate(&workflow);
        assert_eq!(
            report.errors,
            vec!["stage 'deploy' depends on unknown stage 'nonexistent'"]
        );
        let err = report.into_result().unwrap_err();
        assert_eq!(err.stages, vec!["deploy", "nonexistent"]);
    }

    #[test]
    fn test_cycle_reported_with_path() {
        let workflow = WorkflowDefinition::new("ci").with_stages([
            Stage::command("a", "true").depends_on("b"),
            Stage::command("b", "true").depends_on("a"),
        ]);

        let report = validate(&workflow);
        assert_eq!(report.errors, vec!["Circular dependency detected: a -> b -> a"]);
        assert_eq!(
            report.issues,
            vec![ValidationIssue::Cycle(CycleDetectedError::new(vec![
                "a".to_string(),
                "b".to_string(),
                "a".to_string(),
            ]))]
        );
    }

    #[test]
    fn test_stage_level_issues() {
        let workflow = WorkflowDefinition::new("ci").with_stages([
            Stage::command("build", "make"),
            Stage::command("build", "make again"),
            Stage::command("lint", "   "),
            Stage::container("scan", "", "scan ."),
        ]);

        let report = validate(&workflow);
        assert_eq!(
            report.errors,
            vec![
                "duplicate stage name 'build'",
                "stage 'lint' has an empty command",
                "stage 'scan' has an empty container image",
            ]
        );
    }
}
