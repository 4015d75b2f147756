//! Error types for waveflow.
//!
//! Validation problems are reported before anything runs. Stage-level
//! failures (timeouts, non-zero exits, cancellation) never escape the
//! engine; their messages are rendered from [`WorkflowError`] variants and
//! recorded on the corresponding stage result.

use std::time::Duration;
use thiserror::Error;

/// The main error type for waveflow operations.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The workflow definition is malformed.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// The dependency graph contains a cycle.
    #[error("{0}")]
    CycleDetected(#[from] CycleDetectedError),

    /// A single stage exceeded its timeout.
    #[error("Stage '{stage}' timed out after {}s", .timeout.as_secs_f64())]
    StageTimeout {
        /// The stage name.
        stage: String,
        /// The timeout that elapsed.
        timeout: Duration,
    },

    /// A stage exited non-zero or its executor failed.
    #[error("Stage '{stage}' failed: {message}")]
    StageExecution {
        /// The stage name.
        stage: String,
        /// What went wrong.
        message: String,
    },

    /// The whole run exceeded its deadline.
    #[error("Workflow timed out after {}s", .timeout.as_secs_f64())]
    WorkflowTimeout {
        /// The workflow timeout.
        timeout: Duration,
    },

    /// A stage was cancelled while running.
    #[error("Stage '{stage}' cancelled: {reason}")]
    Cancelled {
        /// The stage name.
        stage: String,
        /// The cancellation reason.
        reason: String,
    },

    /// An unexpected internal error, such as a panicking executor.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkflowError {
    /// Creates a stage timeout error.
    #[must_use]
    pub fn stage_timeout(stage: impl Into<String>, timeout: Duration) -> Self {
        Self::StageTimeout {
            stage: stage.into(),
            timeout,
        }
    }

    /// Creates a stage execution error.
    #[must_use]
    pub fn stage_execution(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StageExecution {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Creates a stage cancellation error.
    #[must_use]
    pub fn cancelled(stage: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Cancelled {
            stage: stage.into(),
            reason: reason.into(),
        }
    }
}

/// Error raised when a workflow definition fails validation.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ValidationError {
    /// Summary of all problems.
    pub message: String,
    /// One entry per problem found.
    pub errors: Vec<String>,
    /// Stages involved in any of the problems.
    pub stages: Vec<String>,
}

impl ValidationError {
    /// Creates a validation error from a list of problem descriptions.
    #[must_use]
    pub fn new(errors: Vec<String>) -> Self {
        Self {
            message: summarize(&errors),
            errors,
            stages: Vec::new(),
        }
    }

    /// Sets the stages involved.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<String>) -> Self {
        self.stages = stages;
        self
    }
}

/// Joins validation messages into the single-line summary used for
/// `error_message` on rejected workflows.
#[must_use]
pub fn summarize(errors: &[String]) -> String {
    format!("Workflow validation failed: {}", errors.join("; "))
}

/// Error raised when a cycle is detected in the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Circular dependency detected: {}", cycle_path.join(" -> "))]
pub struct CycleDetectedError {
    /// The stages forming the cycle, with the first repeated at the end.
    pub cycle_path: Vec<String>,
}

impl CycleDetectedError {
    /// Creates a new cycle detected error.
    #[must_use]
    pub fn new(cycle_path: Vec<String>) -> Self {
        Self { cycle_path }
    }
}

impl From<CycleDetectedError> for ValidationError {
    fn from(err: CycleDetectedError) -> Self {
        Self::new(vec![err.to_string()]).with_stages(err.cycle_path)
    }
}

/// A single structural problem found by the validator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationIssue {
    /// The workflow name is empty.
    #[error("Workflow name is required")]
    MissingName,

    /// The workflow has no stages.
    #[error("Workflow must have at least one stage")]
    NoStages,

    /// Two stages share a name.
    #[error("duplicate stage name '{0}'")]
    DuplicateStage(String),

    /// A stage depends on a name that is not defined.
    #[error("stage '{stage}' depends on unknown stage '{dependency}'")]
    UnknownDependency {
        /// The depending stage.
        stage: String,
        /// The missing dependency.
        dependency: String,
    },

    /// The dependency graph is cyclic.
    #[error(transparent)]
    Cycle(#[from] CycleDetectedError),

    /// A stage has an empty command or script.
    #[error("stage '{0}' has an empty command")]
    EmptyCommand(String),

    /// A container stage has an empty image reference.
    #[error("stage '{0}' has an empty container image")]
    EmptyImage(String),

    /// The concurrency bound is zero.
    #[error("max_parallel_stages must be at least 1")]
    InvalidParallelism,
}

impl ValidationIssue {
    /// Returns the stages this issue refers to.
    #[must_use]
    pub fn stages(&self) -> Vec<String> {
        match self {
            Self::DuplicateStage(name) | Self::EmptyCommand(name) | Self::EmptyImage(name) => {
                vec![name.clone()]
            }
            Self::UnknownDependency { stage, dependency } => {
                vec![stage.clone(), dependency.clone()]
            }
            Self::Cycle(err) => err.cycle_path.clone(),
            Self::MissingName | Self::NoStages | Self::InvalidParallelism => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_detected_error() {
        let err = CycleDetectedError::new(vec![
            "a".to_string(),
            "b".to_string(),
            "c".to_string(),
            "a".to_string(),
        ]);

        assert_eq!(err.to_string(), "Circular dependency detected: a -> b -> c -> a");
    }

    #[test]
    fn test_cycle_converts_to_validation_error() {
        let err: ValidationError =
            CycleDetectedError::new(vec!["a".to_string(), "a".to_string()]).into();

        assert_eq!(err.errors.len(), 1);
        assert_eq!(err.stages, vec!["a".to_string(), "a".to_string()]);
        assert!(err.message.starts_with("Workflow validation failed"));
    }

    #[test]
    fn test_timeout_messages() {
        let err = WorkflowError::stage_timeout("build", Duration::from_secs(2));
        assert_eq!(err.to_string(), "Stage 'build' timed out after 2s");

        let err = WorkflowError::WorkflowTimeout {
            timeout: Duration::from_millis(500),
        };
        assert_eq!(err.to_string(), "Workflow timed out after 0.5s");
    }

    #[test]
    fn test_issue_messages() {
        let issue = ValidationIssue::UnknownDependency {
            stage: "deploy".to_string(),
            dependency: "nonexistent".to_string(),
        };
        assert_eq!(
            issue.to_string(),
            "stage 'deploy' depends on unknown stage 'nonexistent'"
        );
        assert_eq!(issue.stages().len(), 2);
        assert_eq!(ValidationIssue::MissingName.to_string(), "Workflow name is required");
    }
}
