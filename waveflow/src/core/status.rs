//! Stage and workflow status enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The lifecycle status of a single stage.
///
/// Stages move `Waiting -> Ready -> Running` and end in one of the
/// terminal states `Success`, `Failed` or `Skipped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageStatus {
    /// Waiting for dependencies to resolve.
    #[default]
    Waiting,
    /// All dependencies resolved; waiting for a free slot.
    Ready,
    /// Handed to an executor.
    Running,
    /// Finished with exit code zero.
    Success,
    /// Finished with a non-zero exit code, timed out, or errored.
    Failed,
    /// Never ran because an upstream stage failed.
    Skipped,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => write!(f, "WAITING"),
            Self::Ready => write!(f, "READY"),
            Self::Running => write!(f, "RUNNING"),
            Self::Success => write!(f, "SUCCESS"),
            Self::Failed => write!(f, "FAILED"),
            Self::Skipped => write!(f, "SKIPPED"),
        }
    }
}

impl StageStatus {
    /// Returns true if the status represents a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed | Self::Skipped)
    }

    /// Returns true if the stage has not been dispatched yet.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Waiting | Self::Ready)
    }
}

/// The overall status of a workflow execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStatus {
    /// The run is in progress.
    #[default]
    Running,
    /// Every required stage succeeded.
    Success,
    /// Validation failed, a required stage did not succeed, or the run timed out.
    Failed,
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "RUNNING"),
            Self::Success => write!(f, "SUCCESS"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_status_display() {
        assert_eq!(StageStatus::Waiting.to_string(), "WAITING");
        assert_eq!(StageStatus::Success.to_string(), "SUCCESS");
        assert_eq!(StageStatus::Skipped.to_string(), "SKIPPED");
    }

    #[test]
    fn test_stage_status_is_terminal() {
        assert!(StageStatus::Success.is_terminal());
        assert!(StageStatus::Failed.is_terminal());
        assert!(StageStatus::Skipped.is_terminal());
        assert!(!StageStatus::Waiting.is_terminal());
        assert!(!StageStatus::Ready.is_terminal());
        assert!(StageStatus::Ready.is_pending());
        assert!(!StageStatus::Running.is_pending());
    }

    #[test]
    fn test_stage_status_serialize() {
        let json = serde_json::to_string(&StageStatus::Failed).unwrap();
        assert_eq!(json, r#""FAILED""#);

        let status: StageStatus = serde_json::from_str(r#""READY""#).unwrap();
        assert_eq!(status, StageStatus::Ready);
    }

    #[test]
    fn test_workflow_status_default() {
        assert_eq!(WorkflowStatus::default(), WorkflowStatus::Running);
        assert_eq!(WorkflowStatus::Failed.to_string(), "FAILED");
    }
}
