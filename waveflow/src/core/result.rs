//! Stage and workflow execution results.

use super::{Stage, StageStatus, WorkflowStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The outcome of one stage within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    /// The stage name.
    pub stage_name: String,
    /// The stage type tag, copied from the stage.
    pub stage_type: String,
    /// Terminal status of the stage.
    pub status: StageStatus,
    /// Process exit code, when the command ran to completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    /// Captured output.
    #[serde(default)]
    pub output: String,
    /// Error description for failed or skipped stages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the stage was dispatched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    /// When the stage reached its terminal state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Wall-clock run time; zero for stages that never started.
    #[serde(rename = "duration_secs", with = "crate::utils::durations")]
    pub duration: Duration,
    /// Whether the stage was allowed to fail.
    pub allow_failure: bool,
}

impl StageResult {
    /// Creates a result for `stage` with the given status and nothing else set.
    #[must_use]
    pub fn new(stage: &Stage, status: StageStatus) -> Self {
        Self {
            stage_name: stage.name.clone(),
            stage_type: stage.stage_type.clone(),
            status,
            exit_code: None,
            output: String::new(),
            error: None,
            start_time: None,
            end_time: None,
            duration: Duration::ZERO,
            allow_failure: stage.allow_failure,
        }
    }

    /// Creates a failed result carrying an error message.
    #[must_use]
    pub fn failed(stage: &Stage, error: impl Into<String>) -> Self {
        Self::new(stage, StageStatus::Failed).with_error(error)
    }

    /// Creates a skipped result with the reason it never ran.
    #[must_use]
    pub fn skipped(stage: &Stage, reason: impl Into<String>) -> Self {
        let now = Utc::now();
        Self::new(stage, StageStatus::Skipped)
            .with_error(reason)
            .with_times(None, now)
    }

    /// Sets the exit code.
    #[must_use]
    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = Some(code);
        self
    }

    /// Sets the captured output.
    #[must_use]
    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = output.into();
        self
    }

    /// Sets the error message.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Sets start and end timestamps and derives the duration from them.
    #[must_use]
    pub fn with_times(mut self, start: Option<DateTime<Utc>>, end: DateTime<Utc>) -> Self {
        self.start_time = start;
        self.end_time = Some(end);
        self.duration = start
            .and_then(|s| (end - s).to_std().ok())
            .unwrap_or(Duration::ZERO);
        self
    }

    /// Returns true if the stage succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == StageStatus::Success
    }

    /// Returns true if this result makes the workflow fail: a stage that is
    /// not allowed to fail ended in anything other than success.
    #[must_use]
    pub fn disqualifies_workflow(&self) -> bool {
        !self.allow_failure && !self.is_success()
    }
}

/// The outcome of one workflow run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowExecutionResult {
    /// The workflow definition id.
    pub workflow_id: String,
    /// The workflow name.
    pub workflow_name: String,
    /// Identifier of this run.
    pub execution_id: String,
    /// Overall status.
    pub status: WorkflowStatus,
    /// When the run started.
    pub start_time: DateTime<Utc>,
    /// When the run finished.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Total wall-clock time.
    #[serde(rename = "duration_secs", with = "crate::utils::durations")]
    pub duration: Duration,
    /// Per-stage results in the order stages reached a terminal state.
    pub stage_results: Vec<StageResult>,
    /// Number of stages that succeeded.
    pub successful_stages: usize,
    /// Number of stages that failed, including allowed failures.
    pub failed_stages: usize,
    /// Number of stages skipped because of an upstream failure.
    pub skipped_stages: usize,
    /// Why the workflow failed, if it did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// The first stage that caused the workflow to fail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_stage: Option<String>,
    /// Validation errors, when the definition was rejected before running.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_errors: Vec<String>,
}

impl WorkflowExecutionResult {
    /// Creates a running result with no stage outcomes.
    #[must_use]
    pub fn started(
        workflow_id: impl Into<String>,
        workflow_name: impl Into<String>,
        execution_id: impl Into<String>,
    ) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            workflow_name: workflow_name.into(),
            execution_id: execution_id.into(),
            status: WorkflowStatus::Running,
            start_time: Utc::now(),
            end_time: None,
            duration: Duration::ZERO,
            stage_results: Vec::new(),
            successful_stages: 0,
            failed_stages: 0,
            skipped_stages: 0,
            error_message: None,
            error_stage: None,
            validation_errors: Vec::new(),
        }
    }

    /// Looks up the result for a stage.
    #[must_use]
    pub fn stage_result(&self, name: &str) -> Option<&StageResult> {
        self.stage_results.iter().find(|r| r.stage_name == name)
    }

    /// Returns true if the workflow succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == WorkflowStatus::Success
    }

    /// Returns the number of stages with a recorded result.
    #[must_use]
    pub fn executed_stages(&self) -> usize {
        self.stage_results.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_times_derives_duration() {
        let stage = Stage::command("build", "make");
        let start = Utc::now();
        let end = start + chrono::Duration::milliseconds(250);

        let result = StageResult::new(&stage, StageStatus::Success).with_times(Some(start), end);
        assert_eq!(result.duration, Duration::from_millis(250));
    }

    #[test]
    fn test_allowed_failure_does_not_disqualify() {
        let stage = Stage::command("scan", "scan").allow_failure();
        let result = StageResult::failed(&stage, "exit 1");
        assert!(!result.disqualifies_workflow());

        let required = Stage::command("build", "make");
        assert!(StageResult::skipped(&required, "upstream failed").disqualifies_workflow());
    }

    #[test]
    fn test_result_serializes_statuses() {
        let result = WorkflowExecutionResult::started("wf", "ci", "exec");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "RUNNING");
        assert_eq!(json["successful_stages"], 0);
        assert!(json.get("validation_errors").is_none());
    }
}
