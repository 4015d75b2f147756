//! Folds stage results into the final workflow result.

use super::scheduler::ScheduleOutcome;
use super::validator::ValidationReport;
use crate::core::{StageStatus, WorkflowDefinition, WorkflowExecutionResult, WorkflowStatus};
use crate::errors::summarize;
use chrono::Utc;

/// Completes `started` with the scheduler's outcome.
///
/// The workflow succeeds only if every stage has a result and no stage that
/// is not allowed to fail ended in anything but success. The error fields
/// name the first disqualifying stage in result order; a workflow timeout
/// supplies the message when it fired.
#[must_use]
pub fn aggregate(
    workflow: &WorkflowDefinition,
    mut started: WorkflowExecutionResult,
    outcome: ScheduleOutcome,
) -> WorkflowExecutionResult {
    started.stage_results = outcome.results;
    count_statuses(&mut started);

    let culprit = started
        .stage_results
        .iter()
        .find(|r| r.disqualifies_workflow())
        .map(|r| {
            let message = r
                .error
                .clone()
                .unwrap_or_else(|| format!("Stage '{}' failed", r.stage_name));
            (r.stage_name.clone(), message)
        });
    let missing = workflow
        .stages
        .iter()
        .find(|s| started.stage_result(&s.name).is_none())
        .map(|s| s.name.clone());

    started.error_stage = culprit.as_ref().map(|(stage, _)| stage.clone());
    started.error_message = match (outcome.timeout, culprit, missing) {
        (Some(timeout), _, _) => Some(timeout.to_string()),
        (None, Some((_, message)), _) => Some(message),
        (None, None, Some(stage)) => Some(format!("Stage '{stage}' did not complete")),
        (None, None, None) => None,
    };
    started.status = if started.error_message.is_none() {
        WorkflowStatus::Success
    } else {
        WorkflowStatus::Failed
    };

    finish(started)
}

/// Completes `started` as a run rejected by validation. No stage ran.
#[must_use]
pub fn rejected(mut started: WorkflowExecutionResult, report: &ValidationReport) -> WorkflowExecutionResult {
    started.status = WorkflowStatus::Failed;
    started.error_message = Some(summarize(&report.errors));
    started.validation_errors = report.errors.clone();
    finish(started)
}

fn count_statuses(result: &mut WorkflowExecutionResult) {
    let (mut successful, mut failed, mut skipped) = (0, 0, 0);
    for stage in &result.stage_results {
        match stage.status {
            StageStatus::Success => successful += 1,
            StageStatus::Failed => failed += 1,
            StageStatus::Skipped => skipped += 1,
            _ => {}
        }
    }
    result.successful_stages = successful;
    result.failed_stages = failed;
    result.skipped_stages = skipped;
}

fn finish(mut result: WorkflowExecutionResult) -> WorkflowExecutionResult {
    let end = Utc::now();
    result.duration = (end - result.start_time).to_std().unwrap_or_default();
    result.end_time = Some(end);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Stage, StageResult};
    use crate::errors::WorkflowError;
    use crate::testing::chain;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn outcome(results: Vec<StageResult>) -> ScheduleOutcome {
        ScheduleOutcome {
            results,
            timeout: None,
        }
    }

    fn started() -> WorkflowExecutionResult {
        WorkflowExecutionResult::started("wf", "ci", "exec")
    }

    #[test]
    fn test_all_success() {
        let wf = chain("ci", &["build", "test"]);
        let results = wf
            .stages
            .iter()
            .map(|s| StageResult::new(s, StageStatus::Success))
            .collect();

        let result = aggregate(&wf, started(), outcome(results));
        assert_eq!(result.status, WorkflowStatus::Success);
        assert_eq!(result.successful_stages, 2);
        assert_eq!(result.error_message, None);
        assert!(result.end_time.is_some());
    }

    #[test]
    fn test_first_disqualifying_stage_is_reported() {
        let wf = chain("ci", &["build", "test", "deploy"]);
        let results = vec![
            StageResult::failed(&wf.stages[0], "Stage 'build' failed: exited with code 1"),
            StageResult::skipped(&wf.stages[1], "upstream"),
            StageResult::skipped(&wf.stages[2], "upstream"),
        ];

        let result = aggregate(&wf, started(), outcome(results));
        assert_eq!(result.status, WorkflowStatus::Failed);
        assert_eq!(result.error_stage.as_deref(), Some("build"));
        assert_eq!(
            result.error_message.as_deref(),
            Some("Stage 'build' failed: exited with code 1")
        );
        assert_eq!((result.failed_stages, result.skipped_stages), (1, 2));
    }

    #[test]
    fn test_allowed_failure_keeps_success() {
        let scan = Stage::command("scan", "scan").allow_failure();
        let wf = WorkflowDefinition::new("ci").with_stage(scan.clone());

        let result = aggregate(&wf, started(), outcome(vec![StageResult::failed(&scan, "boom")]));
        assert_eq!(result.status, WorkflowStatus::Success);
        assert_eq!(result.failed_stages, 1);
    }

    #[test]
    fn test_timeout_message_wins() {
        let wf = chain("ci", &["slow"]);
        let err = WorkflowError::WorkflowTimeout {
            timeout: Duration::from_secs(1),
        };
        let results = vec![StageResult::failed(&wf.stages[0], err.to_string())];

        let result = aggregate(
            &wf,
            started(),
            ScheduleOutcome {
                results,
                timeout: Some(err),
            },
        );
        assert_eq!(result.error_message.as_deref(), Some("Workflow timed out after 1s"));
        assert_eq!(result.error_stage.as_deref(), Some("slow"));
    }

    #[test]
    fn test_missing_result_fails_workflow() {
        let wf = chain("ci", &["build", "test"]);
        let results = vec![StageResult::new(&wf.stages[0], StageStatus::Success)];

        let result = aggregate(&wf, started(), outcome(results));
        assert_eq!(result.status, WorkflowStatus::Failed);
        assert_eq!(result.error_message.as_deref(), Some("Stage 'test' did not complete"));
    }
}
