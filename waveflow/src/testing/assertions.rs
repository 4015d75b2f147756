//! Test assertions for workflow results.

use crate::core::{StageStatus, WorkflowExecutionResult, WorkflowStatus};

/// Asserts that the workflow succeeded.
pub fn assert_workflow_succeeded(result: &WorkflowExecutionResult) {
    assert_eq!(
        result.status,
        WorkflowStatus::Success,
        "Expected workflow success, got {:?} ({:?})",
        result.status,
        result.error_message
    );
}

/// Asserts that the workflow failed.
pub fn assert_workflow_failed(result: &WorkflowExecutionResult) {
    assert_eq!(
        result.status,
        WorkflowStatus::Failed,
        "Expected workflow failure, got {:?}",
        result.status
    );
}

/// Asserts that a stage ended with the expected status.
pub fn assert_stage_status(result: &WorkflowExecutionResult, stage: &str, expected: StageStatus) {
    let actual = result.stage_result(stage).map(|r| r.status);
    assert_eq!(
        actual,
        Some(expected),
        "Expected stage '{}' to be {:?}, got {:?}",
        stage,
        expected,
        actual
    );
}

/// Asserts that a stage's error message contains `needle`.
pub fn assert_stage_error_contains(result: &WorkflowExecutionResult, stage: &str, needle: &str) {
    let error = result.stage_result(stage).and_then(|r| r.error.clone());
    assert!(
        error.as_deref().is_some_and(|e| e.contains(needle)),
        "Expected stage '{}' error to contain '{}', got {:?}",
        stage,
        needle,
        error
    );
}

/// Asserts that `first` finished before `second` started.
pub fn assert_ran_before(result: &WorkflowExecutionResult, first: &str, second: &str) {
    let end = result.stage_result(first).and_then(|r| r.end_time);
    let start = result.stage_result(second).and_then(|r| r.start_time);
    match (end, start) {
        (Some(end), Some(start)) => assert!(
            end <= start,
            "Expected '{}' (ended {}) to finish before '{}' (started {})",
            first,
            end,
            second,
            start
        ),
        _ => panic!(
            "Expected '{}' and '{}' both to have run, got end={:?} start={:?}",
            first, second, end, start
        ),
    }
}
