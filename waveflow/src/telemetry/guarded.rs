//! Panic-isolating wrapper around a telemetry sink.

use super::TelemetrySink;
use crate::core::{StageStatus, WorkflowExecutionResult};
use chrono::{DateTime, Utc};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::warn;

/// Forwards to a sink and swallows its panics, so a broken sink cannot
/// change the outcome of a run.
#[derive(Clone)]
pub(crate) struct GuardedSink {
    inner: Arc<dyn TelemetrySink>,
}

impl GuardedSink {
    pub(crate) fn new(inner: Arc<dyn TelemetrySink>) -> Self {
        Self { inner }
    }

    pub(crate) fn workflow_start(&self, workflow_id: &str, timestamp: DateTime<Utc>) {
        guard("on_workflow_start", || {
            self.inner.on_workflow_start(workflow_id, timestamp);
        });
    }

    pub(crate) fn workflow_end(&self, workflow_id: &str, result: &WorkflowExecutionResult) {
        guard("on_workflow_end", || self.inner.on_workflow_end(workflow_id, result));
    }

    pub(crate) fn stage_event(&self, stage_name: &str, status: StageStatus) {
        let now = Utc::now();
        guard("on_stage_event", || {
            self.inner.on_stage_event(stage_name, status, now);
        });
    }
}

fn guard(hook: &str, call: impl FnOnce()) {
    if let Err(e) = catch_unwind(AssertUnwindSafe(call)) {
        warn!(hook, "Telemetry sink panicked: {:?}", e);
    }
}

impl std::fmt::Debug for GuardedSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardedSink").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ExplodingSink;

    impl TelemetrySink for ExplodingSink {
        fn on_workflow_start(&self, _workflow_id: &str, _timestamp: DateTime<Utc>) {
            panic!("sink exploded");
        }

        fn on_workflow_end(&self, _workflow_id: &str, _result: &WorkflowExecutionResult) {
            panic!("sink exploded");
        }

        fn on_stage_event(&self, _stage_name: &str, _status: StageStatus, _timestamp: DateTime<Utc>) {
            panic!("sink exploded");
        }
    }

    #[test]
    fn test_panicking_sink_is_contained() {
        let sink = GuardedSink::new(Arc::new(ExplodingSink));
        sink.workflow_start("wf", Utc::now());
        sink.stage_event("build", StageStatus::Running);
        sink.workflow_end("wf", &WorkflowExecutionResult::started("wf", "ci", "exec"));
    }
}
