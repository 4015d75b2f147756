//! Bounded-parallel, dependency-driven stage dispatch.
//!
//! The scheduler owns the per-run state table. Stages move
//! `Waiting -> Ready -> Running` and end `Success`, `Failed` or `Skipped`.
//! A dependency is resolved once it succeeded, or failed while allowed to.
//! Ready stages are dispatched in definition order while a permit is free;
//! each runs as its own task and completions are collected as they arrive.

use super::graph::DependencyGraph;
use crate::cancellation::CancellationToken;
use crate::config::{EngineConfig, FailureMode};
use crate::core::{StageResult, StageStatus, WorkflowDefinition};
use crate::errors::WorkflowError;
use crate::executor::{executor_for, CommandRunner};
use crate::telemetry::GuardedSink;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{AbortHandle, JoinError};
use tracing::{debug, info, info_span, warn, Instrument};

type Completion = BoxFuture<'static, (usize, Result<StageResult, JoinError>)>;

/// Everything the scheduler observed during one run.
#[derive(Debug, Default)]
pub struct ScheduleOutcome {
    /// Stage results in the order stages reached a terminal state.
    pub results: Vec<StageResult>,
    /// Set when the workflow deadline fired.
    pub timeout: Option<WorkflowError>,
}

/// Drives one workflow run to completion.
#[derive(Debug)]
pub(crate) struct Scheduler<'a> {
    workflow: &'a WorkflowDefinition,
    graph: &'a DependencyGraph,
    config: &'a EngineConfig,
    runner: Arc<dyn CommandRunner>,
    telemetry: GuardedSink,
}

/// Mutable per-run state. Only the scheduler loop touches it.
struct RunState {
    statuses: Vec<StageStatus>,
    started_at: Vec<Option<DateTime<Utc>>>,
    results: Vec<StageResult>,
    halted: bool,
}

impl<'a> Scheduler<'a> {
    pub(crate) fn new(
        workflow: &'a WorkflowDefinition,
        graph: &'a DependencyGraph,
        config: &'a EngineConfig,
        runner: Arc<dyn CommandRunner>,
        telemetry: GuardedSink,
    ) -> Self {
        Self {
            workflow,
            graph,
            config,
            runner,
            telemetry,
        }
    }

    /// Runs every stage of a validated workflow.
    pub(crate) async fn run(&self) -> ScheduleOutcome {
        let count = self.workflow.stages.len();
        let mut state = RunState {
            statuses: vec![StageStatus::Waiting; count],
            started_at: vec![None; count],
            results: Vec::with_capacity(count),
            halted: false,
        };

        let limit = self
            .workflow
            .max_parallel_stages
            .min(count)
            .clamp(1, Semaphore::MAX_PERMITS);
        let permits = Arc::new(Semaphore::new(limit));
        let cancel = Arc::new(CancellationToken::new());
        let mut running: FuturesUnordered<Completion> = FuturesUnordered::new();
        let mut aborts: HashMap<usize, AbortHandle> = HashMap::new();

        let deadline = tokio::time::sleep(self.workflow.workflow_timeout);
        tokio::pin!(deadline);

        loop {
            self.promote_ready(&mut state);
            self.dispatch(&mut state, &permits, &cancel, &mut running, &mut aborts);

            if running.is_empty() {
                self.skip_unreachable(&mut state);
                break;
            }

            tokio::select! {
                biased;
                Some((index, joined)) = running.next() => {
                    aborts.remove(&index);
                    let result = self.finish(&state, index, joined);
                    self.record(&mut state, index, result);
                }
                () = &mut deadline => {
                    let err = WorkflowError::WorkflowTimeout {
                        timeout: self.workflow.workflow_timeout,
                    };
                    warn!(in_flight = running.len(), "{}", err);
                    cancel.cancel(err.to_string());
                    for handle in aborts.values() {
                        handle.abort();
                    }
                    self.fail_remaining(&mut state, &err.to_string());
                    return ScheduleOutcome {
                        results: state.results,
                        timeout: Some(err),
                    };
                }
            }
        }

        ScheduleOutcome {
            results: state.results,
            timeout: None,
        }
    }

    fn is_resolved(&self, state: &RunState, dep: usize) -> bool {
        match state.statuses[dep] {
            StageStatus::Success => true,
            StageStatus::Failed => self.workflow.stages[dep].allow_failure,
            _ => false,
        }
    }

    /// Moves every waiting stage whose dependencies are resolved to ready.
    fn promote_ready(&self, state: &mut RunState) {
        if state.halted {
            return;
        }
        for i in 0..state.statuses.len() {
            if state.statuses[i] != StageStatus::Waiting {
                continue;
            }
            let resolved = self
                .graph
                .dependency_indices(i)
                .iter()
                .all(|&d| self.is_resolved(state, d));
            if resolved {
                self.transition(state, i, StageStatus::Ready);
            }
        }
    }

    /// Starts ready stages in definition order while permits are free.
    fn dispatch(
        &self,
        state: &mut RunState,
        permits: &Arc<Semaphore>,
        cancel: &Arc<CancellationToken>,
        running: &mut FuturesUnordered<Completion>,
        aborts: &mut HashMap<usize, AbortHandle>,
    ) {
        for i in 0..state.statuses.len() {
            if state.statuses[i] != StageStatus::Ready {
                continue;
            }
            let Ok(permit) = permits.clone().try_acquire_owned() else {
                break;
            };

            let stage = self.workflow.stages[i].clone();
            let env = self.workflow.merged_environment(&stage);
            let executor = executor_for(&stage, self.config, self.runner.clone());
            let cancel = cancel.clone();
            let span = info_span!("stage", stage = %stage.name, backend = %executor.backend());

            self.transition(state, i, StageStatus::Running);
            state.started_at[i] = Some(Utc::now());

            let handle = tokio::spawn(
                async move {
                    let _permit = permit;
                    executor.execute(&stage, &env, &cancel).await
                }
                .instrument(span),
            );
            aborts.insert(i, handle.abort_handle());
            running.push(async move { (i, handle.await) }.boxed());
        }
    }

    /// Turns a joined task into a stage result; a panicked executor fails
    /// its stage.
    fn finish(
        &self,
        state: &RunState,
        index: usize,
        joined: Result<StageResult, JoinError>,
    ) -> StageResult {
        match joined {
            Ok(result) => result,
            Err(e) => {
                let stage = &self.workflow.stages[index];
                warn!(stage = %stage.name, error = %e, "Stage executor panicked");
                let err = WorkflowError::stage_execution(&stage.name, format!("executor panicked: {e}"));
                StageResult::failed(stage, err.to_string())
                    .with_times(state.started_at[index], Utc::now())
            }
        }
    }

    /// Records a completed stage and applies the failure policy.
    fn record(&self, state: &mut RunState, index: usize, result: StageResult) {
        let name = self.graph.name(index).to_string();
        match result.status {
            StageStatus::Success => info!(stage = %name, duration = ?result.duration, "Stage succeeded"),
            _ if result.allow_failure => {
                warn!(stage = %name, error = ?result.error, "Stage failed (failure allowed)");
            }
            _ => warn!(stage = %name, error = ?result.error, "Stage failed"),
        }

        let disqualifies = result.disqualifies_workflow();
        state.statuses[index] = result.status;
        self.telemetry.stage_event(&name, result.status);
        state.results.push(result);

        if !disqualifies {
            return;
        }

        let reason = format!("Skipped because dependency '{name}' failed");
        for d in self.graph.descendant_indices(index) {
            if state.statuses[d].is_pending() {
                self.skip(state, d, &reason);
            }
        }

        if self.config.failure_mode == FailureMode::FailFast && !state.halted {
            state.halted = true;
            info!(stage = %name, "Fail-fast: no further stages will start");
            let reason = format!("Skipped because stage '{name}' failed and the workflow is failing fast");
            for d in 0..state.statuses.len() {
                if state.statuses[d].is_pending() {
                    self.skip(state, d, &reason);
                }
            }
        }
    }

    /// Skips stages that can never start. Only reachable when a stage is
    /// left pending with nothing running.
    fn skip_unreachable(&self, state: &mut RunState) {
        for i in 0..state.statuses.len() {
            if state.statuses[i].is_pending() {
                self.skip(state, i, "Skipped because its dependencies never resolved");
            }
        }
    }

    /// Fails every stage that has not reached a terminal state.
    fn fail_remaining(&self, state: &mut RunState, message: &str) {
        let now = Utc::now();
        for i in 0..state.statuses.len() {
            if state.statuses[i].is_terminal() {
                continue;
            }
            let stage = &self.workflow.stages[i];
            let result = StageResult::failed(stage, message).with_times(state.started_at[i], now);
            state.statuses[i] = StageStatus::Failed;
            self.telemetry.stage_event(&stage.name, StageStatus::Failed);
            state.results.push(result);
        }
    }

    fn skip(&self, state: &mut RunState, index: usize, reason: &str) {
        let stage = &self.workflow.stages[index];
        debug!(stage = %stage.name, reason, "Stage skipped");
        state.statuses[index] = StageStatus::Skipped;
        self.telemetry.stage_event(&stage.name, StageStatus::Skipped);
        state.results.push(StageResult::skipped(stage, reason));
    }

    fn transition(&self, state: &mut RunState, index: usize, status: StageStatus) {
        debug!(stage = %self.graph.name(index), %status, "Stage transition");
        state.statuses[index] = status;
        self.telemetry.stage_event(self.graph.name(index), status);
    }
}
