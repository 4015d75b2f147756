//! The workflow engine: validation, scheduling and aggregation behind one
//! call.

use super::aggregator::{aggregate, rejected};
use super::graph::DependencyGraph;
use super::scheduler::Scheduler;
use super::validator::{validate, ValidationReport};
use crate::config::EngineConfig;
use crate::core::{WorkflowDefinition, WorkflowExecutionResult};
use crate::executor::{CommandRunner, ProcessRunner};
use crate::telemetry::{GuardedSink, NoOpTelemetrySink, TelemetrySink};
use crate::utils::generate_execution_id;
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};

/// Runs workflow definitions.
///
/// An engine holds no per-run state and can execute any number of
/// workflows, concurrently or one after another.
#[derive(Debug, Clone)]
pub struct WorkflowEngine {
    config: EngineConfig,
    runner: Arc<dyn CommandRunner>,
    telemetry: GuardedSink,
}

impl Default for WorkflowEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl WorkflowEngine {
    /// Creates an engine that spawns local processes and reports no
    /// telemetry.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            runner: Arc::new(ProcessRunner::new()),
            telemetry: GuardedSink::new(Arc::new(NoOpTelemetrySink)),
        }
    }

    /// Sets the telemetry sink.
    #[must_use]
    pub fn with_telemetry(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = GuardedSink::new(sink);
        self
    }

    /// Sets the command runner both backends run through.
    #[must_use]
    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Returns the engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validates a definition without running it.
    #[must_use]
    pub fn validate(&self, workflow: &WorkflowDefinition) -> ValidationReport {
        validate(workflow)
    }

    /// Validates and executes a workflow.
    ///
    /// This never fails: invalid definitions come back as a failed result
    /// with `validation_errors` set and no stage executed, and stage-level
    /// problems are recorded on the stage results.
    pub async fn execute_workflow(&self, workflow: &WorkflowDefinition) -> WorkflowExecutionResult {
        let execution_id = generate_execution_id();
        let span = info_span!(
            "workflow",
            workflow_id = %workflow.id,
            workflow = %workflow.name,
            execution_id = %execution_id,
        );
        self.run(workflow, execution_id).instrument(span).await
    }

    async fn run(&self, workflow: &WorkflowDefinition, execution_id: String) -> WorkflowExecutionResult {
        let started = WorkflowExecutionResult::started(&workflow.id, &workflow.name, execution_id);

        let report = validate(workflow);
        if !report.is_valid() {
            warn!(errors = ?report.errors, "Workflow rejected by validation");
            return rejected(started, &report);
        }

        info!(
            stages = workflow.stages.len(),
            max_parallel = workflow.max_parallel_stages,
            "Workflow started"
        );
        self.telemetry.workflow_start(&workflow.id, started.start_time);

        let graph = DependencyGraph::build(&workflow.stages);
        let outcome = Scheduler::new(
            workflow,
            &graph,
            &self.config,
            self.runner.clone(),
            self.telemetry.clone(),
        )
        .run()
        .await;
        let result = aggregate(workflow, started, outcome);

        info!(
            status = %result.status,
            successful = result.successful_stages,
            failed = result.failed_stages,
            skipped = result.skipped_stages,
            duration = ?result.duration,
            "Workflow finished"
        );
        self.telemetry.workflow_end(&workflow.id, &result);
        result
    }
}
