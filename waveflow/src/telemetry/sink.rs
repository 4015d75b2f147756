//! Telemetry sink trait and implementations.

use crate::core::{StageStatus, WorkflowExecutionResult, WorkflowStatus};
use chrono::{DateTime, Utc};
use tracing::{debug, info, Level};

/// Receives workflow and stage lifecycle notifications.
///
/// Calls are made from the scheduler loop, so implementations should return
/// quickly and hand heavy work off elsewhere. Panics are caught and logged.
#[cfg_attr(test, mockall::automock)]
pub trait TelemetrySink: Send + Sync {
    /// Called once a validated workflow starts running.
    fn on_workflow_start(&self, workflow_id: &str, timestamp: DateTime<Utc>);

    /// Called with the final result when a workflow run ends.
    fn on_workflow_end(&self, workflow_id: &str, result: &WorkflowExecutionResult);

    /// Called on every stage status transition.
    fn on_stage_event(&self, stage_name: &str, status: StageStatus, timestamp: DateTime<Utc>);
}

/// A sink that discards everything. Used when no sink is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpTelemetrySink;

impl TelemetrySink for NoOpTelemetrySink {
    fn on_workflow_start(&self, _workflow_id: &str, _timestamp: DateTime<Utc>) {}

    fn on_workflow_end(&self, _workflow_id: &str, _result: &WorkflowExecutionResult) {}

    fn on_stage_event(&self, _stage_name: &str, _status: StageStatus, _timestamp: DateTime<Utc>) {}
}

/// A sink that writes events through `tracing`.
#[derive(Debug, Clone)]
pub struct LoggingTelemetrySink {
    level: Level,
}

impl Default for LoggingTelemetrySink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingTelemetrySink {
    /// Creates a logging sink at the given level. Anything other than
    /// `DEBUG` logs at `INFO`.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    fn log(&self, event: &TelemetryEvent) {
        if self.level == Level::DEBUG {
            debug!(event = ?event, "Telemetry: {}", event.kind());
        } else {
            info!(event = ?event, "Telemetry: {}", event.kind());
        }
    }
}

impl TelemetrySink for LoggingTelemetrySink {
    fn on_workflow_start(&self, workflow_id: &str, timestamp: DateTime<Utc>) {
        self.log(&TelemetryEvent::WorkflowStarted {
            workflow_id: workflow_id.to_string(),
            timestamp,
        });
    }

    fn on_workflow_end(&self, workflow_id: &str, result: &WorkflowExecutionResult) {
        self.log(&TelemetryEvent::WorkflowEnded {
            workflow_id: workflow_id.to_string(),
            status: result.status,
        });
    }

    fn on_stage_event(&self, stage_name: &str, status: StageStatus, timestamp: DateTime<Utc>) {
        self.log(&TelemetryEvent::Stage {
            stage_name: stage_name.to_string(),
            status,
            timestamp,
        });
    }
}

/// One recorded telemetry notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelemetryEvent {
    /// A workflow started.
    WorkflowStarted {
        /// The workflow id.
        workflow_id: String,
        /// When it started.
        timestamp: DateTime<Utc>,
    },
    /// A workflow finished.
    WorkflowEnded {
        /// The workflow id.
        workflow_id: String,
        /// Its final status.
        status: WorkflowStatus,
    },
    /// A stage changed status.
    Stage {
        /// The stage name.
        stage_name: String,
        /// The new status.
        status: StageStatus,
        /// When the transition happened.
        timestamp: DateTime<Utc>,
    },
}

impl TelemetryEvent {
    /// Returns a dotted event name such as `stage.running`.
    #[must_use]
    pub fn kind(&self) -> String {
        match self {
            Self::WorkflowStarted { .. } => "workflow.started".to_string(),
            Self::WorkflowEnded { .. } => "workflow.ended".to_string(),
            Self::Stage { status, .. } => {
                format!("stage.{}", status.to_string().to_lowercase())
            }
        }
    }
}

/// A sink that keeps every event in memory, for tests and diagnostics.
#[derive(Debug, Default)]
pub struct CollectingTelemetrySink {
    events: parking_lot::RwLock<Vec<TelemetryEvent>>,
}

impl CollectingTelemetrySink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events.read().clone()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if nothing has been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Returns only the stage events.
    #[must_use]
    pub fn stage_events(&self) -> Vec<TelemetryEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| matches!(e, TelemetryEvent::Stage { .. }))
            .cloned()
            .collect()
    }

    /// Returns the status transitions recorded for one stage, in order.
    #[must_use]
    pub fn transitions(&self, stage: &str) -> Vec<StageStatus> {
        self.events
            .read()
            .iter()
            .filter_map(|e| match e {
                TelemetryEvent::Stage {
                    stage_name, status, ..
                } if stage_name == stage => Some(*status),
                _ => None,
            })
            .collect()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    fn push(&self, event: TelemetryEvent) {
        self.events.write().push(event);
    }
}

impl TelemetrySink for CollectingTelemetrySink {
    fn on_workflow_start(&self, workflow_id: &str, timestamp: DateTime<Utc>) {
        self.push(TelemetryEvent::WorkflowStarted {
            workflow_id: workflow_id.to_string(),
            timestamp,
        });
    }

    fn on_workflow_end(&self, workflow_id: &str, result: &WorkflowExecutionResult) {
        self.push(TelemetryEvent::WorkflowEnded {
            workflow_id: workflow_id.to_string(),
            status: result.status,
        });
    }

    fn on_stage_event(&self, stage_name: &str, status: StageStatus, timestamp: DateTime<Utc>) {
        self.push(TelemetryEvent::Stage {
            stage_name: stage_name.to_string(),
            status,
            timestamp,
        });
    }
}
