//! # Waveflow
//!
//! A DAG workflow execution engine.
//!
//! Waveflow takes a declarative set of named, interdependent stages and:
//!
//! - **Validates** the definition up front: names, dependencies, cycles
//! - **Schedules** stages wave by wave under a bounded-parallelism limit
//! - **Executes** each stage as a shell command or inside a container image
//! - **Aggregates** per-stage outcomes into a single workflow result
//! - **Reports** lifecycle transitions to an optional telemetry sink
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use waveflow::prelude::*;
//!
//! # async fn run() -> Result<(), WorkflowError> {
//! let workflow = WorkflowBuilder::new("release")
//!     .command("build", "cargo build --release", &[])
//!     .command("test", "cargo test", &["build"])
//!     .stage(Stage::container("scan", "scanner:1", "scan .").allow_failure().depends_on("build"))
//!     .max_parallel_stages(2)
//!     .build()?;
//!
//! let engine = WorkflowEngine::new(EngineConfig::default());
//! let result = engine.execute_workflow(&workflow).await;
//! println!("{} in {:?}", result.status, result.duration);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod config;
pub mod core;
pub mod errors;
pub mod executor;
pub mod observability;
pub mod telemetry;
pub mod testing;
pub mod utils;
pub mod workflow;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::config::{EngineConfig, FailureMode};
    pub use crate::core::{
        ResourceLimits, Stage, StageAction, StageResult, StageStatus, WorkflowDefinition,
        WorkflowExecutionResult, WorkflowStatus,
    };
    pub use crate::errors::{CycleDetectedError, ValidationError, ValidationIssue, WorkflowError};
    pub use crate::executor::{
        executor_for, CommandOutput, CommandRunner, CommandSpec, ContainerExecutor,
        DirectExecutor, ExecutorBackend, ProcessRunner, StageExecutor,
    };
    pub use crate::observability::{init_tracing, LogFormat};
    pub use crate::telemetry::{
        CollectingTelemetrySink, LoggingTelemetrySink, NoOpTelemetrySink, TelemetryEvent,
        TelemetrySink,
    };
    pub use crate::workflow::{
        validate, DependencyGraph, ValidationReport, WorkflowBuilder, WorkflowEngine,
    };
}
