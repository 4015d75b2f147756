//! Workflow validation, scheduling and execution.
//!
//! This module provides:
//! - Structural validation of definitions
//! - The dependency graph and cycle detection
//! - The bounded-parallel scheduler
//! - Result aggregation
//! - The [`WorkflowEngine`] entry point

mod aggregator;
mod builder;
mod engine;
mod graph;
mod scheduler;
mod validator;

pub use aggregator::{aggregate, rejected};
pub use builder::WorkflowBuilder;
pub use engine::WorkflowEngine;
pub use graph::{build_dependency_map, find_cycle, has_cycle, DependencyGraph};
pub use scheduler::ScheduleOutcome;
pub use validator::{validate, ValidationReport};
