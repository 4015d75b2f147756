//! Core data model for waveflow.
//!
//! - Stage configuration and its execution action
//! - Workflow definitions
//! - Stage and workflow status enums
//! - Stage and workflow results

mod result;
mod stage;
mod status;
mod workflow;

pub use result::{StageResult, WorkflowExecutionResult};
pub use stage::{ResourceLimits, Stage, StageAction, DEFAULT_STAGE_TIMEOUT};
pub use status::{StageStatus, WorkflowStatus};
pub use workflow::{WorkflowDefinition, DEFAULT_MAX_PARALLEL_STAGES, DEFAULT_WORKFLOW_TIMEOUT};
