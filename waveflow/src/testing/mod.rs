//! Testing utilities for waveflow workflows.
//!
//! This module provides:
//! - A scripted fake command runner
//! - Workflow fixtures for common graph shapes
//! - Assertions over execution results

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{
    assert_ran_before, assert_stage_error_contains, assert_stage_status,
    assert_workflow_failed, assert_workflow_succeeded,
};
pub use fixtures::{chain, diamond, fan_out, scripted_engine};
pub use mocks::{ScriptedRunner, StageScript};
