//! Workflow fixtures for common graph shapes.

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::core::{Stage, WorkflowDefinition};
use crate::workflow::WorkflowEngine;

use super::ScriptedRunner;

/// A linear workflow where each stage depends on the previous one.
#[must_use]
pub fn chain(name: &str, stages: &[&str]) -> WorkflowDefinition {
    let mut workflow = WorkflowDefinition::new(name);
    let mut previous: Option<&str> = None;
    for &stage in stages {
        let mut next = Stage::command(stage, format!("echo {stage}"));
        if let Some(dep) = previous {
            next = next.depends_on(dep);
        }
        workflow = workflow.with_stage(next);
        previous = Some(stage);
    }
    workflow
}

/// The diamond `a -> {b, c} -> d`.
#[must_use]
pub fn diamond() -> WorkflowDefinition {
    WorkflowDefinition::new("diamond").with_stages([
        Stage::command("a", "echo a"),
        Stage::command("b", "echo b").depends_on("a"),
        Stage::command("c", "echo c").depends_on("a"),
        Stage::command("d", "echo d").with_dependencies(["b", "c"]),
    ])
}

/// `width` independent stages named `s0`, `s1`, ...
#[must_use]
pub fn fan_out(width: usize) -> WorkflowDefinition {
    WorkflowDefinition::new("fan-out")
        .with_stages((0..width).map(|i| Stage::command(format!("s{i}"), "true")))
}

/// An engine with default configuration running on `runner`.
#[must_use]
pub fn scripted_engine(runner: Arc<ScriptedRunner>) -> WorkflowEngine {
    WorkflowEngine::new(EngineConfig::default()).with_runner(runner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_links_stages() {
        let wf = chain("ci", &["build", "test", "deploy"]);
        assert_eq!(wf.stage_count(), 3);
        assert!(wf.stage("build").unwrap().depends_on.is_empty());
        assert_eq!(wf.stage("deploy").unwrap().depends_on, vec!["test".to_string()]);
    }

    #[test]
    fn test_fan_out_has_no_edges() {
        let wf = fan_out(4);
        assert_eq!(wf.stage_count(), 4);
        assert!(wf.stages.iter().all(|s| s.depends_on.is_empty()));
    }
}
