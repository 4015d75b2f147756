//! Stage configuration.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

/// Default per-stage timeout.
pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(600);

fn default_stage_type() -> String {
    "custom".to_string()
}

fn default_stage_timeout() -> Duration {
    DEFAULT_STAGE_TIMEOUT
}

/// What a stage runs.
///
/// In serialized form the action is flattened into the stage. A
/// `container_image` key selects [`StageAction::Container`]; the text may be
/// given as either `script` or `command` for both variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StageAction {
    /// Run a script inside a container image.
    Container {
        /// Image reference, e.g. `rust:1.80`.
        container_image: String,
        /// Script executed with `sh -c` inside the container.
        script: String,
    },
    /// Run a command directly with the configured shell.
    Direct {
        /// Command line passed to the shell.
        command: String,
    },
}

#[derive(Deserialize)]
struct RawStageAction {
    #[serde(default)]
    container_image: Option<String>,
    #[serde(default)]
    script: Option<String>,
    #[serde(default)]
    command: Option<String>,
}

impl TryFrom<RawStageAction> for StageAction {
    type Error = String;

    fn try_from(raw: RawStageAction) -> Result<Self, Self::Error> {
        let script = match (raw.script, raw.command) {
            (Some(script), None) | (None, Some(script)) => script,
            (Some(_), Some(_)) => {
                return Err("stage sets both `script` and `command`".to_string());
            }
            (None, None) => return Err("stage needs a `script` or `command`".to_string()),
        };
        Ok(match raw.container_image {
            Some(container_image) => Self::Container {
                container_image,
                script,
            },
            None => Self::Direct { command: script },
        })
    }
}

impl<'de> Deserialize<'de> for StageAction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawStageAction::deserialize(deserializer)?;
        Self::try_from(raw).map_err(serde::de::Error::custom)
    }
}

fn dedup_dependencies<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let deps = Vec::<String>::deserialize(deserializer)?;
    let mut seen = HashSet::with_capacity(deps.len());
    Ok(deps.into_iter().filter(|dep| seen.insert(dep.clone())).collect())
}

impl StageAction {
    /// Returns the container image, if this is a containerized action.
    #[must_use]
    pub fn container_image(&self) -> Option<&str> {
        match self {
            Self::Container { container_image, .. } => Some(container_image),
            Self::Direct { .. } => None,
        }
    }

    /// Returns the command or script text.
    #[must_use]
    pub fn script(&self) -> &str {
        match self {
            Self::Container { script, .. } => script,
            Self::Direct { command } => command,
        }
    }
}

/// Resource limits handed to the executor. The scheduler never enforces them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// CPU share, e.g. `1.5`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpus: Option<f64>,
    /// Memory limit in the container runtime's notation, e.g. `512m`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
}

impl ResourceLimits {
    /// Returns true if no limit is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cpus.is_none() && self.memory.is_none()
    }
}

/// A single named unit of work in a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    /// Unique name within the workflow.
    pub name: String,
    /// Informational tag such as `build`, `test` or `deploy`.
    #[serde(default = "default_stage_type")]
    pub stage_type: String,
    /// What the stage runs.
    #[serde(flatten)]
    pub action: StageAction,
    /// Names of stages that must resolve before this one may start.
    #[serde(default, deserialize_with = "dedup_dependencies")]
    pub depends_on: Vec<String>,
    /// Whether a failure of this stage leaves the workflow status untouched.
    #[serde(default)]
    pub allow_failure: bool,
    /// Maximum run time for one execution of this stage.
    #[serde(
        rename = "timeout_secs",
        default = "default_stage_timeout",
        with = "crate::utils::durations"
    )]
    pub timeout: Duration,
    /// Stage-local environment; wins over the workflow's global environment.
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    /// Opaque isolation policy passed through to the executor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isolation_policy: Option<String>,
    /// Resource limits passed through to the executor.
    #[serde(default, skip_serializing_if = "ResourceLimits::is_empty")]
    pub resources: ResourceLimits,
}

impl Stage {
    /// Creates a stage with the given action and default settings.
    #[must_use]
    pub fn new(name: impl Into<String>, action: StageAction) -> Self {
        Self {
            name: name.into(),
            stage_type: default_stage_type(),
            action,
            depends_on: Vec::new(),
            allow_failure: false,
            timeout: DEFAULT_STAGE_TIMEOUT,
            environment: BTreeMap::new(),
            isolation_policy: None,
            resources: ResourceLimits::default(),
        }
    }

    /// Creates a stage that runs `command` directly.
    #[must_use]
    pub fn command(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self::new(
            name,
            StageAction::Direct {
                command: command.into(),
            },
        )
    }

    /// Creates a stage that runs `script` inside `image`.
    #[must_use]
    pub fn container(
        name: impl Into<String>,
        image: impl Into<String>,
        script: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            StageAction::Container {
                container_image: image.into(),
                script: script.into(),
            },
        )
    }

    /// Sets the stage type tag.
    #[must_use]
    pub fn with_stage_type(mut self, stage_type: impl Into<String>) -> Self {
        self.stage_type = stage_type.into();
        self
    }

    /// Adds a dependency. Repeated names are ignored.
    #[must_use]
    pub fn depends_on(mut self, dep: impl Into<String>) -> Self {
        let dep = dep.into();
        if !self.depends_on.contains(&dep) {
            self.depends_on.push(dep);
        }
        self
    }

    /// Adds several dependencies, preserving their order.
    #[must_use]
    pub fn with_dependencies(self, deps: impl IntoIterator<Item = impl Into<String>>) -> Self {
        deps.into_iter().fold(self, |stage, dep| stage.depends_on(dep))
    }

    /// Lets the stage fail without failing the workflow.
    #[must_use]
    pub fn allow_failure(mut self) -> Self {
        self.allow_failure = true;
        self
    }

    /// Sets the per-stage timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Adds an environment variable.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    /// Sets the isolation policy.
    #[must_use]
    pub fn with_isolation_policy(mut self, policy: impl Into<String>) -> Self {
        self.isolation_policy = Some(policy.into());
        self
    }

    /// Sets resource limits.
    #[must_use]
    pub fn with_resources(mut self, resources: ResourceLimits) -> Self {
        self.resources = resources;
        self
    }

    /// Returns true if this stage runs in a container.
    #[must_use]
    pub fn is_containerized(&self) -> bool {
        self.action.container_image().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_stage_defaults() {
        let stage = Stage::command("build", "cargo build");
        assert_eq!(stage.stage_type, "custom");
        assert!(!stage.allow_failure);
        assert_eq!(stage.timeout, DEFAULT_STAGE_TIMEOUT);
        assert!(!stage.is_containerized());
    }

    #[test]
    fn test_depends_on_is_ordered_set() {
        let stage = Stage::command("deploy", "true")
            .depends_on("build")
            .depends_on("test")
            .depends_on("build");

        assert_eq!(stage.depends_on, vec!["build".to_string(), "test".to_string()]);
    }

    #[test]
    fn test_container_stage_from_json() {
        let json = r#"{
            "name": "unit",
            "stage_type": "test",
            "container_image": "rust:1.80",
            "script": "cargo test",
            "depends_on": ["build"],
            "timeout_secs": 30
        }"#;

        let stage: Stage = serde_json::from_str(json).unwrap();
        assert!(stage.is_containerized());
        assert_eq!(stage.action.container_image(), Some("rust:1.80"));
        assert_eq!(stage.action.script(), "cargo test");
        assert_eq!(stage.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_direct_stage_accepts_script_key() {
        let json = r#"{"name": "lint", "script": "cargo clippy"}"#;

        let stage: Stage = serde_json::from_str(json).unwrap();
        assert!(!stage.is_containerized());
        assert_eq!(stage.action.script(), "cargo clippy");
        assert!(stage.depends_on.is_empty());
    }

    #[test]
    fn test_container_image_with_command_key_stays_containerized() {
        let json = r#"{"name": "scan", "container_image": "alpine:3", "command": "trivy fs ."}"#;

        let stage: Stage = serde_json::from_str(json).unwrap();
        assert!(stage.is_containerized());
        assert_eq!(stage.action.container_image(), Some("alpine:3"));
        assert_eq!(stage.action.script(), "trivy fs .");
    }

    #[test]
    fn test_action_text_is_required_once() {
        let missing = r#"{"name": "scan", "container_image": "alpine:3"}"#;
        assert!(serde_json::from_str::<Stage>(missing).is_err());

        let both = r#"{"name": "lint", "script": "a", "command": "b"}"#;
        assert!(serde_json::from_str::<Stage>(both).is_err());
    }

    #[test]
    fn test_deserialized_dependencies_are_collapsed() {
        let json = r#"{"name": "deploy", "command": "true", "depends_on": ["build", "test", "build"]}"#;

        let stage: Stage = serde_json::from_str(json).unwrap();
        assert_eq!(stage.depends_on, vec!["build".to_string(), "test".to_string()]);
    }

    #[test]
    fn test_serialized_stage_reads_back() {
        let stage = Stage::container("unit", "rust:1.80", "cargo test").depends_on("build");

        let json = serde_json::to_string(&stage).unwrap();
        let back: Stage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, stage);
    }
}
