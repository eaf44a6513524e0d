use crate::scenario::{ArtifactKind, Scenario, UploadTask, WaitTime};
use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// YAML description of a scenario, overriding the built-in upload scenario.
///
/// ```yaml
/// name: nightly-builds
/// wait_time:
///   between: { min: 1, max: 5 }
/// tasks:
///   - kind: build
///     artifact: ./artifacts/src.zip
///     weight: 3
///   - kind: test
/// ```
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ScenarioConfig {
    pub name: Option<String>,
    /// Written as a single-key map (`between: { min, max }`), not a YAML tag.
    #[serde(default, with = "serde_yaml::with::singleton_map")]
    pub wait_time: Option<WaitTimeConfig>,
    pub tasks: Vec<TaskConfig>,
}

/// Think-time in seconds.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum WaitTimeConfig {
    Between { min: f64, max: f64 },
    Constant(f64),
    ConstantPacing(f64),
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct TaskConfig {
    pub name: Option<String>,
    pub kind: Option<ArtifactKind>,
    pub path: Option<String>,
    pub query: Option<IndexMap<String, String>>,
    pub field: Option<String>,
    pub artifact: Option<PathBuf>,
    pub weight: Option<u32>,
}

impl WaitTimeConfig {
    pub fn into_wait_time(self) -> Result<WaitTime> {
        match self {
            WaitTimeConfig::Between { min, max } => {
                WaitTime::between(seconds(min)?, seconds(max)?)
            }
            WaitTimeConfig::Constant(pause) => Ok(WaitTime::constant(seconds(pause)?)),
            WaitTimeConfig::ConstantPacing(period) => {
                Ok(WaitTime::constant_pacing(seconds(period)?))
            }
        }
    }
}

fn seconds(value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value)
        .with_context(|| format!("Invalid wait time: {} seconds", value))
}

impl TaskConfig {
    pub fn into_task(self, index: usize) -> Result<UploadTask> {
        let mut task = match (self.kind, &self.path, &self.artifact) {
            (Some(kind), _, _) => UploadTask::new(kind),
            (None, Some(path), Some(artifact)) => UploadTask::custom(
                self.name.clone().unwrap_or_else(|| format!("task_{}", index)),
                path.clone(),
                artifact.clone(),
            ),
            _ => anyhow::bail!(
                "Task #{} needs either a 'kind' or both 'path' and 'artifact'",
                index + 1
            ),
        };

        if let Some(name) = self.name {
            task.name = name;
        }
        if let Some(path) = self.path {
            task.path = path;
        }
        if let Some(query) = self.query {
            task.query = query.into_iter().collect();
        }
        if let Some(field) = self.field {
            task.field = field;
        }
        if let Some(artifact) = self.artifact {
            task.artifact = artifact;
        }
        if let Some(weight) = self.weight {
            task.weight = weight;
        }

        Ok(task)
    }
}

impl ScenarioConfig {
    pub fn into_scenario(self) -> Result<Scenario> {
        let name = self.name.unwrap_or_else(|| "custom".to_string());
        let wait_time = match self.wait_time {
            Some(config) => config.into_wait_time()?,
            None => WaitTime::default(),
        };
        let tasks = self
            .tasks
            .into_iter()
            .enumerate()
            .map(|(index, task)| task.into_task(index))
            .collect::<Result<Vec<_>>>()?;

        Scenario::new(name, tasks, wait_time)
    }
}

pub async fn load_scenario(path: &Path) -> Result<Scenario> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read scenario file: {}", path.display()))?;

    let config: ScenarioConfig = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse YAML in file: {}", path.display()))?;

    config
        .into_scenario()
        .with_context(|| format!("Invalid scenario in file: {}", path.display()))
}

/// The scenario from `path`, or the built-in upload scenario.
pub async fn resolve_scenario(path: Option<&Path>) -> Result<Scenario> {
    match path {
        Some(path) => load_scenario(path).await,
        None => Scenario::upload_service(),
    }
}
