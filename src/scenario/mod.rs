pub mod task;
pub mod wait_time;

pub use task::{upload_build_artifact, upload_test_artifact, ArtifactKind, UploadTask};
pub use wait_time::WaitTime;

use anyhow::{Context, Result};
use rand::Rng;
use rand_distr::weighted::WeightedIndex;
use rand_distr::Distribution;

/// What a simulated user does: a set of tasks to pick from and the pause
/// between them.
#[derive(Debug, Clone)]
pub struct Scenario {
    name: String,
    tasks: Vec<UploadTask>,
    wait_time: WaitTime,
    selector: WeightedIndex<u32>,
}

impl Scenario {
    pub fn new(name: impl Into<String>, tasks: Vec<UploadTask>, wait_time: WaitTime) -> Result<Self> {
        let name = name.into();
        if tasks.is_empty() {
            anyhow::bail!("Scenario '{}' has no tasks", name);
        }

        let selector = WeightedIndex::new(tasks.iter().map(|t| t.weight))
            .with_context(|| format!("Scenario '{}' has invalid task weights", name))?;

        Ok(Self {
            name,
            tasks,
            wait_time,
            selector,
        })
    }

    /// Build and test uploads with equal weight, pausing 1 to 5 seconds.
    pub fn upload_service() -> Result<Self> {
        Self::new(
            "upload_service",
            vec![
                UploadTask::new(ArtifactKind::Build),
                UploadTask::new(ArtifactKind::Test),
            ],
            WaitTime::default(),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tasks(&self) -> &[UploadTask] {
        &self.tasks
    }

    pub fn wait_time(&self) -> &WaitTime {
        &self.wait_time
    }

    pub fn pick_task<R: Rng + ?Sized>(&self, rng: &mut R) -> &UploadTask {
        &self.tasks[self.selector.sample(rng)]
    }
}
