pub mod metrics;
pub mod monitor;
pub mod runner;
pub mod spawn;

pub use metrics::{PerformanceMetrics, PerformanceResults};
pub use runner::{run_single_user, PerformanceTestRunner};
pub use spawn::SpawnSchedule;
