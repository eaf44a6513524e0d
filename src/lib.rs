//! Simulated users uploading build and test artifacts to an HTTP build
//! service, with the engine that schedules them and reports on the run.

pub mod commands;
pub mod config;
pub mod error;
pub mod observability;
pub mod performance;
pub mod report;
pub mod scenario;
pub mod session;
pub mod ui;
pub mod utils;

pub use error::{TaskError, TaskResult};
pub use scenario::{ArtifactKind, Scenario, UploadTask, WaitTime};
pub use session::{RequestOutcome, UserSession};
