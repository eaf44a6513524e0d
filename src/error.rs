use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while executing a single task for a simulated user.
///
/// None of these are handled by the task itself. They propagate to the engine,
/// which records them against the user's iteration and moves on.
#[derive(Debug, Error)]
pub enum TaskError {
    /// The artifact to upload does not exist at its configured path.
    #[error("artifact not found: {}", path.display())]
    ArtifactNotFound { path: PathBuf },

    /// The artifact exists but could not be opened or read.
    #[error("failed to read artifact {}: {source}", path.display())]
    ArtifactRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The request URL could not be built from the host and task path.
    #[error("invalid url for '{path}': {source}")]
    InvalidUrl {
        path: String,
        #[source]
        source: url::ParseError,
    },

    /// Connection refused, timeout, or any other transport-level failure.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl TaskError {
    pub(crate) fn from_io(path: PathBuf, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            TaskError::ArtifactNotFound { path }
        } else {
            TaskError::ArtifactRead { path, source }
        }
    }

    /// Whether the error happened before anything was sent over the network.
    pub fn is_local(&self) -> bool {
        !matches!(self, TaskError::Transport(_))
    }
}

pub type TaskResult<T> = std::result::Result<T, TaskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_artifact_not_found() {
        let err = TaskError::from_io(
            PathBuf::from("./src.zip"),
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, TaskError::ArtifactNotFound { .. }));
        assert!(err.is_local());
        assert_eq!(err.to_string(), "artifact not found: ./src.zip");
    }

    #[test]
    fn test_other_io_errors_map_to_artifact_read() {
        let err = TaskError::from_io(
            PathBuf::from("./test.zip"),
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, TaskError::ArtifactRead { .. }));
        assert!(err.to_string().contains("denied"));
    }
}
