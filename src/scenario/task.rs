use crate::error::{TaskError, TaskResult};
use crate::session::{RequestOutcome, UserSession};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

pub const UPLOAD_PATH: &str = "/upload";
pub const UPLOAD_FIELD: &str = "file";

/// Which artifact an upload task sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// `./src.zip` to `/upload`
    Build,
    /// `./test.zip` to `/upload?command=test`
    Test,
}

impl ArtifactKind {
    pub fn task_name(self) -> &'static str {
        match self {
            ArtifactKind::Build => "upload_build",
            ArtifactKind::Test => "upload_test",
        }
    }

    pub fn default_artifact(self) -> &'static str {
        match self {
            ArtifactKind::Build => "./src.zip",
            ArtifactKind::Test => "./test.zip",
        }
    }

    pub fn query(self) -> Vec<(String, String)> {
        match self {
            ArtifactKind::Build => Vec::new(),
            ArtifactKind::Test => vec![("command".to_string(), "test".to_string())],
        }
    }
}

/// An upload of one local file as a multipart form field.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadTask {
    pub name: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub field: String,
    pub artifact: PathBuf,
    pub weight: u32,
}

impl UploadTask {
    pub fn new(kind: ArtifactKind) -> Self {
        Self {
            name: kind.task_name().to_string(),
            path: UPLOAD_PATH.to_string(),
            query: kind.query(),
            field: UPLOAD_FIELD.to_string(),
            artifact: PathBuf::from(kind.default_artifact()),
            weight: 1,
        }
    }

    pub fn custom(name: impl Into<String>, path: impl Into<String>, artifact: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            query: Vec::new(),
            field: UPLOAD_FIELD.to_string(),
            artifact: artifact.into(),
            weight: 1,
        }
    }

    pub fn with_artifact(mut self, artifact: impl Into<PathBuf>) -> Self {
        self.artifact = artifact.into();
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    /// Name under which requests of this task are aggregated, e.g.
    /// `/upload?command=test`.
    pub fn request_name(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query = self
            .query
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", self.path, query)
    }

    /// Reads the artifact and posts it to the session's host.
    ///
    /// The artifact is read before anything is sent, so a missing file fails
    /// the task without touching the network.
    pub async fn execute(&self, session: &UserSession) -> TaskResult<RequestOutcome> {
        let url = session.url_for(&self.path, &self.query)?;
        let contents = read_artifact(&self.artifact).await?;
        let bytes_sent = contents.len() as u64;

        let mut part = Part::bytes(contents);
        if let Some(file_name) = self.artifact.file_name().and_then(|n| n.to_str()) {
            part = part.file_name(file_name.to_string());
        }
        let form = Form::new().part(self.field.clone(), part);

        session
            .post_multipart(&self.request_name(), url, form, bytes_sent)
            .await
    }
}

/// The file handle lives only inside this function and is closed on every path.
async fn read_artifact(path: &Path) -> TaskResult<Vec<u8>> {
    let mut file = File::open(path)
        .await
        .map_err(|e| TaskError::from_io(path.to_path_buf(), e))?;

    let mut contents = Vec::new();
    file.read_to_end(&mut contents)
        .await
        .map_err(|e| TaskError::from_io(path.to_path_buf(), e))?;

    Ok(contents)
}

/// Uploads `./src.zip` to `/upload`.
pub async fn upload_build_artifact(session: &UserSession) -> TaskResult<RequestOutcome> {
    UploadTask::new(ArtifactKind::Build).execute(session).await
}

/// Uploads `./test.zip` to `/upload?command=test`.
pub async fn upload_test_artifact(session: &UserSession) -> TaskResult<RequestOutcome> {
    UploadTask::new(ArtifactKind::Test).execute(session).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_build_task_defaults() {
        let task = UploadTask::new(ArtifactKind::Build);
        assert_eq!(task.name, "upload_build");
        assert_eq!(task.path, "/upload");
        assert!(task.query.is_empty());
        assert_eq!(task.field, "file");
        assert_eq!(task.artifact, PathBuf::from("./src.zip"));
        assert_eq!(task.request_name(), "/upload");
    }

    #[test]
    fn test_test_task_defaults() {
        let task = UploadTask::new(ArtifactKind::Test);
        assert_eq!(task.name, "upload_test");
        assert_eq!(task.artifact, PathBuf::from("./test.zip"));
        assert_eq!(
            task.query,
            vec![("command".to_string(), "test".to_string())]
        );
        assert_eq!(task.request_name(), "/upload?command=test");
    }

    #[tokio::test]
    async fn test_read_artifact_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = read_artifact(&dir.path().join("src.zip")).await.unwrap_err();
        assert!(matches!(err, TaskError::ArtifactNotFound { .. }));
    }

    #[tokio::test]
    async fn test_missing_artifact_fails_before_sending() {
        let dir = TempDir::new().unwrap();
        // Nothing listens on port 9; a request attempt would surface as a transport error.
        let session =
            UserSession::new(0, "http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        let task = UploadTask::new(ArtifactKind::Build).with_artifact(dir.path().join("src.zip"));

        let err = task.execute(&session).await.unwrap_err();
        assert!(err.is_local());
    }
}
