//! The built-in tasks read `./src.zip` and `./test.zip` from the working
//! directory. This binary holds a single test because it changes the
//! process-wide current directory.

mod common;

use anyhow::Result;
use common::{write_artifacts, UploadServer, SRC_ZIP, TEST_ZIP};
use std::env;
use std::time::Duration;
use tempfile::TempDir;
use zipswarm::performance::run_single_user;
use zipswarm::scenario::{upload_build_artifact, upload_test_artifact};
use zipswarm::{Scenario, TaskError, UserSession};

#[tokio::test]
async fn test_default_artifacts_resolve_against_working_directory() -> Result<()> {
    let server = UploadServer::start().await;
    let dir = TempDir::new()?;
    let original = env::current_dir()?;

    env::set_current_dir(dir.path())?;
    let outcome = upload_default_artifacts(&server, &dir).await;
    env::set_current_dir(original)?;

    outcome
}

async fn upload_default_artifacts(server: &UploadServer, dir: &TempDir) -> Result<()> {
    let session = UserSession::new(0, &server.host(), Duration::from_secs(10))?;

    // Nothing in the working directory yet.
    let err = upload_build_artifact(&session).await.unwrap_err();
    assert!(matches!(err, TaskError::ArtifactNotFound { .. }), "got {:?}", err);
    let err = upload_test_artifact(&session).await.unwrap_err();
    assert!(matches!(err, TaskError::ArtifactNotFound { .. }), "got {:?}", err);
    assert!(server.uploads().is_empty());

    write_artifacts(dir.path());

    let build = upload_build_artifact(&session).await?;
    assert_eq!(build.status, 200);
    assert_eq!(build.name, "/upload");

    let test = upload_test_artifact(&session).await?;
    assert_eq!(test.status, 200);
    assert_eq!(test.name, "/upload?command=test");

    let uploads = server.uploads();
    assert_eq!(uploads.len(), 2);
    assert_eq!(uploads[0].query, None);
    assert_eq!(uploads[0].field, "file");
    assert_eq!(uploads[0].file_name.as_deref(), Some("src.zip"));
    assert_eq!(uploads[0].bytes, SRC_ZIP);
    assert_eq!(uploads[1].query.as_deref(), Some("command=test"));
    assert_eq!(uploads[1].field, "file");
    assert_eq!(uploads[1].file_name.as_deref(), Some("test.zip"));
    assert_eq!(uploads[1].bytes, TEST_ZIP);

    // The built-in scenario picks up the same relative paths.
    let scenario = Scenario::upload_service()?;
    let results = run_single_user(&scenario, &server.host(), Some(1), Duration::from_secs(10)).await?;
    assert_eq!(results.total_requests, 1);
    assert_eq!(results.failed_requests, 0);
    assert_eq!(results.total_task_errors, 0);
    assert_eq!(server.uploads().len(), 3);

    Ok(())
}
