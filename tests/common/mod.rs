//! In-process stand-in for the build service's `/upload` endpoint.
#![allow(dead_code)]

use axum::extract::{DefaultBodyLimit, Multipart, RawQuery, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub const SRC_ZIP: &[u8] = b"PK\x03\x04build-sources\x00\x01\x02\x03\xff\xfe";
pub const TEST_ZIP: &[u8] = b"PK\x03\x04test-project\x10\x20\x30\x00\x00\x7f";

/// One multipart upload as the server received it.
#[derive(Debug, Clone)]
pub struct RecordedUpload {
    pub query: Option<String>,
    pub field: String,
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
struct ServerState {
    uploads: Arc<Mutex<Vec<RecordedUpload>>>,
    status: StatusCode,
}

pub struct UploadServer {
    addr: SocketAddr,
    state: ServerState,
    handle: tokio::task::JoinHandle<()>,
}

impl UploadServer {
    pub async fn start() -> Self {
        Self::with_status(StatusCode::OK).await
    }

    /// A server answering every well-formed upload with `status`.
    pub async fn with_status(status: StatusCode) -> Self {
        let state = ServerState {
            uploads: Arc::default(),
            status,
        };
        let app = Router::new()
            .route("/upload", post(upload))
            .layer(DefaultBodyLimit::max(10 << 20))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    pub fn host(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.state.uploads.lock().unwrap().clone()
    }
}

impl Drop for UploadServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn upload(
    State(state): State<ServerState>,
    RawQuery(query): RawQuery,
    mut multipart: Multipart,
) -> (StatusCode, String) {
    let mut recorded = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let Ok(bytes) = field.bytes().await else {
            break;
        };
        if name == "file" {
            recorded = Some(RecordedUpload {
                query: query.clone(),
                field: name,
                file_name,
                bytes: bytes.to_vec(),
            });
        }
    }

    match recorded {
        Some(upload) => {
            let size = upload.bytes.len();
            state.uploads.lock().unwrap().push(upload);
            (state.status, format!("Build output:\nreceived {} bytes\n", size))
        }
        None => (StatusCode::BAD_REQUEST, "Error retrieving file".to_string()),
    }
}

/// Writes `src.zip` and `test.zip` into `dir`.
pub fn write_artifacts(dir: &Path) -> (PathBuf, PathBuf) {
    let src = dir.join("src.zip");
    let test = dir.join("test.zip");
    std::fs::write(&src, SRC_ZIP).unwrap();
    std::fs::write(&test, TEST_ZIP).unwrap();
    (src, test)
}

/// A host on a port nothing listens on.
pub async fn closed_host() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}
