use crate::error::{TaskError, TaskResult};
use anyhow::{Context, Result};
use reqwest::multipart::Form;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

/// Result of one request that reached the server.
#[derive(Debug, Clone)]
pub struct RequestOutcome {
    pub name: String,
    pub status: u16,
    pub duration: Duration,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

impl RequestOutcome {
    pub fn is_success(&self) -> bool {
        self.status < 400
    }
}

/// One simulated client with its own HTTP client handle.
#[derive(Debug, Clone)]
pub struct UserSession {
    user_id: u32,
    host: Url,
    client: Client,
}

impl UserSession {
    pub fn new(user_id: u32, host: &str, timeout: Duration) -> Result<Self> {
        let host = Url::parse(host).with_context(|| format!("Invalid host: {}", host))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            user_id,
            host,
            client,
        })
    }

    pub fn user_id(&self) -> u32 {
        self.user_id
    }

    pub fn host(&self) -> &Url {
        &self.host
    }

    /// Appends `path` to the host verbatim and adds the query pairs.
    pub fn url_for(&self, path: &str, query: &[(String, String)]) -> TaskResult<Url> {
        let base = self.host.as_str().trim_end_matches('/');
        let mut url = Url::parse(&format!("{}{}", base, path)).map_err(|source| {
            TaskError::InvalidUrl {
                path: path.to_string(),
                source,
            }
        })?;

        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }

        Ok(url)
    }

    pub async fn post_multipart(
        &self,
        name: &str,
        url: Url,
        form: Form,
        bytes_sent: u64,
    ) -> TaskResult<RequestOutcome> {
        debug!(user = self.user_id, %url, bytes_sent, "posting multipart upload");
        let start = Instant::now();

        let response = self.client.post(url).multipart(form).send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        let duration = start.elapsed();

        debug!(user = self.user_id, status, ?duration, "upload finished");

        Ok(RequestOutcome {
            name: name.to_string(),
            status,
            duration,
            bytes_sent,
            bytes_received: body.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(host: &str) -> UserSession {
        UserSession::new(1, host, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_url_for_plain_path() {
        let url = session("http://localhost:8080").url_for("/upload", &[]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/upload");
    }

    #[test]
    fn test_url_for_with_query() {
        let query = vec![("command".to_string(), "test".to_string())];
        let url = session("http://localhost:8080/").url_for("/upload", &query).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/upload?command=test");
    }

    #[test]
    fn test_url_for_keeps_host_prefix() {
        let url = session("http://localhost:8080/builder").url_for("/upload", &[]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/builder/upload");
    }

    #[test]
    fn test_invalid_host_rejected() {
        assert!(UserSession::new(0, "not a url", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_outcome_classification() {
        let mut outcome = RequestOutcome {
            name: "/upload".to_string(),
            status: 200,
            duration: Duration::from_millis(10),
            bytes_sent: 1,
            bytes_received: 1,
        };
        assert!(outcome.is_success());
        outcome.status = 500;
        assert!(!outcome.is_success());
    }
}
