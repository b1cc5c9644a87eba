use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use jobwatch_core::api::{parse_job_list, JOB_LIST_PATH};
use jobwatch_core::error::FetchError;
use jobwatch_core::model::Snapshot;
use jobwatch_core::now_ms;
use jobwatch_core::status::StatusMapper;
use reqwest::{Client, StatusCode};

/// Anything that can produce the current job list. The poll cycle only sees this.
#[async_trait]
pub trait JobSource: Send + Sync {
    /// One fetch attempt; never retries.
    async fn fetch_jobs(&self) -> Result<Snapshot, FetchError>;
}

/// Username + API token sent as HTTP basic auth.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub api_token: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("api_token", &"<redacted>")
            .finish()
    }
}

/// Reads the job list from a Jenkins server's JSON API.
#[derive(Debug, Clone)]
pub struct JenkinsClient {
    http: Client,
    base_url: String,
    credentials: Option<Credentials>,
    timeout: Duration,
    mapper: StatusMapper,
}

impl JenkinsClient {
    pub fn new(base_url: &str, credentials: Option<Credentials>, timeout: Duration, mapper: StatusMapper) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            timeout,
            mapper,
        }
    }

    pub fn job_list_url(&self) -> String {
        format!("{}{}", self.base_url, JOB_LIST_PATH)
    }

    /// Exactly one GET, bounded by the configured timeout.
    pub async fn fetch(&self) -> Result<Snapshot, FetchError> {
        let mut req = self.http.get(self.job_list_url()).timeout(self.timeout);
        if let Some(c) = &self.credentials {
            req = req.basic_auth(&c.username, Some(&c.api_token));
        }

        let resp = req.send().await.map_err(classify)?;
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(FetchError::Auth {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(FetchError::Protocol(format!("unexpected status {status}")));
        }

        let body = resp.bytes().await.map_err(classify)?;
        let snapshot = parse_job_list(&body, &self.mapper, now_ms())?;
        tracing::debug!(jobs = snapshot.len(), "fetched job list");
        Ok(snapshot)
    }
}

#[async_trait]
impl JobSource for JenkinsClient {
    async fn fetch_jobs(&self) -> Result<Snapshot, FetchError> {
        self.fetch().await
    }
}

fn classify(e: reqwest::Error) -> FetchError {
    if e.is_decode() {
        FetchError::Protocol(error_chain(&e))
    } else {
        FetchError::Network(error_chain(&e))
    }
}

// reqwest's Display hides the cause (refused, dns, tls), which is what an operator needs.
fn error_chain(e: &(dyn std::error::Error + 'static)) -> String {
    let mut out = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
