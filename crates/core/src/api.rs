//! Wire types for the Jenkins JSON API and outbound webhook payloads.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::FetchError;
use crate::model::{Job, Severity, Snapshot};
use crate::status::StatusMapper;

/// Job-list endpoint relative to the server base URL. The `tree` filter keeps
/// the response small; extra fields are ignored anyway.
pub const JOB_LIST_PATH: &str = "/api/json?tree=jobs[name,url,color,_class]";

/// Top-level `/api/json` response.
#[derive(Debug, Clone, Deserialize)]
pub struct JobListResponse {
    /// Top-level jobs, in server order.
    pub jobs: Vec<JobEntry>,
}

/// One entry of the `jobs` array.
#[derive(Debug, Clone, Deserialize)]
pub struct JobEntry {
    /// Job name, unique per server.
    pub name: String,
    /// Job page URL.
    #[serde(default)]
    pub url: String,
    /// Status token. Folders and some job types have none.
    #[serde(default)]
    pub color: Option<String>,
    /// Fully qualified Java class, e.g. `hudson.model.FreeStyleProject`.
    #[serde(default, rename = "_class")]
    pub class: Option<String>,
}

impl JobEntry {
    /// Converts the wire entry into a [`Job`], mapping its color through `mapper`.
    pub fn into_job(self, mapper: &StatusMapper) -> Job {
        let raw_status = self.color.unwrap_or_default();
        let (state, building) = mapper.map(&raw_status);
        Job {
            type_name: self.class.as_deref().map(short_type_name).unwrap_or_default(),
            name: self.name,
            url: self.url,
            raw_status,
            state,
            building,
        }
    }
}

/// `hudson.model.FreeStyleProject` -> `FreeStyleProject`.
pub fn short_type_name(class: &str) -> String {
    class.rsplit('.').next().unwrap_or(class).to_string()
}

/// Parses a job-list body into a snapshot stamped `observed_at_ms`.
pub fn parse_job_list(body: &[u8], mapper: &StatusMapper, observed_at_ms: i64) -> Result<Snapshot, FetchError> {
    let resp: JobListResponse =
        serde_json::from_slice(body).map_err(|e| FetchError::Protocol(format!("decode job list: {e}")))?;

    let mut seen = HashSet::new();
    for entry in &resp.jobs {
        if !seen.insert(entry.name.as_str()) {
            tracing::warn!(job = %entry.name, "duplicate job name in response; keeping the last entry");
        }
    }

    let jobs = resp.jobs.into_iter().map(|e| e.into_job(mapper));
    Ok(Snapshot::new(observed_at_ms, jobs))
}

/// JSON body POSTed by the webhook sink.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WebhookPayload {
    /// Job the notification is about.
    pub job: String,
    /// Human-readable one-liner.
    pub message: String,
    /// Alert level.
    pub severity: Severity,
}
