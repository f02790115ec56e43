use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SourceFile;

/// Everything one submission attempt needs, handed to the reporter by value.
///
/// Replaces environment-variable configuration: the reporter never reads
/// `COVERALLS_*` variables or the working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobConfig {
    pub repo_token: String,
    pub service_name: String,
    pub parallel: bool,
    pub flag_name: Option<String>,
}

/// Git metadata attached to a job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GitInfo {
    pub head: GitHead,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GitHead {
    pub id: String,
}

/// Request body of `POST /api/v1/jobs`, sent as the `json_file` multipart part.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub repo_token: String,
    pub service_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_job_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_pull_request: Option<String>,
    pub parallel: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flag_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git: Option<GitInfo>,
    pub run_at: DateTime<Utc>,
    pub source_files: Vec<SourceFile>,
}

/// Successful `POST /api/v1/jobs` response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobResponse {
    #[serde(default)]
    pub message: String,
    pub url: String,
}
