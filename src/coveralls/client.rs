use std::future::Future;

use log::debug;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::Value;
use url::Url;

use crate::coverage::{Job, JobResponse};
use crate::error::{CoverallsError, Result};

pub const DEFAULT_ENDPOINT: &str = "https://coveralls.io";

/// Anything that can take a finished job to the reporting service.
///
/// A rejection of the job itself must come back as
/// [`CoverallsError::Submission`]; the submitter retries only on that variant.
pub trait Reporter {
    fn submit(&self, job: &Job) -> impl Future<Output = Result<JobResponse>>;
}

pub struct CoverallsClient {
    client: Client,
    endpoint: Url,
}

impl CoverallsClient {
    pub fn new(endpoint: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("coveralls-action/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CoverallsError::Config(format!("Failed to create HTTP client: {e}")))?;

        let mut endpoint = Url::parse(endpoint)
            .map_err(|e| CoverallsError::Config(format!("Invalid endpoint URL: {e}")))?;

        // `Url::join` replaces the last segment unless the path ends in '/'.
        if !endpoint.path().ends_with('/') {
            let path = format!("{}/", endpoint.path());
            endpoint.set_path(&path);
        }

        Ok(Self { client, endpoint })
    }

    pub(super) fn client(&self) -> &Client {
        &self.client
    }

    pub(super) fn url(&self, path: &str) -> Result<Url> {
        self.endpoint
            .join(path)
            .map_err(|e| CoverallsError::Config(format!("Invalid endpoint URL: {e}")))
    }
}

impl Reporter for CoverallsClient {
    /// `POST /api/v1/jobs` with the job as the `json_file` multipart part.
    async fn submit(&self, job: &Job) -> Result<JobResponse> {
        let rejected = |message: String| CoverallsError::Submission {
            service_name: job.service_name.clone(),
            message,
        };

        let url = self.url("api/v1/jobs")?;
        let part = Part::bytes(serde_json::to_vec(job)?)
            .file_name("coveralls.json")
            .mime_str("application/json")?;
        let form = Form::new().part("json_file", part);

        debug!("POST {url} (service_name: {})", job.service_name);
        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| rejected(e.to_string()))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| rejected(e.to_string()))?;
        debug!("Coveralls responded {status}: {text}");

        let body: Option<Value> = serde_json::from_str(&text).ok();
        let flagged_error = body
            .as_ref()
            .and_then(|b| b.get("error"))
            .and_then(Value::as_bool)
            .unwrap_or(false);

        if !status.is_success() || flagged_error {
            let message = body
                .as_ref()
                .and_then(|b| b.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP {status}: {text}"));
            return Err(rejected(message));
        }

        let body = body.ok_or_else(|| CoverallsError::UnexpectedResponse(text.clone()))?;
        serde_json::from_value(body).map_err(|_| CoverallsError::UnexpectedResponse(text))
    }
}
