use log::{debug, info};
use serde::Serialize;
use serde_json::Value;

use crate::auth::Token;
use crate::error::{CoverallsError, Result};
use crate::github::GitHubEnv;

use super::client::CoverallsClient;

#[derive(Debug, Serialize)]
struct WebhookRequest<'a> {
    repo_token: &'a str,
    /// Lets a `GITHUB_TOKEN` stand in for the Coveralls repo token
    #[serde(skip_serializing_if = "Option::is_none")]
    repo_name: Option<&'a str>,
    payload: WebhookPayload,
}

#[derive(Debug, Serialize)]
struct WebhookPayload {
    build_num: String,
    status: &'static str,
}

impl CoverallsClient {
    /// Closes a parallel build via the parallel build webhook.
    ///
    /// # Errors
    ///
    /// - [`CoverallsError::Config`] if no build number can be derived from the CI environment
    /// - [`CoverallsError::Network`] on transport failures or a non-2xx status
    /// - [`CoverallsError::WebhookNotDone`] if the body does not carry a truthy `done`
    pub async fn notify_finished(&self, token: &Token, github: &GitHubEnv) -> Result<()> {
        let build_num = github.build_number().ok_or_else(|| {
            CoverallsError::Config(
                "Cannot derive a build number: neither GITHUB_SHA nor GITHUB_RUN_ID is set".into(),
            )
        })?;

        let url = self.url("webhook")?;
        let request = WebhookRequest {
            repo_token: token.as_str(),
            repo_name: github.repository.as_deref(),
            payload: WebhookPayload {
                build_num,
                status: "done",
            },
        };
        debug!("POST {url} (build_num: {})", request.payload.build_num);

        let response = self
            .client()
            .post(url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let text = response.text().await?;
        debug!("Webhook response: {text}");

        let body: Value = serde_json::from_str(&text)
            .map_err(|_| CoverallsError::WebhookNotDone(text.clone()))?;
        if !body.get("done").is_some_and(is_truthy) {
            return Err(CoverallsError::WebhookNotDone(text));
        }

        info!("Parallel build {} marked as done", request.payload.build_num);
        Ok(())
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
