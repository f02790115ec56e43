use std::path::PathBuf;

use log::{debug, info, warn};

use crate::auth::Token;
use crate::coverage::{CoverageReport, JobConfig, JobResponse};
use crate::error::{CoverallsError, Result};
use crate::github::GitHubEnv;

use super::client::Reporter;

/// Coveralls classifies GitHub runs as either of these depending on the
/// repository's setup, so both are tried in this order.
pub const SERVICE_NAMES: [&str; 2] = ["github", "github-actions"];

/// Parameters of the submit-coverage path.
#[derive(Debug, Clone)]
pub struct SubmitParams {
    pub repo_token: Token,
    pub parallel: bool,
    pub flag_name: Option<String>,
    pub base_path: PathBuf,
    /// Tracefile location, relative to `base_path` unless absolute
    pub coverage_file: PathBuf,
}

/// Submits coverage, falling back through [`SERVICE_NAMES`] on rejection.
///
/// The tracefile is read once up front. Each service name is attempted at
/// most once and the first success wins. Only
/// [`CoverallsError::Submission`] moves on to the next name; any other
/// error aborts immediately.
///
/// # Errors
///
/// Returns [`CoverallsError::SubmissionFailed`] when every service name was
/// rejected.
pub async fn submit_coverage<R: Reporter>(
    reporter: &R,
    github: &GitHubEnv,
    params: &SubmitParams,
) -> Result<JobResponse> {
    let report = CoverageReport::load(&params.base_path, &params.coverage_file)?;

    let mut result = None;
    for service_name in SERVICE_NAMES {
        info!("Trying submitting coverage with service_name: {service_name}...");
        let config = JobConfig {
            repo_token: params.repo_token.as_str().to_string(),
            service_name: service_name.to_string(),
            parallel: params.parallel,
            flag_name: params.flag_name.clone(),
        };
        let job = report.to_job(config, github);

        match reporter.submit(&job).await {
            Ok(response) => {
                result = Some(response);
                break;
            }
            Err(e @ CoverallsError::Submission { .. }) => {
                warn!("Failed submitting coverage with service_name: {service_name}: {e}");
            }
            Err(e) => return Err(e),
        }
    }

    let result = result.ok_or(CoverallsError::SubmissionFailed)?;
    debug!("{result:?}");
    info!("{}", result.url);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::Job;
    use std::cell::RefCell;
    use std::collections::BTreeMap;
    use std::fs;

    /// Scripted reporter: rejects every service name in `reject`.
    struct FakeReporter {
        reject: Vec<&'static str>,
        fatal: bool,
        attempts: RefCell<Vec<String>>,
    }

    impl FakeReporter {
        fn rejecting(reject: Vec<&'static str>) -> Self {
            Self {
                reject,
                fatal: false,
                attempts: RefCell::new(Vec::new()),
            }
        }

        fn attempts(&self) -> Vec<String> {
            self.attempts.borrow().clone()
        }
    }

    impl Reporter for FakeReporter {
        async fn submit(&self, job: &Job) -> Result<JobResponse> {
            self.attempts.borrow_mut().push(job.service_name.clone());
            if self.fatal {
                return Err(CoverallsError::UnexpectedResponse("boom".into()));
            }
            if self.reject.contains(&job.service_name.as_str()) {
                return Err(CoverallsError::Submission {
                    service_name: job.service_name.clone(),
                    message: "rejected".into(),
                });
            }
            Ok(JobResponse {
                message: format!("Job via {}", job.service_name),
                url: "https://coveralls.io/jobs/1".into(),
            })
        }
    }

    fn params(dir: &tempfile::TempDir) -> SubmitParams {
        fs::write(dir.path().join("lib.rs"), "fn main() {}\n").unwrap();
        fs::write(dir.path().join("lcov.info"), "SF:lib.rs\nDA:1,1\nend_of_record\n").unwrap();
        SubmitParams {
            repo_token: Token::from("token"),
            parallel: true,
            flag_name: Some("unit".into()),
            base_path: dir.path().to_path_buf(),
            coverage_file: PathBuf::from("lcov.info"),
        }
    }

    #[tokio::test]
    async fn test_first_service_name_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = FakeReporter::rejecting(vec![]);

        let response = submit_coverage(&reporter, &GitHubEnv::default(), &params(&dir))
            .await
            .unwrap();

        assert_eq!(response.message, "Job via github");
        assert_eq!(reporter.attempts(), vec!["github"]);
    }

    #[tokio::test]
    async fn test_falls_back_to_github_actions() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = FakeReporter::rejecting(vec!["github"]);

        let response = submit_coverage(&reporter, &GitHubEnv::default(), &params(&dir))
            .await
            .unwrap();

        assert_eq!(response.message, "Job via github-actions");
        assert_eq!(reporter.attempts(), vec!["github", "github-actions"]);
    }

    #[tokio::test]
    async fn test_all_service_names_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = FakeReporter::rejecting(vec!["github", "github-actions"]);

        let err = submit_coverage(&reporter, &GitHubEnv::default(), &params(&dir))
            .await
            .unwrap_err();

        assert!(matches!(err, CoverallsError::SubmissionFailed));
        assert_eq!(err.to_string(), "Failed to submit coverage");
        assert_eq!(reporter.attempts(), vec!["github", "github-actions"]);
    }

    #[tokio::test]
    async fn test_unrecognized_error_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = FakeReporter {
            fatal: true,
            ..FakeReporter::rejecting(vec![])
        };

        let err = submit_coverage(&reporter, &GitHubEnv::default(), &params(&dir))
            .await
            .unwrap_err();

        assert!(matches!(err, CoverallsError::UnexpectedResponse(_)));
        assert_eq!(reporter.attempts(), vec!["github"]);
    }

    #[tokio::test]
    async fn test_missing_tracefile_makes_no_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let mut params = params(&dir);
        params.coverage_file = PathBuf::from("absent.info");
        let reporter = FakeReporter::rejecting(vec![]);

        let err = submit_coverage(&reporter, &GitHubEnv::default(), &params)
            .await
            .unwrap_err();

        assert!(matches!(err, CoverallsError::Config(_)));
        assert!(reporter.attempts().is_empty());
    }

    #[tokio::test]
    async fn test_environment_and_cwd_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let params = params(&dir);
        let env_before: BTreeMap<_, _> = std::env::vars_os().collect();
        let cwd_before = std::env::current_dir().unwrap();

        let reporter = FakeReporter::rejecting(vec!["github"]);
        submit_coverage(&reporter, &GitHubEnv::default(), &params)
            .await
            .unwrap();
        assert_eq!(std::env::vars_os().collect::<BTreeMap<_, _>>(), env_before);
        assert_eq!(std::env::current_dir().unwrap(), cwd_before);

        let reporter = FakeReporter::rejecting(vec!["github", "github-actions"]);
        submit_coverage(&reporter, &GitHubEnv::default(), &params)
            .await
            .unwrap_err();
        assert_eq!(std::env::vars_os().collect::<BTreeMap<_, _>>(), env_before);
        assert_eq!(std::env::current_dir().unwrap(), cwd_before);
    }

    #[tokio::test]
    async fn test_job_carries_params() {
        struct Capture(RefCell<Option<Job>>);
        impl Reporter for Capture {
            async fn submit(&self, job: &Job) -> Result<JobResponse> {
                *self.0.borrow_mut() = Some(job.clone());
                Ok(JobResponse {
                    message: String::new(),
                    url: "u".into(),
                })
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let capture = Capture(RefCell::new(None));
        submit_coverage(&capture, &GitHubEnv::default(), &params(&dir))
            .await
            .unwrap();

        let job = capture.0.borrow().clone().unwrap();
        assert_eq!(job.repo_token, "token");
        assert!(job.parallel);
        assert_eq!(job.flag_name.as_deref(), Some("unit"));
        assert_eq!(job.source_files.len(), 1);
        assert_eq!(job.source_files[0].name, "lib.rs");
    }
}
