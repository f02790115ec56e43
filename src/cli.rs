use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use log::debug;

use crate::auth::Token;
use crate::config::{resolve_token, Settings, DEFAULT_BASE_PATH, DEFAULT_COVERAGE_FILE};
use crate::coveralls::{submit_coverage, CoverallsClient, SubmitParams, DEFAULT_ENDPOINT};
use crate::flags::parse_bool_flag;
use crate::github::GitHubEnv;
use crate::output;

#[derive(Parser, Debug)]
#[command(name = "coveralls-action")]
#[command(author, version, about = "Submit coverage to Coveralls from GitHub Actions", long_about = None)]
pub struct Cli {
    /// Coveralls repo token; falls back to COVERALLS_REPO_TOKEN, then GITHUB_TOKEN
    #[arg(long)]
    github_token: Option<String>,

    /// Job flag name, e.g. "unit" or "py3.12"
    #[arg(long)]
    flag_name: Option<String>,

    /// Directory the coverage report's source paths are relative to [default: .]
    #[arg(long)]
    base_path: Option<PathBuf>,

    /// LCOV tracefile, relative to the base path [default: coverage/lcov.info]
    #[arg(long)]
    coverage_file: Option<PathBuf>,

    /// Coveralls base URL [default: https://coveralls.io]
    #[arg(long, env = "COVERALLS_ENDPOINT")]
    endpoint: Option<String>,

    /// Mark this job as one shard of a parallel build
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = parse_bool_flag, action = ArgAction::Set)]
    parallel: Option<bool>,

    /// Notify Coveralls that every parallel shard has finished instead of submitting
    #[arg(long, num_args = 0..=1, default_value = "false", default_missing_value = "true", value_parser = parse_bool_flag, action = ArgAction::Set)]
    parallel_finished: bool,

    /// Enable debug logging
    #[arg(long, num_args = 0..=1, default_value = "false", default_missing_value = "true", value_parser = parse_bool_flag, action = ArgAction::Set)]
    pub debug: bool,

    /// Settings file (TOML, JSON or YAML); coveralls.{toml,json,yaml,yml} is picked up otherwise
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Fully resolved parameters of one run.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub repo_token: Token,
    pub parallel: bool,
    pub flag_name: Option<String>,
    pub base_path: PathBuf,
    pub coverage_file: PathBuf,
    pub endpoint: String,
    pub parallel_finished: bool,
}

impl Cli {
    /// Merges flags over `settings` and resolves the repo token.
    ///
    /// Precedence is flag, then settings file, then built-in default.
    pub fn into_invocation<F>(self, settings: Settings, lookup: F) -> crate::error::Result<Invocation>
    where
        F: Fn(&str) -> Option<String>,
    {
        let repo_token = resolve_token(self.github_token.as_deref(), lookup)?;

        Ok(Invocation {
            repo_token,
            parallel: self.parallel.or(settings.parallel).unwrap_or(false),
            flag_name: self.flag_name.or(settings.flag_name),
            base_path: self
                .base_path
                .or(settings.base_path)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_BASE_PATH)),
            coverage_file: self
                .coverage_file
                .or(settings.coverage_file)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_COVERAGE_FILE)),
            endpoint: self
                .endpoint
                .or(settings.endpoint)
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            parallel_finished: self.parallel_finished,
        })
    }

    /// Loads settings from `dir`, then resolves the invocation against `lookup`.
    pub fn resolve<F>(self, dir: &Path, lookup: F) -> Result<Invocation>
    where
        F: Fn(&str) -> Option<String>,
    {
        let settings = Settings::load(self.config.as_deref(), dir)?;
        debug!("settings: {settings:?}");
        Ok(self.into_invocation(settings, lookup)?)
    }

    pub async fn execute(self) -> Result<()> {
        self.execute_in(Path::new("."), |key| std::env::var(key).ok())
            .await
    }

    /// Resolves everything from `dir` and `lookup`, then runs.
    async fn execute_in<F>(self, dir: &Path, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let invocation = self.resolve(dir, &lookup)?;
        debug!("invocation: {invocation:?}");

        let github = GitHubEnv::from_lookup(&lookup);
        debug!("github: {github:?}");

        run(&invocation, &github).await
    }
}

/// Runs exactly one of the two paths: close a parallel build, or submit coverage.
pub async fn run(invocation: &Invocation, github: &GitHubEnv) -> Result<()> {
    let client = CoverallsClient::new(&invocation.endpoint)?;

    if invocation.parallel_finished {
        client
            .notify_finished(&invocation.repo_token, github)
            .await
            .context("Failed to close the parallel build")?;
        output::print_build_finished();
    } else {
        let params = SubmitParams {
            repo_token: invocation.repo_token.clone(),
            parallel: invocation.parallel,
            flag_name: invocation.flag_name.clone(),
            base_path: invocation.base_path.clone(),
            coverage_file: invocation.coverage_file.clone(),
        };
        let response = submit_coverage(&client, github, &params).await?;
        output::print_coverage_url(&response.url);
    }

    Ok(())
}
