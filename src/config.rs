use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::auth::Token;
use crate::error::CoverallsError;
use crate::flags::deserialize_opt_bool;

pub const DEFAULT_BASE_PATH: &str = ".";
pub const DEFAULT_COVERAGE_FILE: &str = "coverage/lcov.info";

/// Environment variables searched for the repo token, in order of preference.
pub const TOKEN_ENV_VARS: [&str; 2] = ["COVERALLS_REPO_TOKEN", "GITHUB_TOKEN"];

/// Optional settings file.
///
/// Lets a repository pin its flag name, paths and endpoint instead of
/// repeating them in every workflow step. Command-line flags win over the
/// file. The repo token is deliberately not accepted here.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct Settings {
    pub flag_name: Option<String>,

    pub base_path: Option<PathBuf>,

    /// LCOV tracefile, relative to the base path
    pub coverage_file: Option<PathBuf>,

    /// Coveralls instance base URL
    pub endpoint: Option<String>,

    /// Accepts `true`/`false` as well as the string forms the CLI accepts
    #[serde(default, deserialize_with = "deserialize_opt_bool")]
    pub parallel: Option<bool>,
}

impl Settings {
    /// Load settings from a file.
    ///
    /// Searches for settings files in this order:
    /// 1. Specified path
    /// 2. `dir`/coveralls.toml
    /// 3. `dir`/coveralls.json
    /// 4. `dir`/coveralls.yaml
    /// 5. `dir`/coveralls.yml
    ///
    /// Returns defaults if no candidate exists. An explicitly specified path
    /// must exist.
    pub fn load(path: Option<&Path>, dir: &Path) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        let candidates = ["coveralls.toml", "coveralls.json", "coveralls.yaml", "coveralls.yml"];

        for candidate in &candidates {
            let path = dir.join(candidate);
            if path.exists() {
                return Self::load_from_path(&path);
            }
        }

        Ok(Self::default())
    }

    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML settings: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON settings: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML settings: {}", path.display())),
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse settings file: {}", path.display())),
        }
    }
}

/// Resolves the repo token from the flag value or, failing that, the environment.
///
/// When both environment variables are set the first of [`TOKEN_ENV_VARS`]
/// is used and a warning is logged. Empty values count as unset.
///
/// # Errors
///
/// Returns [`CoverallsError::Config`] when no source provides a token.
pub fn resolve_token<F>(flag: Option<&str>, lookup: F) -> crate::error::Result<Token>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(token) = flag.filter(|t| !t.is_empty()) {
        return Ok(Token::from(token));
    }

    let found: Vec<(&str, String)> = TOKEN_ENV_VARS
        .into_iter()
        .filter_map(|name| lookup(name).filter(|v| !v.is_empty()).map(|v| (name, v)))
        .collect();

    if let Some(message) = token_conflict(&found) {
        warn!("{message}");
    }

    found
        .into_iter()
        .next()
        .map(|(_, value)| Token::from(value))
        .ok_or_else(|| {
            CoverallsError::Config(format!(
                "A repo token is required: pass --github-token or set {} or {}",
                TOKEN_ENV_VARS[0], TOKEN_ENV_VARS[1]
            ))
        })
}

/// Warning text when more than one token variable is set.
fn token_conflict(found: &[(&str, String)]) -> Option<String> {
    match found {
        [(used, _), rest @ ..] if !rest.is_empty() => {
            let names: Vec<&str> = found.iter().map(|(name, _)| *name).collect();
            Some(format!("Both {} are set, using {used}", names.join(" and ")))
        }
        _ => None,
    }
}
