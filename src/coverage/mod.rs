mod job;
pub mod lcov;

use std::fs;
use std::path::{Component, Path, PathBuf};

use chrono::Utc;
use log::{debug, info, warn};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

use crate::error::{CoverallsError, Result};
use crate::github::GitHubEnv;

pub use job::{GitHead, GitInfo, Job, JobConfig, JobResponse};
use lcov::LcovRecord;

/// One source file in the Coveralls job format.
///
/// `coverage` is indexed by line number minus one; `None` marks lines that
/// are not relevant (blank, comments, declarations).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub source_digest: String,
    pub coverage: Vec<Option<u64>>,
    /// Flattened `[line, block, branch, hits]` quadruples
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub branches: Vec<u64>,
}

/// Coverage collected once per run and reused by every submission attempt.
#[derive(Debug, Clone, Default)]
pub struct CoverageReport {
    pub source_files: Vec<SourceFile>,
}

impl CoverageReport {
    /// Reads `coverage_file` (relative to `base_path` unless absolute) and
    /// resolves every listed source against `base_path`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the tracefile cannot be read.
    /// Unreadable source files are skipped with a warning.
    pub fn load(base_path: &Path, coverage_file: &Path) -> Result<Self> {
        let tracefile = base_path.join(coverage_file);
        let contents = fs::read_to_string(&tracefile).map_err(|e| {
            CoverallsError::Config(format!(
                "Failed to read coverage file {}: {e}",
                tracefile.display()
            ))
        })?;

        let records = lcov::parse(&contents);
        let roots = source_roots(base_path);
        let source_files: Vec<SourceFile> = records
            .iter()
            .filter_map(|record| match source_file(base_path, &roots, record) {
                Ok(file) => Some(file),
                Err(e) => {
                    warn!("Skipping {}: {e}", record.path);
                    None
                }
            })
            .collect();

        info!(
            "Loaded coverage for {} source files from {}",
            source_files.len(),
            tracefile.display()
        );

        Ok(Self { source_files })
    }

    /// Assembles the job for one attempt.
    pub fn to_job(&self, config: JobConfig, github: &GitHubEnv) -> Job {
        let git = github.sha.as_ref().map(|sha| GitInfo {
            head: GitHead { id: sha.clone() },
            branch: github.branch().map(str::to_string),
        });

        Job {
            repo_token: config.repo_token,
            service_name: config.service_name,
            service_job_id: github.run_id.clone(),
            service_number: github.build_number(),
            service_pull_request: github.pull_request_number().map(str::to_string),
            parallel: config.parallel,
            flag_name: config.flag_name,
            git,
            run_at: Utc::now(),
            source_files: self.source_files.clone(),
        }
    }
}

/// Absolute forms of `base_path` that absolute `SF:` paths may start with:
/// the lexical one and, when it differs, the symlink-resolved one.
fn source_roots(base_path: &Path) -> Vec<PathBuf> {
    let mut roots: Vec<PathBuf> = std::path::absolute(base_path).into_iter().collect();
    if let Ok(canonical) = fs::canonicalize(base_path) {
        if !roots.contains(&canonical) {
            roots.push(canonical);
        }
    }
    roots
}

/// Repository-relative name Coveralls matches against its file tree.
///
/// Absolute paths under one of `roots` lose that prefix; `.` components are
/// dropped and separators normalized to `/`.
fn source_name(path: &Path, roots: &[PathBuf]) -> String {
    let relative = roots
        .iter()
        .find_map(|root| path.strip_prefix(root).ok())
        .unwrap_or(path);

    relative
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect::<PathBuf>()
        .to_string_lossy()
        .replace('\\', "/")
}

fn source_file(base_path: &Path, roots: &[PathBuf], record: &LcovRecord) -> Result<SourceFile> {
    let path = Path::new(&record.path);
    let source = fs::read_to_string(base_path.join(path))?;

    let line_count = source.lines().count().max(record.last_line() as usize);
    let mut coverage = vec![None; line_count];
    for (&line, &hits) in &record.lines {
        coverage[line as usize - 1] = Some(hits);
    }

    let branches = record
        .branches
        .iter()
        .flat_map(|b| [u64::from(b.line), u64::from(b.block), u64::from(b.branch), b.hits])
        .collect();

    let name = source_name(path, roots);
    debug!("Collected {} lines for {name}", coverage.len());

    Ok(SourceFile {
        name,
        source_digest: hex::encode(Md5::digest(source.as_bytes())),
        coverage,
        branches,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::create_dir_all(dir.path().join("coverage")).unwrap();
        fs::write(
            dir.path().join("src/lib.rs"),
            "pub fn add(a: i32, b: i32) -> i32 {\n    a + b\n}\n\n// end\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("coverage/lcov.info"),
            "SF:src/lib.rs\nDA:1,2\nDA:2,2\nBRDA:2,0,0,1\nend_of_record\nSF:src/missing.rs\nDA:1,0\nend_of_record\n",
        )
        .unwrap();
        dir
    }

    #[test]
    fn test_load_resolves_sources_against_base_path() {
        let dir = workspace();
        let report = CoverageReport::load(dir.path(), Path::new("coverage/lcov.info")).unwrap();

        assert_eq!(report.source_files.len(), 1);
        let file = &report.source_files[0];
        assert_eq!(file.name, "src/lib.rs");
        assert_eq!(file.coverage, vec![Some(2), Some(2), None, None, None]);
        assert_eq!(file.branches, vec![2, 0, 0, 1]);
        assert_eq!(file.source_digest.len(), 32);
    }

    #[test]
    fn test_absolute_source_path_made_relative() {
        let dir = workspace();
        let absolute = dir.path().join("src/lib.rs");
        fs::write(
            dir.path().join("abs.info"),
            format!("SF:{}\nDA:1,1\nend_of_record\n", absolute.display()),
        )
        .unwrap();

        let report = CoverageReport::load(dir.path(), Path::new("abs.info")).unwrap();
        assert_eq!(report.source_files[0].name, "src/lib.rs");
    }

    #[test]
    fn test_absolute_source_path_with_relative_base_path() {
        // Test binaries run from the crate root, so "." resolves to it.
        let dir = tempfile::tempdir().unwrap();
        let absolute = std::env::current_dir().unwrap().join("src/main.rs");
        let tracefile = dir.path().join("lcov.info");
        fs::write(
            &tracefile,
            format!("SF:{}\nDA:1,1\nend_of_record\n", absolute.display()),
        )
        .unwrap();

        let report = CoverageReport::load(Path::new("."), &tracefile).unwrap();
        assert_eq!(report.source_files.len(), 1);
        assert_eq!(report.source_files[0].name, "src/main.rs");
    }

    #[test]
    fn test_leading_dot_component_dropped() {
        let dir = workspace();
        fs::write(dir.path().join("dot.info"), "SF:./src/lib.rs\nDA:1,1\nend_of_record\n").unwrap();

        let report = CoverageReport::load(dir.path(), Path::new("dot.info")).unwrap();
        assert_eq!(report.source_files[0].name, "src/lib.rs");
    }

    #[test]
    fn test_source_name_outside_base_path_kept() {
        let roots = vec![PathBuf::from("/work/repo")];
        assert_eq!(source_name(Path::new("/work/repo/src/a.rs"), &roots), "src/a.rs");
        assert_eq!(source_name(Path::new("/elsewhere/b.rs"), &roots), "/elsewhere/b.rs");
        assert_eq!(source_name(Path::new("./c.rs"), &roots), "c.rs");
    }

    #[test]
    fn test_coverage_longer_than_source() {
        let dir = workspace();
        fs::write(dir.path().join("short.info"), "SF:src/lib.rs\nDA:8,1\nend_of_record\n").unwrap();

        let report = CoverageReport::load(dir.path(), Path::new("short.info")).unwrap();
        let coverage = &report.source_files[0].coverage;
        assert_eq!(coverage.len(), 8);
        assert_eq!(coverage[7], Some(1));
    }

    #[test]
    fn test_missing_tracefile_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = CoverageReport::load(dir.path(), Path::new("nope.info")).unwrap_err();
        assert!(matches!(err, CoverallsError::Config(_)));
        assert!(err.to_string().contains("nope.info"));
    }

    #[test]
    fn test_to_job_carries_config_and_ci_metadata() {
        let github = GitHubEnv {
            repository: Some("octocat/Hello-World".to_string()),
            run_id: Some("42".to_string()),
            sha: Some("abc".to_string()),
            ref_: Some("refs/pull/7/merge".to_string()),
            head_ref: Some("feature".to_string()),
            ref_name: None,
        };
        let config = JobConfig {
            repo_token: "secret".to_string(),
            service_name: "github".to_string(),
            parallel: true,
            flag_name: Some("unit".to_string()),
        };

        let job = CoverageReport::default().to_job(config, &github);
        assert_eq!(job.service_name, "github");
        assert_eq!(job.service_job_id.as_deref(), Some("42"));
        assert_eq!(job.service_number.as_deref(), Some("abc-PR-7"));
        assert_eq!(job.service_pull_request.as_deref(), Some("7"));
        assert_eq!(job.git.as_ref().unwrap().head.id, "abc");
        assert_eq!(job.git.as_ref().unwrap().branch.as_deref(), Some("feature"));

        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["repo_token"], "secret");
        assert_eq!(json["parallel"], true);
        assert_eq!(json["flag_name"], "unit");
    }

    #[test]
    fn test_to_job_omits_absent_fields() {
        let config = JobConfig {
            repo_token: "t".to_string(),
            service_name: "github-actions".to_string(),
            parallel: false,
            flag_name: None,
        };
        let job = CoverageReport::default().to_job(config, &GitHubEnv::default());
        let json = serde_json::to_value(&job).unwrap();
        assert!(json.get("flag_name").is_none());
        assert!(json.get("git").is_none());
        assert!(json.get("service_number").is_none());
        assert_eq!(json["parallel"], false);
    }
}
