/// Snapshot of the variables GitHub Actions exposes to a job.
///
/// Read once at startup and passed around by reference, so nothing downstream
/// touches the process environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitHubEnv {
    /// Repository slug, e.g. "octocat/Hello-World"
    pub repository: Option<String>,
    /// Workflow run id, e.g. "88748489334"
    pub run_id: Option<String>,
    /// Commit SHA that triggered the run
    pub sha: Option<String>,
    /// Full ref, e.g. "refs/pull/123/merge" or "refs/heads/main"
    pub ref_: Option<String>,
    /// Source branch of a pull request
    pub head_ref: Option<String>,
    /// Short branch or tag name
    pub ref_name: Option<String>,
}

impl GitHubEnv {
    /// Builds the snapshot from an arbitrary lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        Self {
            repository: get("GITHUB_REPOSITORY"),
            run_id: get("GITHUB_RUN_ID"),
            sha: get("GITHUB_SHA"),
            ref_: get("GITHUB_REF"),
            head_ref: get("GITHUB_HEAD_REF"),
            ref_name: get("GITHUB_REF_NAME"),
        }
    }

    /// Pull request number when the run was triggered by a `refs/pull/<n>/merge` ref.
    pub fn pull_request_number(&self) -> Option<&str> {
        let ref_ = self.ref_.as_deref()?;
        let parts: Vec<&str> = ref_.split('/').collect();
        match parts.as_slice() {
            ["refs", "pull", number, "merge"] if !number.is_empty() => Some(*number),
            _ => None,
        }
    }

    /// Build number shared by every shard of a run and by the closing webhook.
    ///
    /// The commit SHA (falling back to the run id), suffixed with `-PR-<n>`
    /// for pull request merge refs.
    pub fn build_number(&self) -> Option<String> {
        let base = self.sha.as_deref().or(self.run_id.as_deref())?;
        Some(match self.pull_request_number() {
            Some(number) => format!("{base}-PR-{number}"),
            None => base.to_string(),
        })
    }

    pub fn branch(&self) -> Option<&str> {
        self.head_ref.as_deref().or(self.ref_name.as_deref())
    }
}
