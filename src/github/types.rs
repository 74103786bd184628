use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wire shape of one item from `GET /repos/{owner}/{repo}/pulls`, reduced to
/// the sanitizer's allow-listed fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequestPayload {
    pub number: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub head: Option<HeadRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadRef {
    #[serde(default)]
    pub repo: Option<RepoRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoRef {
    #[serde(default)]
    pub description: Option<String>,
}

/// Wire shape of one item from `GET /repos/{owner}/{repo}/pulls/{n}/commits`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitPayload {
    #[serde(default)]
    pub sha: String,
    #[serde(default)]
    pub commit: CommitDetail,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommitDetail {
    #[serde(default)]
    pub message: String,
}

/// A pull request that passed the merge-date filter. Unmerged PRs never
/// materialize as this type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergedPullRequest {
    pub number: u64,
    pub title: String,
    pub merged_at: DateTime<Utc>,
    /// Branch the PR was fetched from, tagged before deduplication.
    pub branch: String,
}

/// One changelog-relevant commit, attributed to its owning PR. Merge commits
/// are dropped before this type is constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRecord {
    pub sha: String,
    pub message: String,
    pub pr_number: u64,
    pub pr_title: String,
}
