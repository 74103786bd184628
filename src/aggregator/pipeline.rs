use chrono::NaiveDate;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

use crate::aggregator::combine::combine_pull_requests;
use crate::aggregator::commits::{CommitAggregator, ProgressEvent};
use crate::aggregator::messages::extract_messages;
use crate::aggregator::pr_fetcher::PullRequestFetcher;
use crate::cache::{MemoryCache, ResultCache};
use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::github::client::GithubApi;
use crate::sanitize::{AllowListSanitizer, ResponseSanitizer};
use crate::summarizer::{Summarizer, SummaryRequest};

/// One changelog generation request.
#[derive(Debug, Clone)]
pub struct ChangelogRequest {
    pub owner: String,
    pub repo: String,
    /// Branches to aggregate, in priority order: when a PR was merged to
    /// several of them, it is attributed to the first branch listed here.
    pub branches: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Best-effort assembled result. `warnings` names the branches and PRs the
/// pipeline had to skip.
#[derive(Debug)]
pub struct ChangelogReport {
    pub changelog: String,
    pub repo_description: String,
    pub pr_count: usize,
    pub commit_count: usize,
    pub warnings: Vec<String>,
}

/// End-to-end pipeline: per-branch PR fetch, deduplication, concurrent
/// commit aggregation, message extraction, summarization.
pub struct ChangelogPipeline {
    pr_fetcher: PullRequestFetcher,
    commit_aggregator: CommitAggregator,
}

impl ChangelogPipeline {
    /// Build a pipeline with in-memory caches and the default allow-list
    /// sanitizer.
    pub fn new(client: Arc<dyn GithubApi>, config: AppConfig) -> Self {
        Self::with_sanitizer(client, Arc::new(AllowListSanitizer::new()), config)
    }

    /// Build a pipeline with a caller-supplied sanitizer. Cache stores are
    /// still in-memory, split so PR queries and commit lists carry their own
    /// TTLs.
    pub fn with_sanitizer(
        client: Arc<dyn GithubApi>,
        sanitizer: Arc<dyn ResponseSanitizer>,
        config: AppConfig,
    ) -> Self {
        let pr_cache: Arc<dyn ResultCache> =
            Arc::new(MemoryCache::new(config.github.pr_cache_ttl()));
        let commit_cache: Arc<dyn ResultCache> =
            Arc::new(MemoryCache::new(config.github.commit_cache_ttl()));

        Self {
            pr_fetcher: PullRequestFetcher::new(
                Arc::clone(&client),
                pr_cache,
                Arc::clone(&sanitizer),
                config.github.clone(),
            ),
            commit_aggregator: CommitAggregator::new(client, commit_cache, sanitizer, config.github),
        }
    }

    /// Generate a changelog for the requested repository and date range.
    ///
    /// Transient per-branch fetch failures and per-PR commit failures are
    /// tolerated and reported as warnings; fatal conditions (invalid dates,
    /// exhausted quota, bad credentials, unknown repository) abort the run.
    pub async fn generate(
        &self,
        request: &ChangelogRequest,
        summarizer: &dyn Summarizer,
        progress: Option<UnboundedSender<ProgressEvent>>,
    ) -> Result<ChangelogReport> {
        if request.branches.is_empty() {
            return Err(Error::Validation(
                "at least one branch is required".to_string(),
            ));
        }

        let mut warnings = Vec::new();
        let mut branch_sets = Vec::new();
        let mut repo_description = String::new();

        for branch in &request.branches {
            match self
                .pr_fetcher
                .fetch(
                    &request.owner,
                    &request.repo,
                    branch,
                    request.start_date,
                    request.end_date,
                )
                .await
            {
                Ok(result) => {
                    if repo_description.is_empty() {
                        repo_description = result.repo_description;
                    }
                    branch_sets.push(result.pull_requests);
                }
                Err(e) if e.is_transient() => {
                    warn!(branch = %branch, error = %e, "skipping branch after fetch failure");
                    warnings.push(format!("failed to fetch PRs from {branch}: {e}"));
                }
                Err(e) => return Err(e),
            }
        }

        let prs = combine_pull_requests(branch_sets);
        if prs.is_empty() {
            return Err(Error::NoPullRequests);
        }

        info!(
            pr_count = prs.len(),
            repo = %format!("{}/{}", request.owner, request.repo),
            "aggregating commits"
        );

        let report = self
            .commit_aggregator
            .aggregate(&request.owner, &request.repo, &prs, progress)
            .await;

        warnings.extend(report.failures.iter().map(|failure| {
            format!(
                "failed to fetch commits for PR #{}: {}",
                failure.pr_number, failure.error
            )
        }));

        let commit_text = extract_messages(&report.commits);
        if commit_text.trim().is_empty() {
            return Err(Error::NoCommits);
        }

        let changelog = summarizer
            .summarize(SummaryRequest {
                commit_text: &commit_text,
                start_date: request.start_date,
                end_date: request.end_date,
                owner: &request.owner,
                repo: &request.repo,
                repo_description: &repo_description,
                branches: &request.branches,
            })
            .await?;

        Ok(ChangelogReport {
            changelog,
            repo_description,
            pr_count: prs.len(),
            commit_count: report.commits.len(),
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// API double routing on (endpoint, base-branch param).
    struct RoutedApi {
        pr_pages: HashMap<String, Value>,
        commit_bodies: HashMap<String, Value>,
        failing_branches: Vec<String>,
    }

    #[async_trait]
    impl GithubApi for RoutedApi {
        async fn call(
            &self,
            endpoint: &str,
            _owner: &str,
            _repo: &str,
            params: &[(&str, String)],
            _use_rate_limit: bool,
        ) -> Result<Value> {
            if endpoint == "pulls" {
                let branch = params
                    .iter()
                    .find(|(k, _)| *k == "base")
                    .map(|(_, v)| v.clone())
                    .unwrap_or_default();
                if self.failing_branches.contains(&branch) {
                    return Err(Error::Timeout);
                }
                return Ok(self.pr_pages.get(&branch).cloned().unwrap_or(json!([])));
            }
            Ok(self
                .commit_bodies
                .get(endpoint)
                .cloned()
                .unwrap_or(json!([])))
        }
    }

    struct CannedSummarizer {
        seen_text: Mutex<String>,
    }

    #[async_trait]
    impl Summarizer for CannedSummarizer {
        async fn summarize(&self, request: SummaryRequest<'_>) -> Result<String> {
            *self.seen_text.lock().unwrap() = request.commit_text.to_string();
            Ok("## Changelog\n- generated".to_string())
        }
    }

    fn pr_page(entries: &[(u64, &str, &str)]) -> Value {
        Value::Array(
            entries
                .iter()
                .map(|(number, title, merged_at)| {
                    json!({
                        "number": number,
                        "title": title,
                        "merged_at": merged_at,
                        "head": {"repo": {"description": "demo repository"}}
                    })
                })
                .collect(),
        )
    }

    fn commits(entries: &[(&str, &str)]) -> Value {
        Value::Array(
            entries
                .iter()
                .map(|(sha, message)| json!({"sha": sha, "commit": {"message": message}}))
                .collect(),
        )
    }

    fn request() -> ChangelogRequest {
        ChangelogRequest {
            owner: "octo".to_string(),
            repo: "hello".to_string(),
            branches: vec!["production".to_string(), "staging".to_string()],
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        }
    }

    fn fast_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.github.rate_limit_delay_secs = 0.0;
        config
    }

    fn summarizer() -> CannedSummarizer {
        CannedSummarizer {
            seen_text: Mutex::new(String::new()),
        }
    }

    #[tokio::test]
    async fn end_to_end_deduplicates_and_summarizes() {
        let api = Arc::new(RoutedApi {
            pr_pages: HashMap::from([
                (
                    "production".to_string(),
                    pr_page(&[
                        (101, "Add cache", "2024-01-10T10:00:00Z"),
                        (102, "Fix dates", "2024-01-12T10:00:00Z"),
                    ]),
                ),
                (
                    "staging".to_string(),
                    pr_page(&[
                        (102, "Fix dates", "2024-01-12T10:00:00Z"),
                        (103, "Docs", "2024-01-14T10:00:00Z"),
                    ]),
                ),
            ]),
            commit_bodies: HashMap::from([
                ("pulls/101/commits".to_string(), commits(&[("a", "add cache")])),
                ("pulls/102/commits".to_string(), commits(&[("b", "fix dates")])),
                ("pulls/103/commits".to_string(), commits(&[("c", "write docs")])),
            ]),
            failing_branches: vec![],
        });

        let pipeline = ChangelogPipeline::new(api, fast_config());
        let canned = summarizer();
        let report = pipeline.generate(&request(), &canned, None).await.unwrap();

        assert_eq!(report.changelog, "## Changelog\n- generated");
        assert_eq!(report.pr_count, 3);
        assert_eq!(report.commit_count, 3);
        assert_eq!(report.repo_description, "demo repository");
        assert!(report.warnings.is_empty());

        let text = canned.seen_text.lock().unwrap().clone();
        // PR 102 appears once, attributed via first-seen dedup.
        assert_eq!(text.matches("PR #102").count(), 1);
        assert!(text.contains("- write docs"));
    }

    #[tokio::test]
    async fn transient_branch_failure_becomes_a_warning() {
        let api = Arc::new(RoutedApi {
            pr_pages: HashMap::from([(
                "production".to_string(),
                pr_page(&[(101, "Add cache", "2024-01-10T10:00:00Z")]),
            )]),
            commit_bodies: HashMap::from([(
                "pulls/101/commits".to_string(),
                commits(&[("a", "add cache")]),
            )]),
            failing_branches: vec!["staging".to_string()],
        });

        let pipeline = ChangelogPipeline::new(api, fast_config());
        let canned = summarizer();
        let report = pipeline.generate(&request(), &canned, None).await.unwrap();

        assert_eq!(report.pr_count, 1);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("staging"));
    }

    #[tokio::test]
    async fn invalid_dates_fail_fast() {
        let api = Arc::new(RoutedApi {
            pr_pages: HashMap::new(),
            commit_bodies: HashMap::new(),
            failing_branches: vec![],
        });
        let pipeline = ChangelogPipeline::new(api, fast_config());

        let mut bad_request = request();
        std::mem::swap(&mut bad_request.start_date, &mut bad_request.end_date);

        let canned = summarizer();
        let err = pipeline.generate(&bad_request, &canned, None).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn no_matching_prs_is_a_typed_error() {
        let api = Arc::new(RoutedApi {
            pr_pages: HashMap::new(),
            commit_bodies: HashMap::new(),
            failing_branches: vec![],
        });
        let pipeline = ChangelogPipeline::new(api, fast_config());

        let canned = summarizer();
        let err = pipeline.generate(&request(), &canned, None).await.unwrap_err();
        assert!(matches!(err, Error::NoPullRequests));
    }

    #[tokio::test]
    async fn all_merge_commits_means_nothing_to_summarize() {
        let api = Arc::new(RoutedApi {
            pr_pages: HashMap::from([(
                "production".to_string(),
                pr_page(&[(101, "Merges only", "2024-01-10T10:00:00Z")]),
            )]),
            commit_bodies: HashMap::from([(
                "pulls/101/commits".to_string(),
                commits(&[("a", "Merge branch 'dev' into production")]),
            )]),
            failing_branches: vec![],
        });

        let pipeline = ChangelogPipeline::new(api, fast_config());
        let canned = summarizer();
        let err = pipeline.generate(&request(), &canned, None).await.unwrap_err();
        assert!(matches!(err, Error::NoCommits));
    }

    #[tokio::test]
    async fn fatal_branch_errors_abort_the_run() {
        struct RateLimitedApi;

        #[async_trait]
        impl GithubApi for RateLimitedApi {
            async fn call(
                &self,
                _endpoint: &str,
                _owner: &str,
                _repo: &str,
                _params: &[(&str, String)],
                _use_rate_limit: bool,
            ) -> Result<Value> {
                Err(Error::RateLimitExceeded { reset: None })
            }
        }

        let pipeline = ChangelogPipeline::new(Arc::new(RateLimitedApi), fast_config());
        let canned = summarizer();
        let err = pipeline.generate(&request(), &canned, None).await.unwrap_err();
        assert!(matches!(err, Error::RateLimitExceeded { .. }));
    }
}
