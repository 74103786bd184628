use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, warn};

use crate::cache::{self, ResultCache};
use crate::config::GithubConfig;
use crate::error::{Error, Result};
use crate::github::client::GithubApi;
use crate::github::types::{CommitPayload, CommitRecord, MergedPullRequest};
use crate::retry;
use crate::sanitize::ResponseSanitizer;

/// Prefix marking commits produced by branch merges; these never reach the
/// aggregate output.
const MERGE_COMMIT_PREFIX: &str = "Merge branch";

/// Progress notifications for a presentation layer. The aggregator only
/// emits these; it knows nothing about how they are rendered.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Started { total: usize },
    PrFetched { pr_number: u64, commits: usize },
    PrFailed { pr_number: u64 },
}

/// A PR whose commit fetch exhausted its retries. The batch continues
/// without it.
#[derive(Debug)]
pub struct PrFetchFailure {
    pub pr_number: u64,
    pub error: Error,
}

/// Outcome of one aggregation batch: the flat commit set plus the PRs that
/// could not be fetched.
#[derive(Debug, Default)]
pub struct CommitReport {
    pub commits: Vec<CommitRecord>,
    pub failures: Vec<PrFetchFailure>,
}

/// Fans commit fetches out across a bounded worker pool, one retrying task
/// per PR. Individual failures are collected, never fatal to the batch.
#[derive(Clone)]
pub struct CommitAggregator {
    client: Arc<dyn GithubApi>,
    cache: Arc<dyn ResultCache>,
    sanitizer: Arc<dyn ResponseSanitizer>,
    config: GithubConfig,
}

impl CommitAggregator {
    pub fn new(
        client: Arc<dyn GithubApi>,
        cache: Arc<dyn ResultCache>,
        sanitizer: Arc<dyn ResponseSanitizer>,
        config: GithubConfig,
    ) -> Self {
        Self {
            client,
            cache,
            sanitizer,
            config,
        }
    }

    /// Fetch commits for every PR in the set. Order of the returned commits
    /// is not significant.
    pub async fn aggregate(
        &self,
        owner: &str,
        repo: &str,
        prs: &[MergedPullRequest],
        progress: Option<UnboundedSender<ProgressEvent>>,
    ) -> CommitReport {
        let mut report = CommitReport::default();
        if prs.is_empty() {
            return report;
        }

        emit(&progress, ProgressEvent::Started { total: prs.len() });

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_workers.max(1)));
        let mut tasks = JoinSet::new();

        for pr in prs.iter().cloned() {
            let aggregator = self.clone();
            let semaphore = Arc::clone(&semaphore);
            let owner = owner.to_string();
            let repo = repo.to_string();

            tasks.spawn(async move {
                // The semaphore is never closed while tasks hold it.
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("worker semaphore closed");
                let result = aggregator.fetch_pr_commits_cached(&owner, &repo, &pr).await;
                (pr, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((pr, Ok(commits))) => {
                    emit(
                        &progress,
                        ProgressEvent::PrFetched {
                            pr_number: pr.number,
                            commits: commits.len(),
                        },
                    );
                    report.commits.extend(commits);
                }
                Ok((pr, Err(e))) => {
                    warn!(pr_number = pr.number, error = %e, "failed to fetch commits for PR");
                    emit(&progress, ProgressEvent::PrFailed { pr_number: pr.number });
                    report.failures.push(PrFetchFailure {
                        pr_number: pr.number,
                        error: e,
                    });
                }
                Err(join_error) => {
                    error!(error = %join_error, "commit fetch task aborted");
                }
            }
        }

        report
    }

    /// Commit fetch for one PR: cache check, then a retried network fetch
    /// with write-through on success.
    async fn fetch_pr_commits_cached(
        &self,
        owner: &str,
        repo: &str,
        pr: &MergedPullRequest,
    ) -> Result<Vec<CommitRecord>> {
        let key = cache::commit_query_key(pr.number, owner, repo);
        if let Some(cached) = cache::get_cached::<Vec<Value>>(&*self.cache, &key) {
            return Ok(self.to_records(cached, pr));
        }

        let pr_number = pr.number;
        let payloads = retry::with_backoff(
            self.config.max_retries,
            self.config.rate_limit_delay(),
            || self.fetch_pr_commits(owner, repo, pr_number),
        )
        .await?;

        cache::put_cached(&*self.cache, &key, &payloads);
        Ok(self.to_records(payloads, pr))
    }

    /// One network attempt: fetch and sanitize the PR's commit list. The
    /// worker pool already bounds concurrency, so the client-side delay is
    /// skipped.
    async fn fetch_pr_commits(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
    ) -> Result<Vec<Value>> {
        let endpoint = format!("pulls/{pr_number}/commits");
        let body = self.client.call(&endpoint, owner, repo, &[], false).await?;
        let body = self.sanitizer.sanitize_response(body);

        match body {
            Value::Array(items) => Ok(items),
            other => Err(Error::Payload(format!(
                "expected a commit list for PR #{pr_number}, got {other}"
            ))),
        }
    }

    /// Convert raw commit entries into typed records attributed to their PR.
    /// Malformed entries and merge commits are dropped; every surviving
    /// message passes through the sanitizer.
    fn to_records(&self, payloads: Vec<Value>, pr: &MergedPullRequest) -> Vec<CommitRecord> {
        payloads
            .into_iter()
            .filter_map(|raw| serde_json::from_value::<CommitPayload>(raw).ok())
            .filter(|payload| !payload.commit.message.starts_with(MERGE_COMMIT_PREFIX))
            .map(|payload| CommitRecord {
                sha: payload.sha,
                message: self.sanitizer.sanitize_message(&payload.commit.message),
                pr_number: pr.number,
                pr_title: pr.title.clone(),
            })
            .collect()
    }
}

fn emit(progress: &Option<UnboundedSender<ProgressEvent>>, event: ProgressEvent) {
    if let Some(sender) = progress {
        // A dropped receiver just means nobody is watching.
        let _ = sender.send(event);
    }
}
