use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use crate::cache::{self, ResultCache};
use crate::config::GithubConfig;
use crate::error::{Error, Result};
use crate::github::client::GithubApi;
use crate::github::types::{MergedPullRequest, PullRequestPayload};
use crate::sanitize::ResponseSanitizer;

/// PRs merged on one branch within the requested window, plus the repository
/// description extracted from the first page (best-effort, may be empty).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BranchPullRequests {
    pub pull_requests: Vec<MergedPullRequest>,
    pub repo_description: String,
}

/// Paginates closed PRs for a branch and keeps those merged inside the date
/// range. Results are cached by (owner, repo, branch, date range); failures
/// propagate un-retried, since re-invoking the whole paginated operation is
/// the caller's call.
pub struct PullRequestFetcher {
    client: Arc<dyn GithubApi>,
    cache: Arc<dyn ResultCache>,
    sanitizer: Arc<dyn ResponseSanitizer>,
    config: GithubConfig,
}

impl PullRequestFetcher {
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

    /// Fetch PRs merged into `branch` between `start_date` and `end_date`
    /// inclusive.
    ///
    /// Pages are requested sorted by last-updated descending, so a PR merged
    /// before `start_date` is taken as a signal that everything further back
    /// is out of range and pagination stops early. That is a throughput
    /// heuristic, not a guarantee: a PR merged early but updated recently
    /// sorts ahead of its merge date. `max_pages` bounds the walk either way.
    pub async fn fetch(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<BranchPullRequests> {
        if start_date > end_date {
            return Err(Error::Validation(
                "start date must be on or before end date".to_string(),
            ));
        }

        let key = cache::pr_query_key(owner, repo, branch, start_date, end_date);
        if let Some(cached) = cache::get_cached::<BranchPullRequests>(&*self.cache, &key) {
            return Ok(cached);
        }

        let per_page = self.config.per_page;
        let mut pull_requests = Vec::new();
        let mut repo_description = String::new();

        'pages: for page in 1..=self.config.max_pages {
            let params = [
                ("state", "closed".to_string()),
                ("base", branch.to_string()),
                ("sort", "updated".to_string()),
                ("direction", "desc".to_string()),
                ("per_page", per_page.to_string()),
                ("page", page.to_string()),
            ];

            let body = self.client.call("pulls", owner, repo, &params, true).await?;
            let body = self.sanitizer.sanitize_response(body);

            let items = match body {
                Value::Array(items) => items,
                other => {
                    return Err(Error::Payload(format!(
                        "expected a PR list, got {other}"
                    )))
                }
            };

            if items.is_empty() {
                break;
            }

            if page == 1 {
                repo_description = extract_repo_description(&items[0]);
            }

            let item_count = items.len();
            for item in items {
                let payload: PullRequestPayload = match serde_json::from_value(item) {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!(error = %e, "skipping malformed PR entry");
                        continue;
                    }
                };

                // Unmerged (closed-without-merge) PRs are discarded here.
                let Some(merged_at) = payload.merged_at else {
                    continue;
                };

                let merged_date = merged_at.date_naive();
                if merged_date >= start_date && merged_date <= end_date {
                    pull_requests.push(MergedPullRequest {
                        number: payload.number,
                        title: payload.title.unwrap_or_default(),
                        merged_at,
                        branch: branch.to_string(),
                    });
                } else if merged_date < start_date {
                    info!(page, branch, "early pagination stop: PR merged before start date");
                    break 'pages;
                }
            }

            if item_count < per_page as usize {
                break;
            }
        }

        info!(
            branch,
            count = pull_requests.len(),
            "fetched merged pull requests"
        );

        let result = BranchPullRequests {
            pull_requests,
            repo_description,
        };

        // Empty results are cached too, so repeat empty queries stay cheap.
        cache::put_cached(&*self.cache, &key, &result);
        Ok(result)
    }
}

fn extract_repo_description(item: &Value) -> String {
    item.get("head")
        .and_then(|head| head.get("repo"))
        .and_then(|repo| repo.get("description"))
        .and_then(|description| description.as_str())
        .unwrap_or_default()
        .to_string()
}
