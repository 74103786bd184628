use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::config::{validate_github_token, GithubConfig};
use crate::error::{Error, Result};
use crate::sanitize::redact_log;

/// Remaining-quota level below which a warning is emitted.
const LOW_QUOTA_THRESHOLD: u64 = 10;

/// Seam between the fetch pipeline and the REST transport. The pipeline
/// depends on this trait so tests can substitute scripted responses.
#[async_trait]
pub trait GithubApi: Send + Sync {
    /// `GET .../repos/{owner}/{repo}/{endpoint}`, returning the JSON body.
    async fn call(
        &self,
        endpoint: &str,
        owner: &str,
        repo: &str,
        params: &[(&str, String)],
        use_rate_limit: bool,
    ) -> Result<Value>;
}

#[async_trait]
impl GithubApi for GithubClient {
    async fn call(
        &self,
        endpoint: &str,
        owner: &str,
        repo: &str,
        params: &[(&str, String)],
        use_rate_limit: bool,
    ) -> Result<Value> {
        GithubClient::call(self, endpoint, owner, repo, params, use_rate_limit).await
    }
}

/// Authenticated GitHub REST client enforcing a minimum delay between
/// consecutive requests. Quota state is read from the `x-ratelimit-*`
/// response headers; exhaustion surfaces as a typed error rather than a
/// spin-retry, since the external rate limit is the pipeline's real
/// backpressure signal.
#[derive(Debug)]
pub struct GithubClient {
    http: reqwest::Client,
    api_base_url: String,
    token: String,
    min_delay: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl GithubClient {
    pub fn new(token: String, config: &GithubConfig) -> Result<Self> {
        if token.is_empty() {
            return Err(Error::Configuration(
                "GitHub token is not available".to_string(),
            ));
        }
        if !validate_github_token(&token) {
            return Err(Error::Configuration(
                "GitHub token does not match a known token format".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            token,
            min_delay: config.rate_limit_delay(),
            last_request: Mutex::new(None),
        })
    }

    /// `GET {api_base}/repos/{owner}/{repo}/{endpoint}` returning the raw
    /// JSON body. With `use_rate_limit` set, waits out the remainder of the
    /// minimum inter-request gap first; the concurrency-bounded commit path
    /// passes `false` to opt out.
    pub async fn call(
        &self,
        endpoint: &str,
        owner: &str,
        repo: &str,
        params: &[(&str, String)],
        use_rate_limit: bool,
    ) -> Result<Value> {
        if use_rate_limit {
            self.enforce_min_delay().await;
        }

        let url = format!("{}/repos/{owner}/{repo}/{endpoint}", self.api_base_url);
        info!(
            "{}",
            redact_log(&format!("GitHub API request: {endpoint} for {owner}/{repo}"))
        );

        let response = self
            .http
            .get(&url)
            .query(params)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .header(ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let remaining = header_u64(&response, "x-ratelimit-remaining");

        // A 403 that reports no remaining quota, including one missing the
        // header entirely, is treated as exhaustion.
        if status == StatusCode::FORBIDDEN && remaining.unwrap_or(0) == 0 {
            let reset = header_u64(&response, "x-ratelimit-reset");
            error!(?reset, "GitHub API rate limit exceeded");
            return Err(Error::RateLimitExceeded { reset });
        }

        if let Some(remaining) = remaining {
            if remaining > 0 && remaining < LOW_QUOTA_THRESHOLD {
                warn!(remaining, "GitHub API rate limit low");
            }
        }

        match status {
            StatusCode::NOT_FOUND => {
                return Err(Error::NotFound {
                    owner: owner.to_string(),
                    repo: repo.to_string(),
                })
            }
            StatusCode::UNAUTHORIZED => return Err(Error::Unauthorized),
            s if s.as_u16() >= 400 => return Err(Error::Api { status: s.as_u16() }),
            _ => {}
        }

        info!(status = status.as_u16(), "GitHub API response");

        response
            .json::<Value>()
            .await
            .map_err(|e| Error::Payload(redact_log(&e.to_string())))
    }

    /// Wait until at least `min_delay` has passed since the previous
    /// rate-limited request on this client instance. Callers queue on the
    /// same mutex, so concurrent rate-limited requests are spaced out rather
    /// than released in a burst.
    async fn enforce_min_delay(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let wait = self.min_delay.saturating_sub(previous.elapsed());
            if !wait.is_zero() {
                tokio::time::sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }
}

fn map_transport_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout
    } else if e.is_connect() {
        Error::ConnectionFailed
    } else {
        Error::Request(redact_log(&e.to_string()))
    }
}

fn header_u64(response: &reqwest::Response, name: &str) -> Option<u64> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}
