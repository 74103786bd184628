use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Caller-supplied arguments are structurally invalid. Raised before any
    /// network call and never retried.
    #[error("validation error: {0}")]
    Validation(String),

    /// GitHub API quota is exhausted. `reset` is the epoch-seconds value from
    /// the `x-ratelimit-reset` header when present.
    #[error("GitHub API rate limit exceeded{}", reset.map(|r| format!(", resets at {r}")).unwrap_or_default())]
    RateLimitExceeded { reset: Option<u64> },

    #[error("GitHub token is invalid or expired")]
    Unauthorized,

    #[error("repository {owner}/{repo} not found or not accessible")]
    NotFound { owner: String, repo: String },

    #[error("GitHub API error: {status}")]
    Api { status: u16 },

    #[error("GitHub API request timed out")]
    Timeout,

    #[error("failed to connect to GitHub API")]
    ConnectionFailed,

    /// Transport-level failure that is neither a timeout nor a refused
    /// connection (e.g. a body decode error mid-stream).
    #[error("GitHub API request failed: {0}")]
    Request(String),

    #[error("unexpected API payload: {0}")]
    Payload(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("no pull requests found in the requested date range")]
    NoPullRequests,

    #[error("no commit messages found in the selected pull requests")]
    NoCommits,

    #[error("summarization failed: {0}")]
    Summarization(String),
}

impl Error {
    /// Whether the commit-fetch path may retry this failure with backoff.
    ///
    /// Quota exhaustion, credential and addressing problems, and caller
    /// mistakes are final; repeating them only burns quota.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Timeout
                | Error::ConnectionFailed
                | Error::Api { .. }
                | Error::Request(_)
                | Error::Payload(_)
        )
    }
}
