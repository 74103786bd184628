//! Fetches merged pull requests and their commits from GitHub over a date
//! range and hands the flattened commit messages to a summarization
//! collaborator that turns them into a changelog.
//!
//! The interesting part is the fetch-and-aggregation pipeline: paginated,
//! rate-limited retrieval of PRs per branch, first-occurrence deduplication
//! across branches, concurrent per-PR commit fetches with bounded retry, and
//! TTL caching of intermediate results so repeated queries stay cheap.
//!
//! ```no_run
//! use std::sync::Arc;
//! use changelog_aggregator::{
//!     AppConfig, ChangelogPipeline, ChangelogRequest, GithubClient, OpenAiSummarizer,
//! };
//!
//! # async fn run() -> changelog_aggregator::Result<()> {
//! let config = AppConfig::default();
//! let token = config.github_token().expect("GITHUB_API_KEY not set");
//! let api_key = config.openai_api_key().expect("OPENAI_API_KEY not set");
//!
//! let client = Arc::new(GithubClient::new(token, &config.github)?);
//! let summarizer = OpenAiSummarizer::new(api_key, &config.openai)?;
//! let pipeline = ChangelogPipeline::new(client, config);
//!
//! let request = ChangelogRequest {
//!     owner: "octo".to_string(),
//!     repo: "hello".to_string(),
//!     branches: vec!["production".to_string()],
//!     start_date: chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
//!     end_date: chrono::NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
//! };
//!
//! let report = pipeline.generate(&request, &summarizer, None).await?;
//! println!("{}", report.changelog);
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod cache;
pub mod config;
pub mod error;
pub mod github;
pub mod retry;
pub mod sanitize;
pub mod summarizer;

pub use aggregator::{
    ChangelogPipeline, ChangelogReport, ChangelogRequest, CommitAggregator, CommitReport,
    ProgressEvent, PullRequestFetcher,
};
pub use cache::{MemoryCache, ResultCache};
pub use config::{AppConfig, GithubConfig, OpenAiConfig};
pub use error::{Error, Result};
pub use github::{CommitRecord, GithubApi, GithubClient, MergedPullRequest};
pub use sanitize::{AllowListSanitizer, ResponseSanitizer};
pub use summarizer::{OpenAiSummarizer, Summarizer, SummaryRequest};
