pub mod combine;
pub mod commits;
pub mod messages;
pub mod pipeline;
pub mod pr_fetcher;

pub use combine::combine_pull_requests;
pub use commits::{CommitAggregator, CommitReport, PrFetchFailure, ProgressEvent};
pub use messages::extract_messages;
pub use pipeline::{ChangelogPipeline, ChangelogReport, ChangelogRequest};
pub use pr_fetcher::{BranchPullRequests, PullRequestFetcher};
