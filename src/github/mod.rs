pub mod client;
pub mod types;

pub use client::{GithubApi, GithubClient};
pub use types::{CommitRecord, MergedPullRequest};
