pub mod types;

pub use types::{validate_github_token, AppConfig, GithubConfig, OpenAiConfig};
