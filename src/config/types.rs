use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    pub api_base_url: String,
    /// Items requested per pagination page.
    pub per_page: u32,
    /// Minimum delay between consecutive rate-limited requests, in seconds.
    /// Also the base unit for retry backoff.
    pub rate_limit_delay_secs: f64,
    /// Per-request timeout, in seconds.
    pub request_timeout_secs: u64,
    /// Maximum attempts for a single PR's commit fetch.
    pub max_retries: u32,
    /// Upper bound on concurrently in-flight commit fetches.
    pub max_concurrent_workers: usize,
    /// Upper bound on pagination pages per branch.
    pub max_pages: u32,
    /// TTL for cached PR-set query results, in seconds.
    pub pr_cache_ttl_secs: u64,
    /// TTL for cached per-PR commit lists, in seconds.
    pub commit_cache_ttl_secs: u64,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.github.com".to_string(),
            per_page: 100,
            rate_limit_delay_secs: 1.0,
            request_timeout_secs: 30,
            max_retries: 3,
            max_concurrent_workers: 5,
            max_pages: 10,
            pr_cache_ttl_secs: 1800,
            commit_cache_ttl_secs: 3600,
        }
    }
}

impl GithubConfig {
    pub fn rate_limit_delay(&self) -> Duration {
        Duration::from_secs_f64(self.rate_limit_delay_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn pr_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.pr_cache_ttl_secs)
    }

    pub fn commit_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.commit_cache_ttl_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_base_url: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: Option<u32>,
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.openai.com".to_string(),
            model: "gpt-4o".to_string(),
            temperature: 0.7,
            max_tokens: None,
            timeout_secs: 60,
        }
    }
}

impl OpenAiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub github: GithubConfig,
    pub openai: OpenAiConfig,
}

impl AppConfig {
    /// Parse configuration from TOML. Missing sections and fields fall back
    /// to defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Configuration(e.to_string()))
    }

    /// GitHub token from the `GITHUB_API_KEY` environment variable.
    pub fn github_token(&self) -> Option<String> {
        std::env::var("GITHUB_API_KEY").ok().filter(|t| !t.is_empty())
    }

    /// OpenAI API key from the `OPENAI_API_KEY` environment variable.
    pub fn openai_api_key(&self) -> Option<String> {
        std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty())
    }
}

/// Check a GitHub token against the published token formats: classic
/// personal access, OAuth, user and server tokens, plus fine-grained PATs.
pub fn validate_github_token(token: &str) -> bool {
    if token.is_empty() {
        return false;
    }

    let patterns = [
        r"^ghp_[a-zA-Z0-9]{36}$",
        r"^gho_[a-zA-Z0-9]{36}$",
        r"^ghu_[a-zA-Z0-9]{36}$",
        r"^ghs_[a-zA-Z0-9]{36}$",
        r"^github_pat_[a-zA-Z0-9_]{22,255}$",
    ];

    patterns.iter().any(|pattern| {
        regex::Regex::new(pattern)
            .map(|re| re.is_match(token))
            .unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.github.per_page, 100);
        assert_eq!(config.github.rate_limit_delay_secs, 1.0);
        assert_eq!(config.github.request_timeout_secs, 30);
        assert_eq!(config.github.max_retries, 3);
        assert_eq!(config.github.max_concurrent_workers, 5);
        assert_eq!(config.github.max_pages, 10);
        assert_eq!(config.github.pr_cache_ttl_secs, 1800);
        assert_eq!(config.github.commit_cache_ttl_secs, 3600);
        assert_eq!(config.openai.model, "gpt-4o");
    }

    #[test]
    fn partial_toml_overrides_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [github]
            per_page = 50
            max_retries = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.github.per_page, 50);
        assert_eq!(config.github.max_retries, 5);
        // Untouched fields keep their defaults.
        assert_eq!(config.github.max_concurrent_workers, 5);
        assert_eq!(config.openai.temperature, 0.7);
    }

    #[test]
    fn invalid_toml_is_a_configuration_error() {
        let err = AppConfig::from_toml_str("per_page = ").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn token_validation_accepts_known_formats() {
        assert!(validate_github_token(&format!("ghp_{}", "a".repeat(36))));
        assert!(validate_github_token(&format!("gho_{}", "B".repeat(36))));
        assert!(validate_github_token(&format!(
            "github_pat_{}",
            "x".repeat(30)
        )));
    }

    #[test]
    fn token_validation_rejects_malformed_tokens() {
        assert!(!validate_github_token(""));
        assert!(!validate_github_token("ghp_tooshort"));
        assert!(!validate_github_token("not-a-token"));
    }
}
