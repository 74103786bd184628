//! Changelog summarization collaborator.
//!
//! The pipeline hands the summarizer a flattened commit document and context
//! about the query; it gets back opaque changelog prose. Nothing here
//! inspects or transforms the returned text.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Value};
use tracing::info;

use crate::config::OpenAiConfig;
use crate::error::{Error, Result};

const SYSTEM_PROMPT: &str = "Create a changelog from git commits following these rules:
1. Group changes into sections: Added, Changed, Deprecated, Removed, Fixed, Security
2. Keep entries clear and concise
3. Include PR numbers as links [#123]
4. Focus on user-facing changes. This summary will be made available to external end-users and customers
5. Use active voice
6. Start each entry with a verb (Added, Fixed, etc.)";

/// Everything the summarizer gets to see about one changelog request.
#[derive(Debug, Clone)]
pub struct SummaryRequest<'a> {
    pub commit_text: &'a str,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub owner: &'a str,
    pub repo: &'a str,
    pub repo_description: &'a str,
    pub branches: &'a [String],
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Turn a flattened commit document into changelog prose.
    async fn summarize(&self, request: SummaryRequest<'_>) -> Result<String>;
}

/// Summarizer backed by the OpenAI chat-completions API.
#[derive(Debug)]
pub struct OpenAiSummarizer {
    http: reqwest::Client,
    api_base_url: String,
    api_key: String,
    model: String,
    temperature: f64,
    max_tokens: Option<u32>,
}

impl OpenAiSummarizer {
    pub fn new(api_key: String, config: &OpenAiConfig) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Configuration(
                "OpenAI API key is not available".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    async fn summarize(&self, request: SummaryRequest<'_>) -> Result<String> {
        let user_prompt = format!(
            "Generate a changelog for {}/{} ({})\nTime period: {} to {}\nBranches: {}\n\nCommit messages:\n{}",
            request.owner,
            request.repo,
            request.repo_description,
            request.start_date,
            request.end_date,
            request.branches.join(", "),
            request.commit_text,
        );

        let mut body = json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": user_prompt},
            ],
        });
        if let Some(max_tokens) = self.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }

        info!(model = %self.model, "requesting changelog summary");

        let response = self
            .http
            .post(format!("{}/v1/chat/completions", self.api_base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Summarization(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Summarization(format!(
                "summarization API returned {status}"
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| Error::Summarization(e.to_string()))?;

        payload
            .get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|content| content.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                Error::Summarization("response carried no completion content".to_string())
            })
    }
}
