//! Response and log sanitization.
//!
//! Every API payload is stripped down to an allow-listed set of fields before
//! it enters the pipeline, and every commit message is scrubbed of PII before
//! it reaches the aggregate output. Log lines pass through [`redact_log`] so
//! tokens and secret-bearing URLs never hit the log stream.

use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;

/// Pure collaborator boundary: cleans raw API data before the pipeline
/// consumes it. The pipeline calls it but does not define its rules.
pub trait ResponseSanitizer: Send + Sync {
    /// Strip a raw API payload down to safe, expected fields.
    fn sanitize_response(&self, value: Value) -> Value;

    /// Scrub a single commit message of PII and secret-shaped content.
    fn sanitize_message(&self, message: &str) -> String;
}

/// Default sanitizer: explicit field allow-list for payloads plus
/// pattern-based scrubbing for message text.
pub struct AllowListSanitizer {
    allowed_fields: HashSet<&'static str>,
    email: Regex,
    ip_address: Regex,
    long_token: Regex,
    url: Regex,
}

/// Fields a PR or commit payload is permitted to carry into the pipeline.
const ALLOWED_FIELDS: &[&str] = &[
    "title",
    "number",
    "merged_at",
    "sha",
    "commit",
    "message",
    "head",
    "repo",
    "description",
    "state",
    "base",
    "created_at",
    "updated_at",
];

impl Default for AllowListSanitizer {
    fn default() -> Self {
        Self {
            allowed_fields: ALLOWED_FIELDS.iter().copied().collect(),
            email: Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap(),
            ip_address: Regex::new(r"\b(?:[0-9]{1,3}\.){3}[0-9]{1,3}\b").unwrap(),
            long_token: Regex::new(r"\b[A-Za-z0-9]{32,}\b").unwrap(),
            url: Regex::new(r#"https?://[^\s<>"]+"#).unwrap(),
        }
    }
}

impl AllowListSanitizer {
    pub fn new() -> Self {
        Self::default()
    }

    fn clean_string(&self, s: &str) -> String {
        s.chars()
            .filter(|c| !matches!(c, '<' | '>' | '"' | '\'' | ';' | '\\'))
            .collect()
    }
}

impl ResponseSanitizer for AllowListSanitizer {
    fn sanitize_response(&self, value: Value) -> Value {
        match value {
            Value::Object(map) => Value::Object(
                map.into_iter()
                    .filter(|(k, _)| self.allowed_fields.contains(k.as_str()))
                    .map(|(k, v)| (k, self.sanitize_response(v)))
                    .collect(),
            ),
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| self.sanitize_response(item))
                    .collect(),
            ),
            Value::String(s) => Value::String(self.clean_string(&s)),
            other => other,
        }
    }

    fn sanitize_message(&self, message: &str) -> String {
        let message = self.email.replace_all(message, "[EMAIL_REMOVED]");
        let message = self.ip_address.replace_all(&message, "[IP_REMOVED]");
        let message = self
            .long_token
            .replace_all(&message, "[POTENTIAL_SECRET_REMOVED]");
        let message = self.url.replace_all(&message, "[URL_REMOVED]");
        message.into_owned()
    }
}

/// Redact sensitive material from a log line before emission: `token=`-style
/// query parameters, bearer authorization headers, and URLs carrying query
/// strings.
pub fn redact_log(line: &str) -> String {
    // Static patterns; compilation cannot fail.
    let secret_param = Regex::new(r"(?i)(token|key|secret)=[^\s&]+").unwrap();
    let bearer = Regex::new(r"(?i)Authorization:\s*Bearer\s+\S+").unwrap();
    let url_with_params = Regex::new(r"https?://\S+\?\S+").unwrap();

    let line = secret_param.replace_all(line, "$1=[REDACTED]");
    let line = bearer.replace_all(&line, "Authorization: Bearer [REDACTED]");
    let line = url_with_params.replace_all(&line, "[URL_WITH_PARAMS_REDACTED]");
    line.into_owned()
}
