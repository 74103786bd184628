//! TTL-aware result caching.
//!
//! The cache is strictly an optimization: a miss (including an expired or
//! corrupt entry) never changes correctness, only cost. Keys are stable
//! hashes of the logical query so identical queries within the TTL window
//! skip the network entirely.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Key-value store with per-store TTL semantics. `get` must treat an expired
/// entry identically to a miss and must never fail.
pub trait ResultCache: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    fn put(&self, key: &str, value: Value);
}

struct CacheEntry {
    value: Value,
    created_at: Instant,
}

/// In-memory [`ResultCache`] with lazy eviction: expired entries are removed
/// on the next lookup rather than by a background sweeper.
pub struct MemoryCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl ResultCache for MemoryCache {
    fn get(&self, key: &str) -> Option<Value> {
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };

        match entries.get(key) {
            Some(entry) if entry.created_at.elapsed() < self.ttl => {
                debug!(key, "cache hit");
                Some(entry.value.clone())
            }
            Some(_) => {
                debug!(key, "cache expired");
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn put(&self, key: &str, value: Value) {
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                created_at: Instant::now(),
            },
        );
    }
}

fn hash_key(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Key for a PR-set query: identity is (owner, repo, branch, date range).
pub fn pr_query_key(
    owner: &str,
    repo: &str,
    branch: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> String {
    hash_key(&format!("{owner}/{repo}/{branch}/{start_date}/{end_date}"))
}

/// Key for a per-PR commit list: identity is (pr number, owner, repo).
pub fn commit_query_key(pr_number: u64, owner: &str, repo: &str) -> String {
    hash_key(&format!("commits/{pr_number}/{owner}/{repo}"))
}

/// Fetch and deserialize a cached value. A corrupt entry is logged and
/// treated as a miss, never an error.
pub fn get_cached<T: DeserializeOwned>(cache: &dyn ResultCache, key: &str) -> Option<T> {
    let value = cache.get(key)?;
    match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            warn!(key, error = %e, "discarding corrupt cache entry");
            None
        }
    }
}

/// Serialize and store a value. A serialization failure is logged and the
/// entry simply not written.
pub fn put_cached<T: Serialize>(cache: &dyn ResultCache, key: &str, value: &T) {
    match serde_json::to_value(value) {
        Ok(encoded) => cache.put(key, encoded),
        Err(e) => warn!(key, error = %e, "failed to serialize value for cache"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn put_then_get_round_trips() {
        let cache = MemoryCache::new(Duration::from_secs(60));
        cache.put("k", json!({"number": 1}));
        assert_eq!(cache.get("k"), Some(json!({"number": 1})));
    }

    #[test]
    fn expired_entries_read_as_absent() {
        let cache = MemoryCache::new(Duration::ZERO);
        cache.put("k", json!(1));
        assert_eq!(cache.get("k"), None);
        // Lazy eviction removed the entry entirely.
        assert!(cache.entries.lock().unwrap().is_empty());
    }

    #[test]
    fn typed_round_trip() {
        let cache = MemoryCache::new(Duration::from_secs(60));
        put_cached(&cache, "prs", &vec![101u64, 102, 103]);
        let decoded: Option<Vec<u64>> = get_cached(&cache, "prs");
        assert_eq!(decoded, Some(vec![101, 102, 103]));
    }

    #[test]
    fn corrupt_entry_is_a_miss_not_an_error() {
        let cache = MemoryCache::new(Duration::from_secs(60));
        cache.put("prs", json!("not a number list"));
        let decoded: Option<Vec<u64>> = get_cached(&cache, "prs");
        assert_eq!(decoded, None);
    }

    #[test]
    fn keys_are_stable_and_query_sensitive() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();

        let a = pr_query_key("octo", "hello", "main", start, end);
        let b = pr_query_key("octo", "hello", "main", start, end);
        let c = pr_query_key("octo", "hello", "production", start, end);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(
            commit_query_key(101, "octo", "hello"),
            commit_query_key(102, "octo", "hello")
        );
    }
}
