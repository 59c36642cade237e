//! Key/TTL cache for computed pages and counters.
//!
//! Values are stored as JSON so any serializable type can go in.
//! Expired entries read as misses and are dropped on the next touch.

use globset::Glob;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

struct Entry {
    value: serde_json::Value,
    expires_at: Instant,
}

#[derive(Clone)]
pub struct Cache {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
    default_ttl: Duration,
}

impl Cache {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            default_ttl,
        }
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut entries = self.entries.lock().ok()?;
        let expired = match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                return serde_json::from_value(entry.value.clone()).ok();
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.remove(key);
        }
        None
    }

    pub fn put<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) {
        let value = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("Not caching {}: {}", key, e);
                return;
            }
        };
        let expires_at = Instant::now() + ttl.unwrap_or(self.default_ttl);
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), Entry { value, expires_at });
        }
    }

    /// Return the cached value or compute, store and return it.
    /// Errors from `compute` are passed through and nothing is cached.
    pub fn remember<T, E, F>(&self, key: &str, ttl: Option<Duration>, compute: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(hit) = self.get(key) {
            log::debug!("cache hit {}", key);
            return Ok(hit);
        }
        let value = compute()?;
        self.put(key, &value, ttl);
        Ok(value)
    }

    pub fn forget(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }

    /// Drop every key matching a glob such as `user:42:*`.
    /// Returns the number of keys removed.
    pub fn forget_pattern(&self, pattern: &str) -> usize {
        let matcher = match Glob::new(pattern) {
            Ok(glob) => glob.compile_matcher(),
            Err(e) => {
                log::warn!("Bad cache pattern {}: {}", pattern, e);
                return 0;
            }
        };
        let Ok(mut entries) = self.entries.lock() else {
            return 0;
        };
        let before = entries.len();
        entries.retain(|key, _| !matcher.is_match(key));
        before - entries.len()
    }

    pub fn flush(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// Key builders. Every cached key for a user or list shares the prefix so
// `forget_pattern` can sweep them together.

pub fn user_stats_key(user_id: &str) -> String {
    format!("user:{}:stats", user_id)
}

pub fn user_pattern(user_id: &str) -> String {
    format!("user:{}:*", user_id)
}

pub fn public_list_key(list_id: &str) -> String {
    format!("list:{}:public", list_id)
}

pub fn list_pattern(list_id: &str) -> String {
    format!("list:{}:*", list_id)
}
