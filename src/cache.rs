//! Route-level TTL cache for serialized success envelopes.
//!
//! Keys are request path plus query string. The lock is only held for map
//! operations, never across an await.

use crate::config::CacheConfig;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

/// Which TTL a cached response gets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKind {
    List,
    Search,
    Detail,
    Chapter,
    Featured,
}

struct CacheEntry {
    body: String,
    expires_at: Instant,
}

pub struct ResponseCache {
    config: CacheConfig,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl ResponseCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Cache key for a request
    pub fn key(path: &str, query: &str) -> String {
        if query.is_empty() {
            path.to_string()
        } else {
            format!("{}?{}", path, query)
        }
    }

    pub fn ttl(&self, kind: CacheKind) -> Duration {
        let secs = match kind {
            CacheKind::List => self.config.list_ttl_secs,
            CacheKind::Search => self.config.search_ttl_secs,
            CacheKind::Detail => self.config.detail_ttl_secs,
            CacheKind::Chapter => self.config.chapter_ttl_secs,
            CacheKind::Featured => self.config.featured_ttl_secs,
        };
        Duration::from_secs(secs)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, key: &str) -> Option<String> {
        if !self.config.enabled {
            return None;
        }
        let mut entries = self.lock();
        match entries.get(key) {
            Some(e) if e.expires_at > Instant::now() => Some(e.body.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: String, body: String, kind: CacheKind) {
        self.insert_with_ttl(key, body, self.ttl(kind));
    }

    pub fn insert_with_ttl(&self, key: String, body: String, ttl: Duration) {
        if !self.config.enabled || self.config.capacity == 0 || ttl.is_zero() {
            return;
        }
        let now = Instant::now();
        let mut entries = self.lock();
        entries.retain(|_, e| e.expires_at > now);
        if entries.len() >= self.config.capacity && !entries.contains_key(&key) {
            let soonest = entries
                .iter()
                .min_by_key(|(_, e)| e.expires_at)
                .map(|(k, _)| k.clone());
            if let Some(k) = soonest {
                entries.remove(&k);
            }
        }
        entries.insert(
            key,
            CacheEntry {
                body,
                expires_at: now + ttl,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}
