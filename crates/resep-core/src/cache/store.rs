use std::num::NonZeroUsize;
use std::time::Duration;

use chrono::{DateTime, Utc};
use lru::LruCache;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::HttpResponse;

use super::policy::CacheRule;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self::at(data, Utc::now())
    }

    pub fn at(data: T, cached_at: DateTime<Utc>) -> Self {
        Self { data, cached_at }
    }

    pub fn age_minutes(&self) -> i64 {
        let now = Utc::now();
        (now - self.cached_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Also covers clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            let remaining_mins = minutes % 60;
            if remaining_mins >= 30 {
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            let remaining_hours = (minutes % 1440) / 60;
            if remaining_hours >= 12 {
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }

    /// Whether the entry is older than `max_age` at `now`. No bound means never expired.
    pub fn is_expired_at(&self, max_age: Option<Duration>, now: DateTime<Utc>) -> bool {
        match max_age.and_then(|age| chrono::Duration::from_std(age).ok()) {
            Some(max_age) => now - self.cached_at > max_age,
            None => false,
        }
    }
}

/// One cached response, as written to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub url: String,
    pub response: CachedData<HttpResponse>,
}

/// Persisted form of a `CacheStore`, entries oldest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub name: String,
    pub entries: Vec<CacheEntry>,
}

type Entries = LruCache<String, CachedData<HttpResponse>>;

fn bounded(max_entries: Option<usize>) -> Entries {
    match max_entries.and_then(NonZeroUsize::new) {
        Some(cap) => LruCache::new(cap),
        None => LruCache::unbounded(),
    }
}

/// One named cache store, keyed by request URL.
///
/// Recency is write order: `put` moves an entry to the newest position and
/// lookups only peek, so reading an entry never saves it from eviction. The
/// entry count never exceeds `max_entries`. Entries older than `max_age` are
/// never served and are dropped when found or on the next insert.
pub struct CacheStore {
    name: String,
    max_age: Option<Duration>,
    entries: Entries,
}

impl CacheStore {
    pub fn new(name: impl Into<String>, max_entries: Option<usize>, max_age: Option<Duration>) -> Self {
        Self {
            name: name.into(),
            max_age,
            entries: bounded(max_entries),
        }
    }

    pub fn for_rule(rule: &CacheRule) -> Self {
        Self::new(rule.cache_name.clone(), rule.max_entries, rule.max_age())
    }

    /// Rebuild a persisted store under the rule's current bounds.
    pub fn restore(snapshot: StoreSnapshot, rule: &CacheRule) -> Self {
        let mut store = Self::for_rule(rule);
        let now = Utc::now();
        for entry in snapshot.entries {
            if !entry.response.is_expired_at(store.max_age, now) {
                store.insert(entry.url, entry.response);
            }
        }
        store
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            name: self.name.clone(),
            entries: self
                .entries
                .iter()
                .rev()
                .map(|(url, response)| CacheEntry {
                    url: url.clone(),
                    response: response.clone(),
                })
                .collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// URLs oldest first
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().rev().map(|(url, _)| url.as_str())
    }

    /// Most recently stored entry, if any
    pub fn newest(&self) -> Option<&CachedData<HttpResponse>> {
        self.entries.iter().next().map(|(_, cached)| cached)
    }

    pub fn lookup(&mut self, url: &str) -> Option<CachedData<HttpResponse>> {
        self.lookup_at(url, Utc::now())
    }

    pub fn lookup_at(&mut self, url: &str, now: DateTime<Utc>) -> Option<CachedData<HttpResponse>> {
        if self.entries.peek(url)?.is_expired_at(self.max_age, now) {
            debug!(cache = %self.name, url, "Cached entry expired");
            self.entries.pop(url);
            return None;
        }
        self.entries.peek(url).cloned()
    }

    pub fn put(&mut self, url: &str, response: HttpResponse) {
        self.put_at(url, response, Utc::now());
    }

    /// Store a response. An existing entry for the same URL is replaced and
    /// becomes the newest, so it is evicted last.
    pub fn put_at(&mut self, url: &str, response: HttpResponse, now: DateTime<Utc>) {
        self.purge_expired(now);
        self.insert(url.to_string(), CachedData::at(response, now));
    }

    pub fn remove(&mut self, url: &str) -> bool {
        self.entries.pop(url).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn insert(&mut self, url: String, cached: CachedData<HttpResponse>) {
        // `push` hands back either the replaced value for the same key or the evicted oldest entry
        if let Some((evicted, _)) = self.entries.push(url, cached) {
            if !self.entries.contains(&evicted) {
                debug!(cache = %self.name, url = %evicted, "Evicted oldest entry");
            }
        }
    }

    fn purge_expired(&mut self, now: DateTime<Utc>) {
        if self.max_age.is_none() {
            return;
        }
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, cached)| cached.is_expired_at(self.max_age, now))
            .map(|(url, _)| url.clone())
            .collect();
        for url in &expired {
            self.entries.pop(url);
        }
        if !expired.is_empty() {
            debug!(cache = %self.name, purged = expired.len(), "Purged expired entries");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
