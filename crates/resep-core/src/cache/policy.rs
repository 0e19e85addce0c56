//! Runtime caching rules.
//!
//! A `CachePolicy` is an ordered list of `CacheRule`s. Each outgoing request is
//! matched against the rules in order and the first match decides the
//! strategy, the store it lives in and that store's bounds. Overlapping rules
//! are resolved by order, not by how specific the pattern is.

use std::collections::HashSet;
use std::time::Duration;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use url::Url;

// ============================================================================
// Constants
// ============================================================================

/// Path prefix of the recipe endpoints, including `/recipes/{id}/reviews`.
pub const RECIPES_PATH_PREFIX: &str = "/api/v1/recipes";

/// Path prefix of every other API endpoint (favorites, uploads, ...).
pub const API_PATH_PREFIX: &str = "/api/v1/";

pub const RECIPE_CACHE_NAME: &str = "api-resep-cache";
pub const API_CACHE_NAME: &str = "api-lain-cache";

/// Recipe content changes rarely; 100 entries for one day.
const RECIPE_CACHE_MAX_ENTRIES: usize = 100;
const RECIPE_CACHE_MAX_AGE_SECS: u64 = 60 * 60 * 24;

const API_CACHE_MAX_ENTRIES: usize = 50;
const API_NETWORK_TIMEOUT_SECS: u64 = 10;

/// Status 0 is an opaque cross-origin response; 200 is OK.
const CACHEABLE_STATUSES: [u16; 2] = [0, 200];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheStrategy {
    /// Answer from cache when possible and refresh the entry in the background.
    StaleWhileRevalidate,
    /// Prefer the network; fall back to cache on failure or timeout.
    NetworkFirst,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "value")]
pub enum RoutePattern {
    /// Matches when the URL path starts with the given prefix.
    PathPrefix(String),
}

impl RoutePattern {
    pub fn matches(&self, url: &Url) -> bool {
        match self {
            RoutePattern::PathPrefix(prefix) => url.path().starts_with(prefix.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheRule {
    pub url_pattern: RoutePattern,
    pub handler: CacheStrategy,
    pub cache_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_entries: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_timeout_seconds: Option<u64>,
    pub cacheable_statuses: Vec<u16>,
}

impl CacheRule {
    pub fn new(url_pattern: RoutePattern, handler: CacheStrategy, cache_name: impl Into<String>) -> Self {
        Self {
            url_pattern,
            handler,
            cache_name: cache_name.into(),
            max_entries: None,
            max_age_seconds: None,
            network_timeout_seconds: None,
            cacheable_statuses: CACHEABLE_STATUSES.to_vec(),
        }
    }

    pub fn max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }

    pub fn max_age_seconds(mut self, seconds: u64) -> Self {
        self.max_age_seconds = Some(seconds);
        self
    }

    pub fn network_timeout_seconds(mut self, seconds: u64) -> Self {
        self.network_timeout_seconds = Some(seconds);
        self
    }

    pub fn cacheable_statuses(mut self, statuses: &[u16]) -> Self {
        self.cacheable_statuses = statuses.to_vec();
        self
    }

    pub fn matches(&self, url: &Url) -> bool {
        self.url_pattern.matches(url)
    }

    pub fn is_cacheable(&self, status: u16) -> bool {
        self.cacheable_statuses.contains(&status)
    }

    pub fn max_age(&self) -> Option<Duration> {
        self.max_age_seconds.map(Duration::from_secs)
    }

    pub fn network_timeout(&self) -> Option<Duration> {
        self.network_timeout_seconds.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CachePolicy {
    rules: Vec<CacheRule>,
}

impl Default for CachePolicy {
    /// Recipes first (stale-while-revalidate), then the rest of the API (network-first).
    fn default() -> Self {
        Self::new(vec![
            CacheRule::new(
                RoutePattern::PathPrefix(RECIPES_PATH_PREFIX.to_string()),
                CacheStrategy::StaleWhileRevalidate,
                RECIPE_CACHE_NAME,
            )
            .max_entries(RECIPE_CACHE_MAX_ENTRIES)
            .max_age_seconds(RECIPE_CACHE_MAX_AGE_SECS),
            CacheRule::new(
                RoutePattern::PathPrefix(API_PATH_PREFIX.to_string()),
                CacheStrategy::NetworkFirst,
                API_CACHE_NAME,
            )
            .network_timeout_seconds(API_NETWORK_TIMEOUT_SECS)
            .max_entries(API_CACHE_MAX_ENTRIES),
        ])
    }
}

impl CachePolicy {
    pub fn new(rules: Vec<CacheRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[CacheRule] {
        &self.rules
    }

    /// First rule whose pattern matches the URL.
    pub fn match_url(&self, url: &Url) -> Option<&CacheRule> {
        self.rules.iter().find(|rule| rule.matches(url))
    }

    /// Same as `match_url`, for a URL that has not been parsed yet.
    /// Unparseable URLs never match.
    pub fn match_str(&self, url: &str) -> Option<&CacheRule> {
        Url::parse(url).ok().and_then(|url| self.match_url(&url))
    }

    pub fn cache_names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|rule| rule.cache_name.as_str())
    }

    /// Reject rule sets the cache layer cannot honor.
    ///
    /// Two rules may share a store only if they agree on its bounds, since a
    /// store has exactly one entry cap and one age limit.
    pub fn validate(&self) -> Result<()> {
        let mut seen: HashSet<&str> = HashSet::new();
        for rule in &self.rules {
            if rule.cache_name.is_empty() {
                bail!("Cache rule has an empty cache name");
            }
            if rule.max_entries == Some(0) {
                bail!("Cache '{}' must allow at least one entry", rule.cache_name);
            }
            if rule.network_timeout_seconds.is_some() && rule.handler != CacheStrategy::NetworkFirst {
                bail!(
                    "Cache '{}': a network timeout only applies to the NetworkFirst handler",
                    rule.cache_name
                );
            }
            if rule.cacheable_statuses.is_empty() {
                bail!("Cache '{}' accepts no response statuses", rule.cache_name);
            }
            if !seen.insert(rule.cache_name.as_str()) {
                let first = self
                    .rules
                    .iter()
                    .find(|r| r.cache_name == rule.cache_name)
                    .filter(|r| r.max_entries == rule.max_entries && r.max_age_seconds == rule.max_age_seconds);
                if first.is_none() {
                    bail!("Cache '{}' is declared twice with different bounds", rule.cache_name);
                }
            }
        }
        Ok(())
    }
}
