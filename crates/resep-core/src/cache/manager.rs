use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::api::HttpResponse;

use super::policy::{CachePolicy, CacheRule};
use super::store::{CacheStore, StoreSnapshot};

/// The set of named cache stores.
///
/// Stores are opened lazily the first time a rule touches them. With a cache
/// directory, each store is persisted as `<cache_name>.json` after every write
/// and reloaded on open, so cached responses survive a restart.
///
/// Files are written after the store lock is released. Every snapshot carries
/// a revision taken under that lock, and a write is skipped when a newer
/// revision of the same store has already reached disk.
pub struct CacheStorage {
    cache_dir: Option<PathBuf>,
    stores: Mutex<HashMap<String, CacheStore>>,
    revision: AtomicU64,
    /// Last revision written per store file
    written: Mutex<HashMap<String, u64>>,
}

impl CacheStorage {
    fn with_dir(cache_dir: Option<PathBuf>) -> Self {
        Self {
            cache_dir,
            stores: Mutex::new(HashMap::new()),
            revision: AtomicU64::new(0),
            written: Mutex::new(HashMap::new()),
        }
    }

    pub fn in_memory() -> Self {
        Self::with_dir(None)
    }

    pub fn persistent(cache_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&cache_dir)
            .with_context(|| format!("Failed to create cache directory: {}", cache_dir.display()))?;
        Ok(Self::with_dir(Some(cache_dir)))
    }

    pub fn cache_dir(&self) -> Option<&Path> {
        self.cache_dir.as_deref()
    }

    fn cache_path(dir: &Path, name: &str) -> PathBuf {
        dir.join(format!("{}.json", name))
    }

    async fn load(dir: &Path, name: &str) -> Result<Option<StoreSnapshot>> {
        let path = Self::cache_path(dir, name);
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).with_context(|| format!("Failed to read cache file: {}", name)),
        };

        let snapshot: StoreSnapshot = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse cache file: {}", name))?;

        Ok(Some(snapshot))
    }

    async fn save(dir: &Path, snapshot: &StoreSnapshot) -> Result<()> {
        let path = Self::cache_path(dir, &snapshot.name);
        let contents = serde_json::to_string(snapshot)?;
        tokio::fs::write(&path, contents)
            .await
            .with_context(|| format!("Failed to write cache file: {}", snapshot.name))?;
        Ok(())
    }

    /// Get the store a rule points at, loading it from disk on first use.
    async fn open<'a>(
        &self,
        stores: &'a mut HashMap<String, CacheStore>,
        rule: &CacheRule,
    ) -> &'a mut CacheStore {
        if !stores.contains_key(&rule.cache_name) {
            let store = self.load_store(rule).await;
            stores.insert(rule.cache_name.clone(), store);
        }
        stores
            .entry(rule.cache_name.clone())
            .or_insert_with(|| CacheStore::for_rule(rule))
    }

    async fn load_store(&self, rule: &CacheRule) -> CacheStore {
        let Some(dir) = self.cache_dir.as_deref() else {
            return CacheStore::for_rule(rule);
        };
        match Self::load(dir, &rule.cache_name).await {
            Ok(Some(snapshot)) => {
                let store = CacheStore::restore(snapshot, rule);
                debug!(cache = %rule.cache_name, entries = store.len(), "Cache loaded from disk");
                store
            }
            Ok(None) => CacheStore::for_rule(rule),
            Err(e) => {
                warn!(cache = %rule.cache_name, error = %e, "Failed to load cache, starting empty");
                CacheStore::for_rule(rule)
            }
        }
    }

    /// Snapshot a store for writing. Call with the store lock held.
    fn stage(&self, store: &CacheStore) -> Option<(StoreSnapshot, u64)> {
        if self.cache_dir.is_none() {
            return None;
        }
        let revision = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
        Some((store.snapshot(), revision))
    }

    async fn persist(&self, snapshot: StoreSnapshot, revision: u64) -> Result<()> {
        let Some(dir) = self.cache_dir.as_deref() else {
            return Ok(());
        };
        let mut written = self.written.lock().await;
        let last = written.entry(snapshot.name.clone()).or_insert(0);
        if *last > revision {
            debug!(cache = %snapshot.name, revision, "Newer cache already on disk, skipping write");
            return Ok(());
        }
        Self::save(dir, &snapshot).await?;
        *last = revision;
        Ok(())
    }

    /// Cached response for `url` in the rule's store, if present and not expired.
    pub async fn lookup(&self, rule: &CacheRule, url: &str) -> Option<HttpResponse> {
        let mut stores = self.stores.lock().await;
        let store = self.open(&mut stores, rule).await;
        let hit = store.lookup(url).map(|cached| cached.data);
        debug!(cache = %rule.cache_name, url, hit = hit.is_some(), "Cache lookup");
        hit
    }

    /// Store a response in the rule's store. Statuses the rule does not accept are ignored.
    /// Returns whether the response was stored.
    pub async fn store(&self, rule: &CacheRule, url: &str, response: &HttpResponse) -> bool {
        if !rule.is_cacheable(response.status) {
            debug!(cache = %rule.cache_name, url, status = response.status, "Response not cacheable");
            return false;
        }

        let staged = {
            let mut stores = self.stores.lock().await;
            let store = self.open(&mut stores, rule).await;
            store.put(url, response.clone());
            self.stage(store)
        };

        if let Some((snapshot, revision)) = staged {
            if let Err(e) = self.persist(snapshot, revision).await {
                warn!(cache = %rule.cache_name, error = %e, "Failed to persist cache");
            }
        }
        true
    }

    /// Drop the cached response for `url` from the rule's store.
    /// Returns whether there was one.
    pub async fn invalidate(&self, rule: &CacheRule, url: &str) -> bool {
        let staged = {
            let mut stores = self.stores.lock().await;
            let store = self.open(&mut stores, rule).await;
            if !store.remove(url) {
                return false;
            }
            self.stage(store)
        };

        debug!(cache = %rule.cache_name, url, "Cached response invalidated");
        if let Some((snapshot, revision)) = staged {
            if let Err(e) = self.persist(snapshot, revision).await {
                warn!(cache = %rule.cache_name, error = %e, "Failed to persist cache");
            }
        }
        true
    }

    /// Number of live entries in a store that has been opened.
    pub async fn len(&self, cache_name: &str) -> usize {
        let stores = self.stores.lock().await;
        stores.get(cache_name).map(CacheStore::len).unwrap_or(0)
    }

    /// Entry counts and last write age for every store the policy declares.
    pub async fn summaries(&self, policy: &CachePolicy) -> Vec<StoreSummary> {
        let mut stores = self.stores.lock().await;
        let mut summaries: Vec<StoreSummary> = Vec::new();
        for rule in policy.rules() {
            if summaries.iter().any(|s| s.name == rule.cache_name) {
                continue;
            }
            let store = self.open(&mut stores, rule).await;
            summaries.push(StoreSummary {
                name: rule.cache_name.clone(),
                entries: store.len(),
                last_updated: store.newest().map(|cached| cached.age_display()),
            });
        }
        summaries
    }

    /// Empty every store the policy declares, in memory and on disk.
    pub async fn clear(&self, policy: &CachePolicy) -> Result<()> {
        let staged: Vec<(StoreSnapshot, u64)> = {
            let mut stores = self.stores.lock().await;
            let mut seen = HashSet::new();
            let mut staged = Vec::new();
            for rule in policy.rules() {
                if !seen.insert(rule.cache_name.as_str()) {
                    continue;
                }
                let store = self.open(&mut stores, rule).await;
                store.clear();
                staged.extend(self.stage(store));
            }
            staged
        };

        for (snapshot, revision) in staged {
            self.persist(snapshot, revision).await?;
        }
        info!("Cache cleared");
        Ok(())
    }

    /// Delete persisted stores the policy no longer declares.
    /// Returns the names of the removed stores.
    pub fn cleanup_outdated(&self, policy: &CachePolicy) -> Result<Vec<String>> {
        let Some(ref dir) = self.cache_dir else {
            return Ok(Vec::new());
        };

        let mut removed = Vec::new();
        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read cache directory: {}", dir.display()))?;
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if policy.cache_names().any(|declared| declared == name) {
                continue;
            }
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove outdated cache: {}", name))?;
            info!(cache = name, "Removed outdated cache");
            removed.push(name.to_string());
        }
        removed.sort();
        Ok(removed)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoreSummary {
    pub name: String,
    pub entries: usize,
    pub last_updated: Option<String>,
}

impl StoreSummary {
    pub fn last_updated_display(&self) -> &str {
        self.last_updated.as_deref().unwrap_or("never")
    }
}
