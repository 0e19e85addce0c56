//! Core library for the Resep Nusantara recipe client.
//!
//! - `api`: REST client for reviews and favorites, and the `Transport` seam
//! - `cache`: runtime caching rules and bounded cache stores
//! - `hooks`: fetch lifecycle controllers that views render from
//! - `models`: response envelope and entity types
//! - `pwa`: manifest, precache and service worker configuration
//! - `config`: persisted client configuration

pub mod api;
pub mod cache;
pub mod config;
pub mod hooks;
pub mod models;
pub mod pwa;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use api::{ApiClient, ReqwestTransport, Transport};
use cache::{CachePolicy, CacheStorage, CachingTransport};
use config::Config;

/// An `ApiClient` wired through the runtime cache, plus the storage behind it.
pub struct Connection {
    pub api: ApiClient,
    pub storage: Arc<CacheStorage>,
    cache: Arc<CachingTransport>,
}

impl Connection {
    /// Wait for background cache updates to finish. Call before exiting.
    pub async fn flush(&self) {
        self.cache.settle().await;
    }
}

/// Build a cached API client from configuration.
///
/// With `offline_cache` on, stores are persisted under the cache directory
/// and stores the policy no longer declares are removed. If the directory is
/// unusable the cache falls back to memory.
pub fn connect(config: &Config, policy: CachePolicy) -> Result<Connection> {
    policy.validate().context("Invalid cache policy")?;

    let storage = if config.offline_cache {
        match config.cache_dir().and_then(CacheStorage::persistent) {
            Ok(storage) => {
                match storage.cleanup_outdated(&policy) {
                    Ok(removed) if !removed.is_empty() => debug!(?removed, "Outdated caches removed"),
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, "Failed to clean up outdated caches"),
                }
                storage
            }
            Err(e) => {
                warn!(error = %e, "Cache directory unavailable, caching in memory");
                CacheStorage::in_memory()
            }
        }
    } else {
        CacheStorage::in_memory()
    };
    let storage = Arc::new(storage);

    let network: Arc<dyn Transport> = Arc::new(ReqwestTransport::new(config.request_timeout_secs)?);
    let cache = Arc::new(CachingTransport::new(network, policy, Arc::clone(&storage)));
    let api = ApiClient::with_transport(&config.base_url, Arc::clone(&cache) as Arc<dyn Transport>)?;

    Ok(Connection { api, storage, cache })
}
