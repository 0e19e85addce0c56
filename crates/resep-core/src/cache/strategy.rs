//! Strategy execution: the part of the cache layer that actually intercepts requests.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, warn};
use url::Url;

use crate::api::{ApiError, HttpRequest, HttpResponse, Method, Transport};

use super::manager::CacheStorage;
use super::policy::{CachePolicy, CacheRule, CacheStrategy};

/// A `Transport` that applies a `CachePolicy` in front of another transport.
///
/// Only `GET` requests are served from cache. Requests no rule matches go
/// straight to the inner transport. A successful request with another method
/// drops the cached response for its URL, so a list read after a create is
/// fetched again.
///
/// Cache updates that outlive the request (revalidation, a network answer
/// that arrives after the timeout) run as background tasks. Call `settle`
/// before shutting the runtime down so they reach the store.
#[derive(Clone)]
pub struct CachingTransport {
    inner: Arc<dyn Transport>,
    policy: Arc<CachePolicy>,
    storage: Arc<CacheStorage>,
    background: Arc<Mutex<JoinSet<()>>>,
}

impl CachingTransport {
    pub fn new(inner: Arc<dyn Transport>, policy: CachePolicy, storage: Arc<CacheStorage>) -> Self {
        Self {
            inner,
            policy: Arc::new(policy),
            storage,
            background: Arc::new(Mutex::new(JoinSet::new())),
        }
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    pub fn storage(&self) -> &Arc<CacheStorage> {
        &self.storage
    }

    /// Wait for every background cache update, including ones started while waiting.
    pub async fn settle(&self) {
        loop {
            let mut tasks = std::mem::take(&mut *self.background.lock().await);
            if tasks.is_empty() {
                return;
            }
            debug!(pending = tasks.len(), "Waiting for background cache updates");
            while let Some(result) = tasks.join_next().await {
                if let Err(e) = result {
                    warn!(error = %e, "Background cache update failed");
                }
            }
        }
    }

    async fn spawn_background<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.background.lock().await;
        // Reap finished tasks so the set only holds pending ones
        while let Some(Some(result)) = tasks.join_next().now_or_never() {
            if let Err(e) = result {
                warn!(error = %e, "Background cache update failed");
            }
        }
        tasks.spawn(task);
    }

    /// A request future that owns everything it needs, so it can move to a background task.
    fn network(&self, request: &HttpRequest) -> impl Future<Output = Result<HttpResponse, ApiError>> + Send + 'static {
        let inner = Arc::clone(&self.inner);
        let request = request.clone();
        async move { inner.send(&request).await }
    }

    /// Serve from cache when possible and refresh the entry in the background.
    /// Without a usable cached entry, wait for the network.
    async fn stale_while_revalidate(
        &self,
        rule: &CacheRule,
        request: &HttpRequest,
    ) -> Result<HttpResponse, ApiError> {
        if let Some(cached) = self.storage.lookup(rule, &request.url).await {
            debug!(cache = %rule.cache_name, url = %request.url, "Serving cached response, revalidating");
            let network = self.network(request);
            let storage = Arc::clone(&self.storage);
            let rule = rule.clone();
            let url = request.url.clone();
            self.spawn_background(async move {
                match network.await {
                    Ok(fresh) => {
                        storage.store(&rule, &url, &fresh).await;
                    }
                    Err(e) => {
                        debug!(url = %url, error = %e, "Background revalidation failed");
                    }
                }
            })
            .await;
            return Ok(cached);
        }

        let response = self.inner.send(request).await?;
        self.storage.store(rule, &request.url, &response).await;
        Ok(response)
    }

    /// Prefer the network. After the rule's timeout, answer from cache if an
    /// entry exists and otherwise keep waiting for the network. A request cut
    /// short by the timeout keeps running in the background and still updates
    /// the cache. A transport error falls back to cache too. Error statuses
    /// are network answers, not failures, and are returned as-is.
    async fn network_first(
        &self,
        rule: &CacheRule,
        request: &HttpRequest,
    ) -> Result<HttpResponse, ApiError> {
        let mut network = Box::pin(self.network(request));

        let outcome = match rule.network_timeout() {
            Some(timeout) => match tokio::time::timeout(timeout, &mut network).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    if let Some(cached) = self.storage.lookup(rule, &request.url).await {
                        warn!(cache = %rule.cache_name, url = %request.url, "Network timed out, serving cached response");
                        let storage = Arc::clone(&self.storage);
                        let rule = rule.clone();
                        let url = request.url.clone();
                        self.spawn_background(async move {
                            if let Ok(late) = network.await {
                                storage.store(&rule, &url, &late).await;
                            }
                        })
                        .await;
                        return Ok(cached);
                    }
                    debug!(url = %request.url, "Network timed out with nothing cached, still waiting");
                    network.await
                }
            },
            None => network.await,
        };

        match outcome {
            Ok(response) => {
                self.storage.store(rule, &request.url, &response).await;
                Ok(response)
            }
            Err(e) => match self.storage.lookup(rule, &request.url).await {
                Some(cached) => {
                    warn!(cache = %rule.cache_name, url = %request.url, error = %e, "Network failed, serving cached response");
                    Ok(cached)
                }
                None => Err(e),
            },
        }
    }
}

#[async_trait]
impl Transport for CachingTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let url = Url::parse(&request.url)
            .map_err(|e| ApiError::InvalidRequest(format!("Invalid URL {}: {}", request.url, e)))?;
        let Some(rule) = self.policy.match_url(&url) else {
            return self.inner.send(request).await;
        };

        if request.method != Method::Get {
            let response = self.inner.send(request).await?;
            if response.is_success() {
                self.storage.invalidate(rule, &request.url).await;
            }
            return Ok(response);
        }

        match rule.handler {
            CacheStrategy::StaleWhileRevalidate => self.stale_while_revalidate(rule, request).await,
            CacheStrategy::NetworkFirst => self.network_first(rule, request).await,
        }
    }
}
