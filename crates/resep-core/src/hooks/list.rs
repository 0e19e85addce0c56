use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::api::ApiError;
use crate::models::ResponseEnvelope;

use super::state::{ErrorItemsPolicy, FetchState};

/// One list endpoint, keyed by a string (recipe id, user identifier, ...).
#[async_trait]
pub trait ListSource: Send + Sync {
    type Item: Clone + Send + Sync + 'static;

    /// Short name for logs
    const NAME: &'static str;
    /// Error shown when the backend fails without a message
    const FAILURE_MESSAGE: &'static str;
    /// Error shown when the call itself fails without a usable message
    const FAULT_MESSAGE: &'static str;

    async fn load(&self, key: &str) -> Result<ResponseEnvelope<Vec<Self::Item>>, ApiError>;
}

/// Marks one request as in flight for a state channel.
///
/// If dropped before `finish`, for example because the request future was
/// dropped or timed out, the state's `loading` flag is cleared, provided no
/// newer request has started since.
pub(crate) struct InFlight<'a, T> {
    state: &'a watch::Sender<T>,
    latest: &'a AtomicU64,
    token: u64,
    stop_loading: fn(&mut T) -> bool,
    finished: bool,
}

impl<'a, T> InFlight<'a, T> {
    pub(crate) fn new(
        state: &'a watch::Sender<T>,
        latest: &'a AtomicU64,
        token: u64,
        stop_loading: fn(&mut T) -> bool,
    ) -> Self {
        Self {
            state,
            latest,
            token,
            stop_loading,
            finished: false,
        }
    }

    pub(crate) fn finish(mut self) {
        self.finished = true;
    }
}

impl<T> Drop for InFlight<'_, T> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let (latest, token, stop_loading) = (self.latest, self.token, self.stop_loading);
        let cleared = self
            .state
            .send_if_modified(|state| latest.load(Ordering::SeqCst) == token && stop_loading(state));
        if cleared {
            debug!(token, "Request abandoned, loading cleared");
        }
    }
}

/// Read-by-key lifecycle for one list view.
///
/// Every fetch takes a token from a counter. A fetch writes state only while
/// its token is the latest one issued, so when fetches overlap the one started
/// last wins, whatever order they finish in. Dropping a fetch future cancels
/// it; if it was the latest, `loading` is cleared and the items stay as they were.
pub struct ListController<S: ListSource> {
    source: S,
    key: Option<String>,
    error_policy: ErrorItemsPolicy,
    state: watch::Sender<FetchState<S::Item>>,
    latest: AtomicU64,
}

impl<S: ListSource> ListController<S> {
    pub fn new(source: S, key: Option<String>) -> Self {
        let (state, _) = watch::channel(FetchState::default());
        Self {
            source,
            key,
            error_policy: ErrorItemsPolicy::default(),
            state,
            latest: AtomicU64::new(0),
        }
    }

    pub fn with_error_policy(mut self, error_policy: ErrorItemsPolicy) -> Self {
        self.error_policy = error_policy;
        self
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Snapshot of the current state
    pub fn state(&self) -> FetchState<S::Item> {
        self.state.borrow().clone()
    }

    /// Receiver that observes every state transition
    pub fn subscribe(&self) -> watch::Receiver<FetchState<S::Item>> {
        self.state.subscribe()
    }

    /// Apply `update` only if `token` is still the latest fetch.
    fn apply(&self, token: u64, update: impl FnOnce(&mut FetchState<S::Item>)) -> bool {
        self.state.send_if_modified(|state| {
            if self.latest.load(Ordering::SeqCst) != token {
                debug!(source = S::NAME, token, "Dropping update from superseded fetch");
                return false;
            }
            update(state);
            true
        })
    }

    /// Run the fetch for the captured key and return the resulting state.
    ///
    /// A missing or blank key is not an error: nothing is requested and the
    /// state settles as an empty success.
    pub async fn fetch(&self) -> FetchState<S::Item> {
        let token = self.latest.fetch_add(1, Ordering::SeqCst) + 1;

        let key = self.key.as_deref().map(str::trim).filter(|k| !k.is_empty());
        let Some(key) = key else {
            debug!(source = S::NAME, "No key, skipping fetch");
            self.apply(token, |state| {
                state.items.clear();
                state.error = None;
                state.loading = false;
            });
            return self.state();
        };

        self.apply(token, |state| {
            state.loading = true;
            state.error = None;
        });
        let in_flight = InFlight::new(&self.state, &self.latest, token, |state: &mut FetchState<S::Item>| {
            std::mem::replace(&mut state.loading, false)
        });

        let outcome = self.source.load(key).await;
        let error_policy = self.error_policy;

        self.apply(token, |state| {
            match outcome {
                Ok(envelope) if envelope.is_success() => {
                    state.items = envelope.into_data_or_default();
                    debug!(source = S::NAME, key, count = state.items.len(), "Fetch succeeded");
                }
                Ok(envelope) => {
                    let message = envelope.failure_message(S::FAILURE_MESSAGE);
                    warn!(source = S::NAME, key, error = %message, "Fetch rejected by backend");
                    state.error = Some(message);
                    if error_policy == ErrorItemsPolicy::Clear {
                        state.items.clear();
                    }
                }
                Err(e) => {
                    let message = match e.to_string() {
                        m if m.trim().is_empty() => S::FAULT_MESSAGE.to_string(),
                        m => m,
                    };
                    warn!(source = S::NAME, key, error = %message, "Fetch failed");
                    state.error = Some(message);
                    if error_policy == ErrorItemsPolicy::Clear {
                        state.items.clear();
                    }
                }
            }
            state.loading = false;
        });
        in_flight.finish();

        self.state()
    }

    /// Re-run the fetch with the same key.
    pub async fn refetch(&self) -> FetchState<S::Item> {
        self.fetch().await
    }
}
