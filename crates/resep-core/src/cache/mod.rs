//! Runtime caching for API requests.
//!
//! This module decides, per request URL, whether an answer comes from the
//! network, from a local cache store, or both:
//!
//! - `CachePolicy` / `CacheRule`: ordered matching rules, first match wins
//! - `CacheStore`: one named, bounded store (entry cap plus optional max age)
//! - `CacheStorage`: the set of stores, optionally persisted to disk for offline use
//! - `CachingTransport`: runs stale-while-revalidate or network-first in front of a `Transport`
//!
//! Recipe endpoints are served stale-while-revalidate from a 100-entry,
//! one-day store. Everything else under `/api/v1/` is network-first with a
//! 10 second timeout and a 50-entry store.

pub mod manager;
pub mod policy;
pub mod store;
pub mod strategy;

pub use manager::{CacheStorage, StoreSummary};
pub use policy::{CachePolicy, CacheRule, CacheStrategy, RoutePattern};
pub use store::{CacheEntry, CacheStore, CachedData, StoreSnapshot};
pub use strategy::CachingTransport;
