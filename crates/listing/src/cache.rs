//! Per-signature query cache.
//!
//! Each entry remembers the last data fetched for its key, when it was
//! fetched, the last error, and whether a fetch is in flight. Data is never
//! evicted on staleness: a stale entry stays displayable while it is being
//! refreshed, and is replaced wholesale when the refresh lands.

use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use moka::ops::compute::Op;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::CatalogError;

/// Cache key for one server-mode page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageKey {
    pub page: u32,
    pub limit: u32,
    /// Trimmed search term, empty for no search.
    pub search: String,
}

/// Fixed key of the full catalog snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AllProductsKey;

/// Fixed key of the category list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CategoriesKey;

/// When [`QueryCache::begin_fetch`] may claim an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    /// Only entries without data or past their freshness window.
    ///
    /// An errored entry counts as fresh for one window from its failure.
    IfStale,
    /// Like `IfStale`, but errored and incomplete entries are retried at once.
    /// Used when a key becomes active again.
    RetryErrors,
    /// Always, unless a fetch is already in flight.
    Force,
}

#[derive(Debug, Clone)]
struct QueryEntry<V> {
    data: Option<V>,
    fetched_at: Option<Instant>,
    error: Option<Arc<CatalogError>>,
    errored_at: Option<Instant>,
    /// Data was stored without the full result behind it.
    incomplete: bool,
    fetching: bool,
    /// Invalidated while in flight; the landing result is stored stale.
    invalidated: bool,
}

impl<V> Default for QueryEntry<V> {
    fn default() -> Self {
        Self {
            data: None,
            fetched_at: None,
            error: None,
            errored_at: None,
            incomplete: false,
            fetching: false,
            invalidated: false,
        }
    }
}

fn expired(at: Option<Instant>, window: Option<Duration>) -> bool {
    match (at, window) {
        (None, _) => true,
        (Some(_), None) => false,
        (Some(at), Some(window)) => at.elapsed() >= window,
    }
}

impl<V> QueryEntry<V> {
    fn is_stale(&self, stale_after: Option<Duration>) -> bool {
        expired(self.fetched_at, stale_after)
    }

    /// Whether a new fetch should start for this entry.
    fn should_fetch(&self, refresh: Refresh, stale_after: Option<Duration>) -> bool {
        if self.fetching {
            return false;
        }
        match refresh {
            Refresh::Force => true,
            Refresh::RetryErrors if self.error.is_some() || self.incomplete => true,
            _ if self.error.is_some() => {
                stale_after.is_some() && expired(self.errored_at, stale_after)
            }
            _ => self.data.is_none() || self.is_stale(stale_after),
        }
    }
}

/// Point-in-time view of one cache entry.
#[derive(Debug, Clone)]
pub struct QuerySnapshot<V> {
    /// Last successfully fetched data.
    pub data: Option<V>,
    /// Error of the most recent fetch, cleared by the next success.
    pub error: Option<Arc<CatalogError>>,
    /// A fetch for this key is in flight.
    pub is_fetching: bool,
    /// Data is older than the freshness window (or absent).
    pub is_stale: bool,
}

impl<V> Default for QuerySnapshot<V> {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            is_fetching: false,
            is_stale: true,
        }
    }
}

impl<V> QuerySnapshot<V> {
    /// No data has ever been produced and nothing has failed yet.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.data.is_none() && self.error.is_none()
    }
}

/// Keyed cache of query results with an explicit freshness window.
pub struct QueryCache<K, V> {
    entries: Cache<K, QueryEntry<V>>,
    stale_after: Option<Duration>,
}

impl<K, V> QueryCache<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create a cache holding at most `capacity` keys.
    ///
    /// With `stale_after = None` data stays fresh until explicitly refetched.
    #[must_use]
    pub fn new(capacity: u64, stale_after: Option<Duration>) -> Self {
        Self {
            entries: Cache::builder().max_capacity(capacity).build(),
            stale_after,
        }
    }

    /// Current state of `key`.
    pub async fn snapshot(&self, key: &K) -> QuerySnapshot<V> {
        self.entries.get(key).await.map_or_else(QuerySnapshot::default, |entry| {
            let is_stale = entry.is_stale(self.stale_after);
            QuerySnapshot {
                data: entry.data,
                error: entry.error,
                is_fetching: entry.fetching,
                is_stale,
            }
        })
    }

    /// Claim the right to fetch `key`.
    ///
    /// Returns `true` and marks the entry in flight when a fetch should start
    /// under `refresh`. Never claims a key that is already in flight, so
    /// concurrent callers don't duplicate requests. A caller that gets `true`
    /// must call [`Self::complete`] or [`Self::complete_partial`].
    pub async fn begin_fetch(&self, key: &K, refresh: Refresh) -> bool {
        let stale_after = self.stale_after;
        let mut claimed = false;

        self.entries
            .entry(key.clone())
            .and_compute_with(|existing| {
                let mut entry = existing.map(moka::Entry::into_value).unwrap_or_default();
                let op = if entry.should_fetch(refresh, stale_after) {
                    entry.fetching = true;
                    claimed = true;
                    Op::Put(entry)
                } else {
                    Op::Nop
                };
                std::future::ready(op)
            })
            .await;

        if !claimed {
            debug!("Query cache hit or fetch already in flight");
        }
        claimed
    }

    /// Record the outcome of a fetch claimed with [`Self::begin_fetch`].
    ///
    /// Success replaces the data and clears the error. Failure keeps the
    /// previous data and records the error.
    pub async fn complete(&self, key: K, result: Result<V, CatalogError>) {
        let outcome = result.map_err(|e| {
            warn!(error = %e, "Query fetch failed");
            Arc::new(e)
        });
        self.store(key, outcome, false).await;
    }

    /// Record data that is displayable but short of the full result.
    ///
    /// Stored like a success, but retried as soon as the key is
    /// reactivated with [`Refresh::RetryErrors`].
    pub async fn complete_partial(&self, key: K, data: V) {
        self.store(key, Ok(data), true).await;
    }

    async fn store(&self, key: K, outcome: Result<V, Arc<CatalogError>>, incomplete: bool) {
        self.entries
            .entry(key)
            .and_compute_with(|existing| {
                let mut entry = existing.map(moka::Entry::into_value).unwrap_or_default();
                let now = Instant::now();
                entry.fetching = false;
                match outcome {
                    Ok(data) => {
                        entry.data = Some(data);
                        entry.fetched_at = (!entry.invalidated).then_some(now);
                        entry.error = None;
                        entry.errored_at = None;
                        entry.incomplete = incomplete;
                    }
                    Err(error) => {
                        entry.error = Some(error);
                        entry.errored_at = Some(now);
                    }
                }
                entry.invalidated = false;
                std::future::ready(Op::Put(entry))
            })
            .await;
    }

    /// Drop `key` so its next activation fetches again.
    ///
    /// An entry with a fetch in flight is kept and marked stale instead; the
    /// in-flight result is then stored without a freshness stamp.
    pub async fn invalidate(&self, key: &K) {
        self.entries
            .entry(key.clone())
            .and_compute_with(|existing| {
                let op = match existing.map(moka::Entry::into_value) {
                    Some(mut entry) if entry.fetching => {
                        entry.fetched_at = None;
                        entry.invalidated = true;
                        Op::Put(entry)
                    }
                    Some(_) => Op::Remove,
                    None => Op::Nop,
                };
                std::future::ready(op)
            })
            .await;
    }
}
