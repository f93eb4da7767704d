//! First-page feed cache with request deduplication.
//!
//! Concurrent `warm` calls for the same key share one upstream fetch: the
//! first caller drives the request, later callers wait on its result. A
//! non-empty cached page short-circuits the fetch unless `force` is set.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Notify, OnceCell};
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::error::{ReelError, Result};
use crate::feed::model::{FeedItem, FeedKey, feed_items};
use crate::feed::source::FeedSource;

/// Items as handed to every caller. Shared, never mutated after the fetch.
pub type FeedItems = Arc<Vec<FeedItem>>;

#[derive(Debug, Clone)]
struct CacheEntry {
    items: FeedItems,
    loaded_at: Instant,
}

#[derive(Debug, Clone)]
enum InFlightFailure {
    Cancelled(String),
    Failed(String),
}

type InFlightResult = std::result::Result<FeedItems, InFlightFailure>;

struct InFlightState {
    result: OnceCell<InFlightResult>,
    notify: Notify,
}

impl InFlightState {
    fn new() -> Self {
        Self {
            result: OnceCell::new(),
            notify: Notify::new(),
        }
    }

    fn set_result(&self, result: InFlightResult) {
        let _ = self.result.set(result);
        self.notify.notify_waiters();
    }

    async fn wait(&self) -> InFlightResult {
        loop {
            if let Some(result) = self.result.get() {
                return result.clone();
            }

            let notified = self.notify.notified();
            if let Some(result) = self.result.get() {
                return result.clone();
            }

            notified.await;
        }
    }
}

type InFlightRequest = Arc<InFlightState>;

/// Fails the in-flight request if the driving future is dropped before it
/// settles, so waiters never hang on an abandoned fetch.
struct InFlightGuard<'a> {
    cache: &'a FeedCache,
    key: FeedKey,
    request: InFlightRequest,
    settled: bool,
}

impl InFlightGuard<'_> {
    fn complete(mut self, items: FeedItems) {
        self.settled = true;
        self.cache.complete_in_flight(self.key, &self.request, items);
    }

    fn fail(mut self, reason: String) {
        self.settled = true;
        self.cache
            .fail_in_flight(self.key, &self.request, InFlightFailure::Failed(reason));
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            debug!(key = %self.key, "Feed fetch dropped before completion");
            self.cache.fail_in_flight(
                self.key,
                &self.request,
                InFlightFailure::Cancelled(format!("fetch for {} was dropped", self.key)),
            );
        }
    }
}

/// Options for [`FeedCache::warm`].
#[derive(Debug, Clone, Copy, Default)]
pub struct WarmOptions {
    /// Ignore a cached page and fetch again. Still joins an in-flight fetch.
    pub force: bool,
}

impl WarmOptions {
    pub fn forced() -> Self {
        Self { force: true }
    }
}

/// Statistics about the feed cache.
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub entry_count: usize,
    pub in_flight_count: usize,
    /// Upstream fetches issued since creation
    pub upstream_fetches: u64,
}

pub struct FeedCache {
    source: Arc<dyn FeedSource>,
    entries: DashMap<FeedKey, CacheEntry>,
    in_flight: DashMap<FeedKey, InFlightRequest>,
    upstream_fetches: AtomicU64,
}

impl FeedCache {
    pub fn new(source: Arc<dyn FeedSource>) -> Self {
        Self {
            source,
            entries: DashMap::new(),
            in_flight: DashMap::new(),
            upstream_fetches: AtomicU64::new(0),
        }
    }

    /// Return the page for `key`, fetching it at most once across concurrent
    /// callers.
    ///
    /// A fetch failure reaches every waiter and nothing is cached.
    pub async fn warm(&self, key: FeedKey, options: WarmOptions) -> Result<FeedItems> {
        if !options.force
            && let Some(items) = self.cached_non_empty(key)
        {
            trace!(key = %key, "Feed cache hit");
            return Ok(items);
        }

        let (request, is_new) = self.get_or_create_in_flight(key);

        if !is_new {
            trace!(key = %key, "Joining in-flight feed fetch");
            return request.wait().await.map_err(|failure| match failure {
                InFlightFailure::Cancelled(reason) => ReelError::cancelled(reason),
                InFlightFailure::Failed(reason) => ReelError::feed_fetch(key.to_string(), reason),
            });
        }

        let guard = InFlightGuard {
            cache: self,
            key,
            request,
            settled: false,
        };

        // Another leader may have finished between the cache check and our
        // claim on the in-flight slot.
        if !options.force
            && let Some(items) = self.cached_non_empty(key)
        {
            guard.complete(items.clone());
            return Ok(items);
        }

        self.upstream_fetches.fetch_add(1, Ordering::Relaxed);
        let started = Instant::now();

        match self.source.fetch_public_videos(key).await {
            Ok(page) => {
                let items = feed_items(&page.data);
                debug!(
                    key = %key,
                    records = page.data.len(),
                    items = items.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Feed page loaded"
                );
                let items = Arc::new(items);
                guard.complete(items.clone());
                Ok(items)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Feed fetch failed");
                guard.fail(e.to_string());
                Err(e)
            }
        }
    }

    fn cached_non_empty(&self, key: FeedKey) -> Option<FeedItems> {
        self.entries
            .get(&key)
            .filter(|entry| !entry.items.is_empty())
            .map(|entry| entry.items.clone())
    }

    /// Last-known items for `key`, without waiting on anything.
    pub fn peek(&self, key: FeedKey) -> Option<FeedItems> {
        self.entries.get(&key).map(|entry| entry.items.clone())
    }

    pub fn loaded_at(&self, key: FeedKey) -> Option<Instant> {
        self.entries.get(&key).map(|entry| entry.loaded_at)
    }

    /// True when nothing is cached for `key` or it is older than `max_age`.
    pub fn is_stale(&self, key: FeedKey, max_age: Duration) -> bool {
        self.loaded_at(key)
            .is_none_or(|loaded_at| loaded_at.elapsed() >= max_age)
    }

    pub fn has_in_flight(&self, key: FeedKey) -> bool {
        self.in_flight.contains_key(&key)
    }

    /// Drop every cached page and fail pending waiters.
    pub fn clear(&self) {
        for entry in self.in_flight.iter() {
            entry
                .value()
                .set_result(Err(InFlightFailure::Cancelled("feed cache cleared".to_string())));
        }
        self.in_flight.clear();
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.entries.len(),
            in_flight_count: self.in_flight.len(),
            upstream_fetches: self.upstream_fetches.load(Ordering::Relaxed),
        }
    }

    // ========== Request Deduplication ==========

    fn get_or_create_in_flight(&self, key: FeedKey) -> (InFlightRequest, bool) {
        match self.in_flight.entry(key) {
            dashmap::mapref::entry::Entry::Occupied(entry) => (entry.get().clone(), false),
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                let request = Arc::new(InFlightState::new());
                entry.insert(request.clone());
                (request, true)
            }
        }
    }

    fn is_current(&self, key: FeedKey, request: &InFlightRequest) -> bool {
        self.in_flight
            .get(&key)
            .is_some_and(|current| Arc::ptr_eq(current.value(), request))
    }

    fn complete_in_flight(&self, key: FeedKey, request: &InFlightRequest, items: FeedItems) {
        // A `clear()` while fetching detaches the request; its result must
        // not repopulate the cache.
        if self.is_current(key, request) {
            self.entries.insert(
                key,
                CacheEntry {
                    items: items.clone(),
                    loaded_at: Instant::now(),
                },
            );
            self.in_flight
                .remove_if(&key, |_, current| Arc::ptr_eq(current, request));
        }
        request.set_result(Ok(items));
    }

    fn fail_in_flight(&self, key: FeedKey, request: &InFlightRequest, failure: InFlightFailure) {
        self.in_flight
            .remove_if(&key, |_, current| Arc::ptr_eq(current, request));
        request.set_result(Err(failure));
    }
}
