//! Stale-While-Revalidate Cache
//!
//! Generic string-keyed cache with three states per entry:
//! - fresh (`age <= ttl`): served without calling the fetcher
//! - stale (`ttl < age <= ttl + swr`): served immediately, refreshed in the background
//! - miss (no entry or older than `ttl + swr`): fetched synchronously
//!
//! Concurrent fetches for the same key share one in-flight future, so a burst
//! of identical requests reaches upstream once. Every in-flight fetch is driven
//! by its own task: a caller that stops waiting never stalls the fetch.

use futures_util::future::{BoxFuture, FutureExt, Shared};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;
use tokio::time::Instant;

/// Default freshness window (30 seconds)
pub const DEFAULT_TTL: Duration = Duration::from_secs(30);
/// Default stale window after the TTL (2 minutes)
pub const DEFAULT_STALE_WHILE_REVALIDATE: Duration = Duration::from_secs(120);
/// Default max cache entries
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// Entry state derived from its age
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheState {
    Fresh,
    Stale,
    Miss,
}

impl CacheState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheState::Fresh => "fresh",
            CacheState::Stale => "stale",
            CacheState::Miss => "miss",
        }
    }

    pub fn is_hit(&self) -> bool {
        !matches!(self, CacheState::Miss)
    }
}

impl fmt::Display for CacheState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    pub ttl: Duration,
    pub stale_while_revalidate: Duration,
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            stale_while_revalidate: DEFAULT_STALE_WHILE_REVALIDATE,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Skip the fresh/stale short-circuit and always fetch
    pub force_refresh: bool,
}

impl FetchOptions {
    pub fn force_refresh() -> Self {
        Self { force_refresh: true }
    }
}

/// Result of a non-fetching lookup
#[derive(Debug, Clone, PartialEq)]
pub struct CacheLookup<T> {
    pub state: CacheState,
    /// Present for fresh and stale entries
    pub value: Option<T>,
}

#[derive(Debug, Clone)]
struct CacheEntry<T> {
    value: T,
    fetched_at: Instant,
}

impl<T> CacheEntry<T> {
    fn state(&self, now: Instant, config: &CacheConfig) -> CacheState {
        let age = now.saturating_duration_since(self.fetched_at);
        if age <= config.ttl {
            CacheState::Fresh
        } else if age <= config.ttl + config.stale_while_revalidate {
            CacheState::Stale
        } else {
            CacheState::Miss
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub fresh_hits: u64,
    pub stale_hits: u64,
    pub misses: u64,
    pub background_refreshes: u64,
    pub refresh_failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    fresh_hits: AtomicU64,
    stale_hits: AtomicU64,
    misses: AtomicU64,
    background_refreshes: AtomicU64,
    refresh_failures: AtomicU64,
}

type InFlight<T, E> = Shared<BoxFuture<'static, Result<T, E>>>;

struct Inner<T, E> {
    config: CacheConfig,
    entries: Mutex<HashMap<String, CacheEntry<T>>>,
    /// In-flight fetches tagged with the generation they started in
    in_flight: Mutex<HashMap<String, (u64, InFlight<T, E>)>>,
    /// Bumped by `clear()`; results from older generations are discarded
    generation: AtomicU64,
    counters: Counters,
}

impl<T: Clone, E> Inner<T, E> {
    fn store(&self, key: &str, value: T) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        if !entries.contains_key(key) && entries.len() >= self.config.max_entries {
            let now = Instant::now();
            entries.retain(|_, e| e.state(now, &self.config) != CacheState::Miss);

            if entries.len() >= self.config.max_entries {
                if let Some(oldest) = entries
                    .iter()
                    .min_by_key(|(_, e)| e.fetched_at)
                    .map(|(k, _)| k.clone())
                {
                    entries.remove(&oldest);
                }
            }
        }

        entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                fetched_at: Instant::now(),
            },
        );
    }

    fn finish(&self, key: &str, generation: u64) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if in_flight.get(key).is_some_and(|(g, _)| *g == generation) {
            in_flight.remove(key);
        }
    }

    fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

/// Shared stale-while-revalidate cache handle. Clones share state.
pub struct SwrCache<T, E> {
    inner: Arc<Inner<T, E>>,
}

impl<T, E> Clone for SwrCache<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, E> fmt::Debug for SwrCache<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwrCache")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl<T, E> SwrCache<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + fmt::Display + 'static,
{
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                entries: Mutex::new(HashMap::new()),
                in_flight: Mutex::new(HashMap::new()),
                generation: AtomicU64::new(0),
                counters: Counters::default(),
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Inspect a key without fetching or touching statistics
    pub fn get(&self, key: &str) -> CacheLookup<T> {
        let entries = self.inner.entries.lock().unwrap_or_else(PoisonError::into_inner);
        match entries.get(key) {
            Some(entry) => {
                let state = entry.state(Instant::now(), &self.inner.config);
                CacheLookup {
                    state,
                    value: state.is_hit().then(|| entry.value.clone()),
                }
            }
            None => CacheLookup {
                state: CacheState::Miss,
                value: None,
            },
        }
    }

    /// Return the cached value or fetch it.
    ///
    /// A stale hit returns immediately and refreshes in the background; a
    /// failed background refresh is logged and keeps the old entry.
    pub async fn fetch<F, Fut>(&self, key: &str, fetcher: F, options: FetchOptions) -> Result<T, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let counters = &self.inner.counters;

        if !options.force_refresh {
            let lookup = self.get(key);
            match (lookup.state, lookup.value) {
                (CacheState::Fresh, Some(value)) => {
                    counters.fresh_hits.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!("Cache fresh hit for {}", key);
                    return Ok(value);
                }
                (CacheState::Stale, Some(value)) => {
                    counters.stale_hits.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!("Cache stale hit for {}, revalidating", key);
                    self.revalidate(key, fetcher);
                    return Ok(value);
                }
                _ => {}
            }
        }

        counters.misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            "Cache {} for {}",
            if options.force_refresh { "forced refresh" } else { "miss" },
            key
        );
        let (flight, _) = self.start_or_join(key, fetcher);
        flight.await
    }

    fn revalidate<F, Fut>(&self, key: &str, fetcher: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let (flight, started) = self.start_or_join(key, fetcher);
        if !started {
            return;
        }
        self.inner
            .counters
            .background_refreshes
            .fetch_add(1, Ordering::Relaxed);

        let weak = Arc::downgrade(&self.inner);
        let owned_key = key.to_string();
        tokio::spawn(async move {
            if let Err(e) = flight.await {
                tracing::warn!("Background refresh for {} failed: {}", owned_key, e);
                if let Some(inner) = weak.upgrade() {
                    inner
                        .counters
                        .refresh_failures
                        .fetch_add(1, Ordering::Relaxed);
                }
            }
        });
    }

    /// Join the in-flight fetch for `key` or start one on a driver task.
    /// Returns the shared future and whether this call started it.
    fn start_or_join<F, Fut>(&self, key: &str, fetcher: F) -> (InFlight<T, E>, bool)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let mut in_flight = self
            .inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some((_, existing)) = in_flight.get(key) {
            tracing::debug!("Joining in-flight fetch for {}", key);
            return (existing.clone(), false);
        }

        let generation = self.inner.current_generation();
        let weak: Weak<Inner<T, E>> = Arc::downgrade(&self.inner);
        let owned_key = key.to_string();
        let flight = async move {
            let result = fetcher().await;
            if let Some(inner) = weak.upgrade() {
                if let Ok(value) = &result {
                    if inner.current_generation() == generation {
                        inner.store(&owned_key, value.clone());
                    }
                }
                inner.finish(&owned_key, generation);
            }
            result
        }
        .boxed()
        .shared();

        in_flight.insert(key.to_string(), (generation, flight.clone()));

        let driver = flight.clone();
        tokio::spawn(async move {
            let _ = driver.await;
        });
        (flight, true)
    }

    /// Drop one entry
    pub fn remove(&self, key: &str) -> Option<T> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .map(|e| e.value)
    }

    /// Drop all entries. Fetches already in flight still resolve for their
    /// waiters but no longer write back.
    pub fn clear(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let c = &self.inner.counters;
        CacheStats {
            entries: self.len(),
            fresh_hits: c.fresh_hits.load(Ordering::Relaxed),
            stale_hits: c.stale_hits.load(Ordering::Relaxed),
            misses: c.misses.load(Ordering::Relaxed),
            background_refreshes: c.background_refreshes.load(Ordering::Relaxed),
            refresh_failures: c.refresh_failures.load(Ordering::Relaxed),
        }
    }
}

impl<T, E> Default for SwrCache<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + fmt::Display + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
