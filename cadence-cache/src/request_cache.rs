//! The request cache manager.
//!
//! Routes reads through the decision procedure: fresh hit, stale-while-
//! revalidate, coalesce onto an in-flight fetch, or fetch anew. Each fetch
//! gets exactly one spawned driver task that applies the settled result
//! (entry store plus pending-registry removal); foreground callers only
//! await the shared future, so settlement is exactly-once no matter how
//! many readers coalesced onto the fetch.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use cadence_core::{
    CacheError, CadenceResult, Clock, Scheduler, TokioClock, TokioScheduler,
};
use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;
use regex::Regex;

use crate::config::{CacheConfig, GetOptions};
use crate::fetch::Fetch;
use crate::stats::{CacheStats, EntryStats};

/// Receives the key and value of each entry dropped by the
/// least-recently-set policy, for external bookkeeping.
pub type EvictCallback<V> = Arc<dyn Fn(&str, &V) + Send + Sync>;

type SharedFetch<V> = Shared<BoxFuture<'static, Result<V, CacheError>>>;

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

struct PendingFetch<V> {
    /// Distinguishes this fetch from a successor started after an
    /// invalidation; settlement only removes its own registry record.
    id: u64,
    shared: SharedFetch<V>,
}

#[derive(Default)]
struct Counters {
    hits: u64,
    misses: u64,
    stale_hits: u64,
    coalesced: u64,
    evictions: u64,
}

struct CacheState<V> {
    entries: HashMap<String, CacheEntry<V>>,
    /// Insertion order doubles as recency order; the front is the
    /// least-recently-set key.
    order: VecDeque<String>,
    pending: HashMap<String, PendingFetch<V>>,
    next_fetch_id: u64,
    counters: Counters,
    evict_callback: Option<EvictCallback<V>>,
}

struct CacheShared<V> {
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    scheduler: Arc<dyn Scheduler>,
    state: Mutex<CacheState<V>>,
}

/// Request cache with TTL expiry, stale-while-revalidate, coalescing, and
/// bounded least-recently-set eviction.
///
/// Cloning yields another handle to the same cache. The mapping and the
/// pending-request registry are private to one instance; callers needing
/// isolation construct separate instances.
pub struct RequestCache<V> {
    shared: Arc<CacheShared<V>>,
}

impl<V> Clone for RequestCache<V> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

enum ReadPlan<V> {
    /// Await a fetch some earlier caller started.
    Join(SharedFetch<V>),
    /// Await the fetch this caller started.
    Fetch(SharedFetch<V>),
}

impl<V> RequestCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a cache with the production clock and scheduler.
    pub fn new(config: CacheConfig) -> CadenceResult<Self> {
        Self::with_capabilities(
            config,
            Arc::new(TokioClock::new()),
            Arc::new(TokioScheduler::new()),
        )
    }

    /// Create a cache with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(CacheConfig::default())
            .unwrap_or_else(|_| unreachable!("default config is valid"))
    }

    /// Create a cache with explicit capabilities.
    pub fn with_capabilities(
        config: CacheConfig,
        clock: Arc<dyn Clock>,
        scheduler: Arc<dyn Scheduler>,
    ) -> CadenceResult<Self> {
        config.validate()?;
        Ok(Self {
            shared: Arc::new(CacheShared {
                config,
                clock,
                scheduler,
                state: Mutex::new(CacheState {
                    entries: HashMap::new(),
                    order: VecDeque::new(),
                    pending: HashMap::new(),
                    next_fetch_id: 0,
                    counters: Counters::default(),
                    evict_callback: None,
                }),
            }),
        })
    }

    /// Install a callback receiving each evicted key and value.
    pub fn set_evict_callback(&self, callback: EvictCallback<V>) -> CadenceResult<()> {
        self.lock_state()?.evict_callback = Some(callback);
        Ok(())
    }

    /// Read the value for `key`, fetching it if necessary.
    ///
    /// - A non-expired entry returns synchronously (unless `force_refresh`).
    /// - An expired entry with `stale_while_revalidate` returns the stale
    ///   value synchronously and starts at most one background refresh.
    /// - Otherwise the read coalesces onto an in-flight fetch for `key`, or
    ///   starts one. On fetch failure a stale value is served when one
    ///   exists; otherwise the failure propagates.
    pub async fn get<F>(&self, key: &str, fetcher: F, options: GetOptions) -> CadenceResult<V>
    where
        F: Fetch<V> + 'static,
    {
        let ttl = options.ttl.unwrap_or(self.shared.config.default_ttl);
        let fetcher: Arc<dyn Fetch<V>> = Arc::new(fetcher);

        let plan = {
            let now = self.shared.clock.now();
            let mut guard = self.lock_state()?;
            let state = &mut *guard;

            if let Some(entry) = state.entries.get(key) {
                let expired = entry.expires_at <= now;
                if !options.force_refresh && !expired {
                    state.counters.hits += 1;
                    return Ok(entry.value.clone());
                }
                if expired && options.stale_while_revalidate && !options.force_refresh {
                    let stale = entry.value.clone();
                    state.counters.stale_hits += 1;
                    if state.pending.contains_key(key) {
                        tracing::trace!(key, "refresh already in flight");
                    } else {
                        Self::begin_fetch(&self.shared, state, key, ttl, fetcher);
                        tracing::debug!(key, "serving stale value, refreshing in background");
                    }
                    return Ok(stale);
                }
            }

            if let Some(pending) = state.pending.get(key) {
                state.counters.coalesced += 1;
                ReadPlan::Join(pending.shared.clone())
            } else {
                state.counters.misses += 1;
                ReadPlan::Fetch(Self::begin_fetch(&self.shared, state, key, ttl, fetcher))
            }
        };

        let result = match plan {
            ReadPlan::Join(shared) | ReadPlan::Fetch(shared) => shared.await,
        };

        match result {
            Ok(value) => Ok(value),
            Err(err) => {
                // Graceful degradation: a stale entry beats a failure.
                let stale = self.lock_state()?.entries.get(key).map(|e| e.value.clone());
                match stale {
                    Some(value) => {
                        tracing::warn!(key, error = %err, "fetch failed, serving stale value");
                        Ok(value)
                    }
                    None => Err(err.into()),
                }
            }
        }
    }

    /// Schedule a low-priority population of `key` during host idle time.
    ///
    /// Skipped when a live entry or an in-flight fetch already covers the
    /// key. Failures are logged and swallowed; warming is opportunistic.
    pub fn warm<F>(&self, key: &str, fetcher: F, ttl: Duration)
    where
        F: Fetch<V> + 'static,
    {
        let this = self.clone();
        let key = key.to_string();
        self.shared.scheduler.spawn_idle(Box::pin(async move {
            let covered = {
                let now = this.shared.clock.now();
                let state = lock_or_recover(&this.shared.state);
                state
                    .entries
                    .get(&key)
                    .map(|e| e.expires_at > now)
                    .unwrap_or(false)
                    || state.pending.contains_key(&key)
            };
            if covered {
                return;
            }
            if let Err(err) = this
                .get(&key, fetcher, GetOptions::new().with_ttl(ttl))
                .await
            {
                tracing::debug!(key = %key, error = %err, "cache warm fetch failed");
            }
        }));
    }

    /// Remove the entry and any pending-request record for `key`.
    ///
    /// Does not suppress an already in-flight revalidation: a fetch that
    /// resolves after this call repopulates the entry. Removing the
    /// pending record only means a subsequent read starts a fresh fetch
    /// instead of coalescing onto the old one.
    pub fn invalidate(&self, key: &str) -> CadenceResult<()> {
        let mut state = self.lock_state()?;
        state.entries.remove(key);
        if let Some(position) = state.order.iter().position(|k| k == key) {
            state.order.remove(position);
        }
        state.pending.remove(key);
        Ok(())
    }

    /// Invalidate every key matching `pattern`. Returns the number of keys
    /// invalidated.
    pub fn invalidate_pattern(&self, pattern: &Regex) -> CadenceResult<usize> {
        let keys: Vec<String> = {
            let state = self.lock_state()?;
            state
                .entries
                .keys()
                .chain(state.pending.keys())
                .filter(|k| pattern.is_match(k))
                .cloned()
                .collect::<HashSet<_>>()
                .into_iter()
                .collect()
        };
        for key in &keys {
            self.invalidate(key)?;
        }
        Ok(keys.len())
    }

    /// Empty the cache and the pending-request registry.
    pub fn clear(&self) -> CadenceResult<()> {
        let mut state = self.lock_state()?;
        state.entries.clear();
        state.order.clear();
        state.pending.clear();
        Ok(())
    }

    /// Point-in-time statistics. Observability only; reading them has no
    /// effect on recency or counters.
    pub fn stats(&self) -> CadenceResult<CacheStats> {
        let now = self.shared.clock.now();
        let state = self.lock_state()?;
        let entries = state
            .order
            .iter()
            .filter_map(|key| {
                state.entries.get(key).map(|entry| EntryStats {
                    key: key.clone(),
                    remaining_ttl: entry.expires_at.saturating_duration_since(now),
                    expired: entry.expires_at <= now,
                })
            })
            .collect();
        Ok(CacheStats {
            entries,
            hits: state.counters.hits,
            misses: state.counters.misses,
            stale_hits: state.counters.stale_hits,
            coalesced: state.counters.coalesced,
            evictions: state.counters.evictions,
            in_flight: state.pending.len(),
        })
    }

    /// Start a fetch for `key` and register it for coalescing. Spawns the
    /// driver task that applies the settled result.
    fn begin_fetch(
        shared: &Arc<CacheShared<V>>,
        state: &mut CacheState<V>,
        key: &str,
        ttl: Duration,
        fetcher: Arc<dyn Fetch<V>>,
    ) -> SharedFetch<V> {
        state.next_fetch_id += 1;
        let id = state.next_fetch_id;
        let key = key.to_string();

        let fetch_key = key.clone();
        let future: BoxFuture<'static, Result<V, CacheError>> = Box::pin(async move {
            fetcher
                .fetch()
                .await
                .map_err(|e| CacheError::fetch_failed(fetch_key, e))
        });
        let shared_fetch = future.shared();

        state.pending.insert(
            key.clone(),
            PendingFetch {
                id,
                shared: shared_fetch.clone(),
            },
        );

        let this = Arc::clone(shared);
        let settled = shared_fetch.clone();
        shared.scheduler.spawn(Box::pin(async move {
            let result = settled.await;
            Self::settle(&this, &key, id, ttl, result);
        }));

        shared_fetch
    }

    /// Apply a settled fetch: drop the registry record this fetch owns and,
    /// on success, store the entry. The store is unconditional — a
    /// revalidation that outlives an `invalidate` repopulates the entry,
    /// which is the documented staleness window.
    fn settle(
        shared: &Arc<CacheShared<V>>,
        key: &str,
        id: u64,
        ttl: Duration,
        result: Result<V, CacheError>,
    ) {
        let (evicted, callback) = {
            let mut guard = lock_or_recover(&shared.state);
            let state = &mut *guard;
            let owns_record = state.pending.get(key).map(|p| p.id == id).unwrap_or(false);
            if owns_record {
                state.pending.remove(key);
            }
            match result {
                Ok(value) => {
                    let now = shared.clock.now();
                    let evicted = Self::store(shared, state, key, value, ttl, now);
                    (evicted, state.evict_callback.clone())
                }
                Err(err) => {
                    tracing::warn!(key, error = %err, "fetch failed");
                    (None, None)
                }
            }
        };
        if let (Some((victim_key, victim_value)), Some(callback)) = (evicted, callback) {
            callback(&victim_key, &victim_value);
        }
    }

    /// Write an entry at the most-recently-set position, evicting the
    /// least-recently-set entry if the mapping is full. Returns the evicted
    /// pair, if any.
    fn store(
        shared: &CacheShared<V>,
        state: &mut CacheState<V>,
        key: &str,
        value: V,
        ttl: Duration,
        now: Instant,
    ) -> Option<(String, V)> {
        let expires_at = now + ttl;

        if let Some(entry) = state.entries.get_mut(key) {
            entry.value = value;
            entry.expires_at = expires_at;
            if let Some(position) = state.order.iter().position(|k| k == key) {
                state.order.remove(position);
            }
            state.order.push_back(key.to_string());
            return None;
        }

        let mut evicted = None;
        if state.entries.len() >= shared.config.max_size {
            if let Some(victim) = state.order.pop_front() {
                if let Some(entry) = state.entries.remove(&victim) {
                    state.counters.evictions += 1;
                    tracing::debug!(key = %victim, "evicting least-recently-set entry");
                    evicted = Some((victim, entry.value));
                }
            }
        }

        state
            .entries
            .insert(key.to_string(), CacheEntry { value, expires_at });
        state.order.push_back(key.to_string());
        evicted
    }

    fn lock_state(&self) -> CadenceResult<MutexGuard<'_, CacheState<V>>> {
        self.shared
            .state
            .lock()
            .map_err(|_| CacheError::LockPoisoned.into())
    }
}

/// Driver tasks have no caller to report to; a poisoned lock still holds
/// consistent state, so recover it rather than dropping the settlement.
fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

