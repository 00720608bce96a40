//! Thread-safe, TTL-enforcing wrapper around [`crate::lru::LruStore`].
//!
//! `ConcurrentCache` is the `mainCache`/`hotCache` building block of the
//! group-cache orchestrator: one [`crate::lru::LruStore`] behind a single
//! `parking_lot::RwLock`, with byte-budget accounting and a background
//! sweeper that opportunistically evicts expired entries.
//!
//! # Why a single writer lock, even for `get`
//!
//! `get` moves the touched entry to the front of the recency list and may
//! delete it outright on a stale TTL — both are mutations of the underlying
//! store. Taking a reader lock for `get` while still performing those
//! mutations is a data race; this type always takes the writer lock in
//! `get`, trading away reader/reader parallelism for correctness.
//!
//! # Background sweeper
//!
//! A cooperative thread is spawned at construction. Every [`SWEEP_INTERVAL`]
//! it takes the writer lock and inspects up to [`SWEEP_BATCH`] entries,
//! deleting any past their expiry. The cache owns a [`SweeperHandle`] with an
//! explicit stop flag; the thread observes it at every tick and the handle is
//! joined when the cache is dropped, so no thread outlives its cache.

extern crate alloc;

use crate::entry::Entry;
use crate::lru::LruStore;
use core::hash::Hash;
use core::num::NonZeroUsize;
use core::time::Duration;
use std::borrow::Borrow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::RwLock;

/// Sweeper tick period (100 ms, per the external configuration defaults).
pub const SWEEP_INTERVAL: Duration = Duration::from_millis(100);
/// Maximum entries examined per sweeper tick.
pub const SWEEP_BATCH: usize = 20;

struct SweeperHandle {
    stop: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl core::fmt::Debug for SweeperHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SweeperHandle").finish_non_exhaustive()
    }
}

/// A TTL-enforcing, byte-budgeted cache safe to share across threads.
///
/// Wraps an [`LruStore<K, V>`] in a `parking_lot::RwLock` and runs a
/// background expiry sweeper for the lifetime of the cache.
pub struct ConcurrentCache<K, V> {
    inner: Arc<RwLock<LruStore<K, V>>>,
    ngets: Arc<std::sync::atomic::AtomicU64>,
    nhits: Arc<std::sync::atomic::AtomicU64>,
    sweeper: SweeperHandle,
}

impl<K, V> core::fmt::Debug for ConcurrentCache<K, V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ConcurrentCache")
            .field("ngets", &self.ngets.load(Ordering::Relaxed))
            .field("nhits", &self.nhits.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl<K, V> ConcurrentCache<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates a cache with the given entry-count capacity, default sweeper
    /// tuning ([`SWEEP_INTERVAL`]/[`SWEEP_BATCH`]), and starts its
    /// background sweeper.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self::with_config(crate::config::ConcurrentCacheConfig::default().with_capacity(capacity))
    }

    /// Creates a cache from an explicit [`crate::config::ConcurrentCacheConfig`].
    pub fn with_config(config: crate::config::ConcurrentCacheConfig) -> Self {
        Self::from_store(
            LruStore::new(config.capacity),
            config.sweep_interval,
            config.sweep_batch,
        )
    }

    /// Creates a cache with no entry-count cap, default sweeper tuning, and
    /// starts its background sweeper. Intended for callers that enforce
    /// their own eviction policy (e.g. [`crate::group::GroupCache`]'s byte
    /// budget) instead of bounding the entry count; the sweeper still
    /// reclaims expired entries regardless of capacity.
    pub fn unbounded() -> Self {
        Self::from_store(LruStore::unbounded(), SWEEP_INTERVAL, SWEEP_BATCH)
    }

    fn from_store(store: LruStore<K, V>, sweep_interval: Duration, sweep_batch: usize) -> Self {
        let inner = Arc::new(RwLock::new(store));
        let ngets = Arc::new(std::sync::atomic::AtomicU64::new(0));
        let nhits = Arc::new(std::sync::atomic::AtomicU64::new(0));

        let stop = Arc::new(AtomicBool::new(false));
        let sweep_inner = Arc::clone(&inner);
        let sweep_stop = Arc::clone(&stop);
        let join = std::thread::Builder::new()
            .name("ringcache-sweeper".into())
            .spawn(move || sweep_loop(sweep_inner, sweep_stop, sweep_interval, sweep_batch))
            .expect("spawning the expiry sweeper thread");

        ConcurrentCache {
            inner,
            ngets,
            nhits,
            sweeper: SweeperHandle {
                stop,
                join: Some(join),
            },
        }
    }

    /// Inserts or replaces `key` with TTL `ttl`. On replace, the old entry's
    /// byte contribution is deducted before the new size is added — see
    /// [`crate::lru::LruStore::add`].
    pub fn add(&self, key: K, value: V, size: u64, ttl: Duration) {
        let ttl_nanos = u64::try_from(ttl.as_nanos()).unwrap_or(u64::MAX);
        let mut guard = self.inner.write();
        guard.add(key, value, size, ttl_nanos);
        tracing::trace!(nbytes = guard.current_size(), "concurrent_cache.add");
    }

    /// Looks up `key`. Takes the writer lock (see module docs); on a hit
    /// whose TTL has elapsed, deletes the entry and reports a miss instead.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.ngets.fetch_add(1, Ordering::Relaxed);
        let mut guard = self.inner.write();
        match guard.get(key).map(|e| (e.is_expired(), e.value.clone())) {
            Some((true, _)) => {
                guard.del(key);
                tracing::debug!("concurrent_cache.get: expired entry evicted lazily");
                None
            }
            Some((false, value)) => {
                self.nhits.fetch_add(1, Ordering::Relaxed);
                Some(value)
            }
            None => None,
        }
    }

    /// Removes `key` if present.
    pub fn del<Q>(&self, key: &Q)
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.inner.write().del(key);
    }

    /// Removes the least-recently-used entry and returns the cache's total
    /// byte size afterward.
    pub fn remove_least_used(&self) -> u64 {
        let mut guard = self.inner.write();
        guard.remove_least_used();
        guard.current_size()
    }

    /// Returns the sum of entry sizes currently held.
    pub fn nbytes(&self) -> u64 {
        self.inner.read().current_size()
    }

    /// Returns the number of live entries.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Returns `true` if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Total `get` calls observed.
    pub fn ngets(&self) -> u64 {
        self.ngets.load(Ordering::Relaxed)
    }

    /// Total `get` calls that hit a live entry.
    pub fn nhits(&self) -> u64 {
        self.nhits.load(Ordering::Relaxed)
    }
}

fn sweep_loop<K, V>(
    inner: Arc<RwLock<LruStore<K, V>>>,
    stop: Arc<AtomicBool>,
    sweep_interval: Duration,
    sweep_batch: usize,
) where
    K: Hash + Eq + Clone,
{
    while !stop.load(Ordering::SeqCst) {
        std::thread::sleep(sweep_interval);
        if stop.load(Ordering::SeqCst) {
            break;
        }
        let mut guard = inner.write();
        // Iterates the store's unordered index view; the starting point is
        // whatever the hash map's iteration order happens to be, not LRU
        // recency. Best-effort reclamation, not a fairness guarantee.
        let expired: alloc::vec::Vec<K> = guard
            .iter()
            .take(sweep_batch)
            .filter(|e: &&Entry<K, V>| e.is_expired())
            .map(|e| e.key.clone())
            .collect();
        let examined = expired.len().min(sweep_batch);
        for key in &expired {
            guard.del(key);
        }
        drop(guard);
        if !expired.is_empty() {
            tracing::debug!(examined, expired = expired.len(), "concurrent_cache.sweep");
        }
    }
}
