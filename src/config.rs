//! Typed configuration for every tunable component, each with a `Default`
//! matching the external defaults and `with_*` builder methods, following
//! the convention the rest of this crate's config types use.

extern crate alloc;

use core::num::NonZeroUsize;
use core::time::Duration;

/// Configuration for a [`crate::ring::ConsistentHashRing`].
#[derive(Debug, Clone, Copy)]
pub struct RingConfig {
    /// Virtual nodes per real node.
    pub replicas: usize,
}

impl Default for RingConfig {
    fn default() -> Self {
        RingConfig {
            replicas: crate::peer::DEFAULT_REPLICAS,
        }
    }
}

impl RingConfig {
    /// Overrides the replica count.
    pub fn with_replicas(mut self, replicas: usize) -> Self {
        self.replicas = replicas;
        self
    }
}

/// Configuration for a [`crate::concurrent::ConcurrentCache`].
#[derive(Debug, Clone, Copy)]
pub struct ConcurrentCacheConfig {
    /// Maximum number of live entries.
    pub capacity: NonZeroUsize,
    /// How often the background sweeper wakes to look for expired entries.
    pub sweep_interval: Duration,
    /// Maximum entries the sweeper examines per tick.
    pub sweep_batch: usize,
}

impl Default for ConcurrentCacheConfig {
    fn default() -> Self {
        ConcurrentCacheConfig {
            capacity: NonZeroUsize::new(1 << 20).expect("nonzero literal"),
            sweep_interval: crate::concurrent::SWEEP_INTERVAL,
            sweep_batch: crate::concurrent::SWEEP_BATCH,
        }
    }
}

impl ConcurrentCacheConfig {
    /// Sets the entry-count capacity.
    pub fn with_capacity(mut self, capacity: NonZeroUsize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the sweeper tick period.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Sets the sweeper's per-tick examination budget.
    pub fn with_sweep_batch(mut self, batch: usize) -> Self {
        self.sweep_batch = batch;
        self
    }
}

/// Options controlling one [`crate::group::GroupCache::get`] call: which
/// sources are consulted and the TTL applied to whatever is stored.
#[derive(Debug, Clone, Copy)]
pub struct LookupOptions {
    /// Consult the local hot/main cache pair before going further.
    pub from_local: bool,
    /// Ask the owning peer, if one is configured and it isn't us.
    pub from_peer: bool,
    /// Fall back to the caller-supplied loader if nothing else has the key.
    pub from_getter: bool,
    /// TTL applied to whatever value is ultimately stored locally.
    pub ttl: Duration,
}

impl Default for LookupOptions {
    fn default() -> Self {
        LookupOptions {
            from_local: true,
            from_peer: true,
            from_getter: true,
            ttl: Duration::from_secs(300),
        }
    }
}

impl LookupOptions {
    /// Restricts the lookup to the local cache only.
    pub fn local_only() -> Self {
        LookupOptions {
            from_local: true,
            from_peer: false,
            from_getter: false,
            ..Default::default()
        }
    }

    /// Sets the TTL applied on store.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Configuration for a [`crate::group::GroupCache`].
#[derive(Debug, Clone, Copy)]
pub struct GroupCacheConfig {
    /// Combined byte budget for the main and hot caches together.
    pub max_bytes: u64,
    /// Expected key count used to size the Bloom pre-check, if enabled.
    pub bloom_expected_items: usize,
    /// Target false-positive rate for the Bloom pre-check, if enabled.
    pub bloom_false_positive_rate: f64,
    /// Whether the Bloom pre-check is enabled at all.
    pub bloom_enabled: bool,
    /// Default lookup behavior for [`crate::group::GroupCache::get`].
    pub default_lookup: LookupOptions,
}

impl Default for GroupCacheConfig {
    fn default() -> Self {
        GroupCacheConfig {
            max_bytes: 64 << 20,
            bloom_expected_items: 100_000,
            bloom_false_positive_rate: 0.01,
            bloom_enabled: false,
            default_lookup: LookupOptions::default(),
        }
    }
}

impl GroupCacheConfig {
    /// Sets the total byte budget.
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Enables the Bloom pre-check, sized for `expected_items` at
    /// `false_positive_rate`.
    pub fn with_bloom(mut self, expected_items: usize, false_positive_rate: f64) -> Self {
        self.bloom_enabled = true;
        self.bloom_expected_items = expected_items;
        self.bloom_false_positive_rate = false_positive_rate;
        self
    }
}
