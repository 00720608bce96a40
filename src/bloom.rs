//! Bloom-filter pre-check for the group cache's lookup path.
//!
//! A key that the filter reports absent is guaranteed absent from the
//! backing store, so [`crate::group::GroupCache::get`] can reject it before
//! touching the local cache, any peer, or the loader. A positive result is
//! not a guarantee — it only means "maybe present", so the normal lookup
//! chain still runs.

extern crate alloc;

use alloc::sync::Arc;
use bloomfilter::Bloom;
use parking_lot::Mutex;

/// A thread-safe Bloom filter sized for an expected key count and target
/// false-positive rate.
pub struct KeyFilter {
    inner: Mutex<Bloom<[u8]>>,
}

impl core::fmt::Debug for KeyFilter {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("KeyFilter").finish_non_exhaustive()
    }
}

impl KeyFilter {
    /// Builds a filter sized for `expected_items` entries at `false_positive_rate`
    /// (e.g. `0.01` for 1%).
    pub fn new(expected_items: usize, false_positive_rate: f64) -> Self {
        let expected_items = expected_items.max(1);
        KeyFilter {
            inner: Mutex::new(Bloom::new_for_fp_rate(expected_items, false_positive_rate)),
        }
    }

    /// Records `key` as present.
    pub fn add(&self, key: &[u8]) {
        self.inner.lock().set(key);
    }

    /// Returns `false` if `key` is definitely absent, `true` if it might be
    /// present.
    pub fn test(&self, key: &[u8]) -> bool {
        self.inner.lock().check(key)
    }
}

/// A no-op filter that reports every key as possibly present, used when the
/// group cache is configured without a Bloom pre-check.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysMaybe;

impl AlwaysMaybe {
    /// Always returns `true`.
    pub fn test(&self, _key: &[u8]) -> bool {
        true
    }

    /// No-op.
    pub fn add(&self, _key: &[u8]) {}
}

/// Either a real [`KeyFilter`] or the pass-through [`AlwaysMaybe`] stand-in,
/// chosen at group-cache construction time.
#[derive(Clone)]
pub enum BloomConfig {
    /// No pre-check; every key is looked up normally.
    Disabled,
    /// Reject keys the filter can prove are absent.
    Enabled(Arc<KeyFilter>),
}

impl core::fmt::Debug for BloomConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            BloomConfig::Disabled => f.write_str("BloomConfig::Disabled"),
            BloomConfig::Enabled(_) => f.write_str("BloomConfig::Enabled"),
        }
    }
}

impl BloomConfig {
    /// Builds an enabled filter sized for `expected_items` at `false_positive_rate`.
    pub fn sized(expected_items: usize, false_positive_rate: f64) -> Self {
        BloomConfig::Enabled(Arc::new(KeyFilter::new(expected_items, false_positive_rate)))
    }

    /// Records `key` as present, if this config is enabled.
    pub fn add(&self, key: &[u8]) {
        if let BloomConfig::Enabled(filter) = self {
            filter.add(key);
        }
    }

    /// Returns `false` only if this config is enabled and definitely knows
    /// `key` is absent.
    pub fn may_contain(&self, key: &[u8]) -> bool {
        match self {
            BloomConfig::Disabled => true,
            BloomConfig::Enabled(filter) => filter.test(key),
        }
    }
}

impl Default for BloomConfig {
    fn default() -> Self {
        BloomConfig::Disabled
    }
}
