//! TTL-aware least-recently-used store.
//!
//! `LruStore<K, V>` is an ordered map from key to `(value, expiry)` with
//! move-to-front recency, backed by the intrusive doubly-linked [`crate::list::List`]
//! plus a hash index for O(1) lookup. It is the leaf data structure the rest
//! of the crate builds on: [`crate::concurrent::ConcurrentCache`] wraps one
//! behind a lock and adds TTL enforcement and a background sweeper, and the
//! group-cache orchestrator holds two of those (`mainCache`, `hotCache`).
//!
//! # Data Structure
//!
//! ```text
//! HashMap<K, *Node>          Doubly-Linked List
//! ┌──────────────┐          ┌──────────────────────────────┐
//! │ "apple" ──────────────▶ │ MRU ◀──▶ ... ◀──▶ LRU        │
//! │ "banana" ─────────────▶ │  ▲                    │       │
//! └──────────────┘          │  │                    ▼       │
//!                           │ head              tail        │
//!                           └──────────────────────────────┘
//! ```
//!
//! # Thread Safety
//!
//! `LruStore` is **not** thread-safe on its own; wrap it in
//! [`crate::concurrent::ConcurrentCache`] for concurrent access.

extern crate alloc;

use crate::entry::Entry;
use alloc::boxed::Box;
use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};
use core::num::NonZeroUsize;

#[cfg(feature = "hashbrown")]
use hashbrown::DefaultHashBuilder;
#[cfg(feature = "hashbrown")]
use hashbrown::HashMap;

#[cfg(not(feature = "hashbrown"))]
use std::collections::hash_map::RandomState as DefaultHashBuilder;
#[cfg(not(feature = "hashbrown"))]
use std::collections::HashMap;

use crate::list::{self, List};

type ListEntry<T> = list::Entry<T>;

/// Ordered key/value store with LRU eviction and TTL-bearing entries.
///
/// # Type Parameters
///
/// - `K`: key type; must be `Hash + Eq`, and `Clone` for operations that may
///   evict or replace.
/// - `V`: value type.
/// - `S`: hash builder, defaults to the ambient `HashMap`'s default.
///
/// # Safety
///
/// `map` holds raw pointers into nodes owned by `list`. They are valid as
/// long as the node has not been removed from `list` and the store has not
/// been dropped; all mutation goes through `&mut self`, so there is no
/// aliasing hazard within a single store.
pub struct LruStore<K, V, S = DefaultHashBuilder> {
    capacity: Option<NonZeroUsize>,
    list: List<Entry<K, V>>,
    map: HashMap<K, *mut ListEntry<Entry<K, V>>, S>,
    current_size: u64,
    on_drop: Option<Box<dyn FnMut(&K, &V) + Send>>,
}

// SAFETY: LruStore owns all data; raw pointers reference only nodes owned by
// `list`, and every access requires `&mut self`.
unsafe impl<K: Send, V: Send, S: Send> Send for LruStore<K, V, S> {}

impl<K: Hash + Eq, V, S: BuildHasher + Default> LruStore<K, V, S> {
    /// Creates an empty store with the given entry-count capacity and no
    /// drop callback.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self::with_hasher(capacity, S::default())
    }

    /// Creates an empty store with no entry-count cap. Entries are only
    /// ever removed by an explicit `del`, `remove_least_used`, or `clear`
    /// call -- intended for callers (e.g. [`crate::group::GroupCache`])
    /// that enforce their own eviction policy, such as a byte budget,
    /// instead of bounding the entry count.
    pub fn unbounded() -> Self {
        Self::unbounded_with_hasher(S::default())
    }
}

impl<K: Hash + Eq, V, S: BuildHasher> LruStore<K, V, S> {
    /// Creates an empty store with an explicit hash builder.
    pub fn with_hasher(capacity: NonZeroUsize, hasher: S) -> Self {
        let map_capacity = capacity.get().next_power_of_two();
        LruStore {
            capacity: Some(capacity),
            list: List::new(capacity),
            map: HashMap::with_capacity_and_hasher(map_capacity, hasher),
            current_size: 0,
            on_drop: None,
        }
    }

    /// Creates an empty, uncapped store with an explicit hash builder. See
    /// [`LruStore::unbounded`].
    pub fn unbounded_with_hasher(hasher: S) -> Self {
        LruStore {
            capacity: None,
            list: List::new(NonZeroUsize::MAX),
            map: HashMap::with_capacity_and_hasher(16, hasher),
            current_size: 0,
            on_drop: None,
        }
    }

    /// Installs a callback invoked exactly once for every entry removed from
    /// this store, whether by eviction, explicit `del`, replacement, or
    /// `clear`.
    pub fn set_on_drop<F>(&mut self, f: F)
    where
        F: FnMut(&K, &V) + Send + 'static,
    {
        self.on_drop = Some(Box::new(f));
    }

    /// Returns the configured entry-count capacity, or `None` if this store
    /// was created with [`LruStore::unbounded`].
    #[inline]
    pub fn capacity(&self) -> Option<NonZeroUsize> {
        self.capacity
    }

    /// Returns the number of live entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if the store holds no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Returns the sum of `size` over all live entries.
    #[inline]
    pub fn current_size(&self) -> u64 {
        self.current_size
    }

    /// Inserts or replaces `key`, moving it to the front of the recency
    /// order and stamping a fresh expiry `ttl_nanos` out from now.
    ///
    /// If `key` is already present, the old value is handed to the drop
    /// callback (if any) and its size is deducted from `current_size`
    /// before the new size is added — entries are never double-counted on
    /// replace.
    pub fn add(&mut self, key: K, value: V, size: u64, ttl_nanos: u64)
    where
        K: Clone,
    {
        if let Some(&node) = self.map.get(&key) {
            // SAFETY: node was obtained from our map and has not been removed.
            let entry = unsafe { (*node).get_value_mut() };
            self.current_size = self.current_size.saturating_sub(entry.size);
            if let Some(cb) = self.on_drop.as_mut() {
                cb(&entry.key, &entry.value);
            }
            let _ = entry.refresh(value, size, ttl_nanos);
            self.current_size += size;
            // SAFETY: node is a valid, live entry in `list`.
            unsafe { self.list.move_to_front(node) };
            return;
        }

        if let Some(capacity) = self.capacity {
            while self.map.len() >= capacity.get() {
                if !self.evict_tail() {
                    break;
                }
            }
        }

        let entry = Entry::new(key.clone(), value, size, ttl_nanos);
        if let Some(node) = self.list.add(entry) {
            self.map.insert(key, node);
            self.current_size += size;
        }
    }

    /// Looks up `key`, moving it to the front of the recency order on hit.
    /// Does not consult or enforce TTL — callers that care about expiry
    /// (e.g. [`crate::concurrent::ConcurrentCache`]) check `Entry::is_expired`
    /// themselves and call `del` on a stale hit.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&Entry<K, V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let node = self.map.get(key).copied()?;
        // SAFETY: node comes from our map and is a live entry.
        unsafe {
            self.list.move_to_front(node);
            Some((*node).get_value())
        }
    }

    /// Removes `key` if present, invoking the drop callback.
    pub fn del<Q>(&mut self, key: &Q)
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let Some(node) = self.map.remove(key) else {
            return;
        };
        // SAFETY: node was just removed from the map and is a live node in `list`.
        unsafe {
            if let Some(boxed) = self.list.remove(node) {
                let entry = boxed.get_value();
                self.current_size = self.current_size.saturating_sub(entry.size);
                if let Some(cb) = self.on_drop.as_mut() {
                    cb(&entry.key, &entry.value);
                }
            }
        }
    }

    /// Removes the least-recently-used entry, if any, invoking the drop
    /// callback. Returns `true` if an entry was removed.
    pub fn remove_least_used(&mut self) -> bool {
        self.evict_tail()
    }

    /// Removes every entry, invoking the drop callback once per live entry.
    pub fn clear(&mut self) {
        while self.evict_tail() {}
    }

    /// Iterates live entries in recency order (front = most recent). Used by
    /// the sweeper to walk a bounded prefix looking for expired entries.
    pub fn iter(&self) -> impl Iterator<Item = &Entry<K, V>> {
        self.map.values().map(|&node| {
            // SAFETY: every pointer in `map` references a live node in `list`.
            unsafe { (*node).get_value() }
        })
    }

    fn evict_tail(&mut self) -> bool {
        let Some(boxed) = self.list.remove_last() else {
            return false;
        };
        // SAFETY: `boxed` was just detached from the list and is fully initialized.
        let entry = unsafe { boxed.get_value() };
        self.map.remove(&entry.key);
        self.current_size = self.current_size.saturating_sub(entry.size);
        if let Some(cb) = self.on_drop.as_mut() {
            cb(&entry.key, &entry.value);
        }
        true
    }
}

impl<K, V, S> core::fmt::Debug for LruStore<K, V, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LruStore")
            .field("capacity", &self.capacity)
            .field("len", &self.map.len())
            .field("current_size", &self.current_size)
            .finish()
    }
}
