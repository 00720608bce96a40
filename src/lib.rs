//! `ringcache` is a distributed in-process key-value cache: a TTL-aware LRU
//! store, a consistent-hash peer ring, a single-flight request coalescer,
//! and a group-cache orchestrator that ties them together behind one `get`.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         GroupCache::get                         │
//! │                                                                 │
//! │  key --> bloom pre-check --> hot cache --> main cache           │
//! │                                  │              │               │
//! │                                  │   (miss)     │ (miss)        │
//! │                                  ▼              ▼               │
//! │                           promote on hit   peer picker           │
//! │                                                  │                │
//! │                                          (no peer / miss)         │
//! │                                                  ▼                │
//! │                                          caller-supplied getter   │
//! │                                  all under single-flight coalescing│
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`value`]: the immutable, cheaply-cloned byte payload stored everywhere.
//! - [`entry`]: a TTL-bearing `(key, value, size)` triple.
//! - [`list`]: the internal doubly linked list backing the LRU store.
//! - [`lru`]: [`lru::LruStore`], a single-threaded, byte-budgeted,
//!   TTL-aware LRU map.
//! - [`concurrent`]: [`concurrent::ConcurrentCache`], a thread-safe wrapper
//!   around an `LruStore` with a background expiry sweeper. Requires `std`.
//! - [`ring`]: [`ring::ConsistentHashRing`], virtual-node consistent hashing
//!   for peer selection.
//! - [`peer`]: the [`peer::Peer`]/[`peer::PeerPicker`] traits and the
//!   `http-peer`-gated HTTP transport.
//! - [`singleflight`]: [`singleflight::Shots`], the request coalescer.
//! - [`bloom`]: the Bloom-filter pre-check used to short-circuit definite
//!   misses.
//! - [`group`]: [`group::GroupCache`], the top-level orchestrator, plus the
//!   process-wide named-group registry.
//! - [`config`]: typed, `Default`-implementing configuration for every
//!   tunable component above.
//! - [`error`]: [`error::CacheError`], the single error type shared by every
//!   fallible operation.
//!
//! [`value`], [`entry`], [`list`], and [`lru`] are `no_std` (with `alloc`);
//! everything else requires the default-enabled `std` feature, since they
//! need threads, locks, or system time.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

#[cfg(test)]
extern crate std;

/// The immutable byte payload stored by every cache layer.
pub mod value;

/// A TTL-bearing cache entry.
pub mod entry;

/// Internal doubly linked list backing [`lru::LruStore`].
pub(crate) mod list;

/// A single-threaded, byte-budgeted, TTL-aware LRU map.
pub mod lru;

/// A thread-safe `LruStore` wrapper with a background expiry sweeper.
///
/// Requires the `std` feature (enabled by default).
#[cfg(feature = "std")]
pub mod concurrent;

/// Virtual-node consistent hashing for peer selection.
pub mod ring;

/// The `Peer`/`PeerPicker` abstractions and the `http-peer` HTTP transport.
///
/// Requires the `std` feature (enabled by default).
#[cfg(feature = "std")]
pub mod peer;

/// Single-flight request coalescing.
///
/// Requires the `std` feature (enabled by default).
#[cfg(feature = "std")]
pub mod singleflight;

/// The Bloom-filter pre-check used to short-circuit definite misses.
///
/// Requires the `std` feature (enabled by default).
#[cfg(feature = "std")]
pub mod bloom;

/// The top-level `GroupCache` orchestrator and named-group registry.
///
/// Requires the `std` feature (enabled by default).
#[cfg(feature = "std")]
pub mod group;

/// Typed configuration for every tunable component.
///
/// Requires the `std` feature (enabled by default).
#[cfg(feature = "std")]
pub mod config;

/// The error type shared by every fallible operation.
///
/// Requires the `std` feature (enabled by default): [`thiserror`] has no
/// true `no_std` support.
#[cfg(feature = "std")]
pub mod error;

pub use entry::Entry;
pub use lru::LruStore;
pub use value::Value;

#[cfg(feature = "std")]
pub use concurrent::ConcurrentCache;
#[cfg(feature = "std")]
pub use error::CacheError;
#[cfg(feature = "std")]
pub use group::{get_or_create_group_cache, lookup_group_cache, Getter, GetterFn, GroupCache};
#[cfg(feature = "std")]
pub use peer::{Peer, PeerPicker};
pub use ring::ConsistentHashRing;
#[cfg(feature = "std")]
pub use singleflight::Shots;
