//! Error kinds surfaced by the cache engine.
//!
//! A single [`thiserror`](https://docs.rs/thiserror)-derived enum covers
//! every fallible operation in this crate. "No value, no error" (all allowed
//! lookup sources exhausted) is represented as `Ok(Value::empty())`, never a
//! `CacheError` variant.

use alloc::string::String;

extern crate alloc;

/// Errors raised by the cache engine's public operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CacheError {
    /// An empty key was passed to [`crate::group::GroupCache::get`].
    #[error("cache key must not be empty")]
    InvalidKey,

    /// The Bloom filter reported the key as definitely absent.
    #[error("bloom filter rejected key as absent")]
    BloomReject,

    /// Transport or decode error fetching from the owning peer.
    #[error("peer fetch failed: {0}")]
    PeerFailure(String),

    /// The user-supplied loader returned an error.
    #[error("loader failed: {0}")]
    LoaderFailure(String),
}
