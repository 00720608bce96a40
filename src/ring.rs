//! Consistent-hash ring for peer selection.
//!
//! Maps keys to node identities via virtual-node hashing: each real node is
//! inserted as `replicas` virtual keys scattered around a 32-bit ring, and a
//! lookup binary-searches for the first virtual key at or after the key's
//! own hash, wrapping around to the start if necessary. This is the
//! building block [`crate::peer::HttpPeerPicker`] uses to decide which peer
//! owns a given key.

extern crate alloc;

use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

/// A hash function from arbitrary bytes to a 32-bit ring position.
pub trait RingHash: Send + Sync {
    /// Hashes `data` to a ring position.
    fn hash(&self, data: &[u8]) -> u32;
}

/// The default ring hash: CRC-32 (IEEE polynomial), matching the hash the
/// rest of the peer-selection ecosystem this design is informed by uses.
#[derive(Debug, Default, Clone, Copy)]
pub struct Crc32Hash;

impl RingHash for Crc32Hash {
    fn hash(&self, data: &[u8]) -> u32 {
        crc32fast::hash(data)
    }
}

/// Maps keys to node identities via virtual-node consistent hashing.
///
/// Deterministic for a fixed `(replicas, hash_fn, node set)`: the same key
/// always maps to the same node until the node set changes.
pub struct ConsistentHashRing<H: RingHash = Crc32Hash> {
    replicas: usize,
    hash_fn: H,
    // Sorted ring position -> owning node id. A BTreeMap keeps the ring
    // sorted for free and gives an O(log n) "first entry >= hash" lookup via
    // `range`, rather than maintaining a separate sorted Vec by hand.
    ring: BTreeMap<u32, String>,
}

impl ConsistentHashRing<Crc32Hash> {
    /// Creates a ring with `replicas` virtual nodes per real node, using the
    /// default CRC-32 hash.
    pub fn new(replicas: usize) -> Self {
        Self::with_hash(replicas, Crc32Hash)
    }
}

impl<H: RingHash> ConsistentHashRing<H> {
    /// Creates a ring with `replicas` virtual nodes per real node and an
    /// explicit hash function.
    pub fn with_hash(replicas: usize, hash_fn: H) -> Self {
        ConsistentHashRing {
            replicas,
            hash_fn,
            ring: BTreeMap::new(),
        }
    }

    /// Inserts `replicas` virtual keys for each of `ids` into the ring.
    /// Re-inserting an id already present replaces its virtual keys in
    /// place (same positions, since they are derived deterministically from
    /// the id).
    pub fn add_nodes<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for id in ids {
            let id = id.into();
            for i in 0..self.replicas {
                let virtual_key = format!("{i}{id}");
                let pos = self.hash_fn.hash(virtual_key.as_bytes());
                self.ring.insert(pos, id.clone());
            }
        }
    }

    /// Removes every virtual key belonging to `id`. Absent from the
    /// original design this ring is modeled on; required here so a node can
    /// leave the fleet cleanly, symmetric with `add_nodes`.
    pub fn del_node(&mut self, id: &str) {
        for i in 0..self.replicas {
            let virtual_key = format!("{i}{id}");
            let pos = self.hash_fn.hash(virtual_key.as_bytes());
            if self.ring.get(&pos).map(String::as_str) == Some(id) {
                self.ring.remove(&pos);
            }
        }
    }

    /// Returns the node owning `key`, or `None` if the ring has no nodes.
    pub fn get_node(&self, key: &str) -> Option<&str> {
        if self.ring.is_empty() {
            return None;
        }
        let h = self.hash_fn.hash(key.as_bytes());
        let node = self
            .ring
            .range(h..)
            .next()
            .or_else(|| self.ring.iter().next())
            .map(|(_, id)| id.as_str());
        node
    }

    /// Returns the number of real nodes currently on the ring (virtual keys
    /// divided by `replicas`; accurate as long as every node was inserted
    /// through `add_nodes`).
    pub fn node_count(&self) -> usize {
        self.ring
            .values()
            .collect::<alloc::collections::BTreeSet<_>>()
            .len()
    }

    /// Returns `true` if the ring has no nodes.
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }
}

impl<H: RingHash + core::fmt::Debug> core::fmt::Debug for ConsistentHashRing<H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ConsistentHashRing")
            .field("replicas", &self.replicas)
            .field("virtual_keys", &self.ring.len())
            .finish()
    }
}
