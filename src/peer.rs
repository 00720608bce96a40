//! Peer abstraction and HTTP-based peer picker.
//!
//! A [`Peer`] is a remote cache node this process can ask for a key it does
//! not own. [`PeerPicker`] decides, from a key alone, which peer (if any)
//! owns it — `None` covers both "no peers configured" and "I am the owner".
//!
//! The concrete [`HttpPeer`]/[`HttpPeerPicker`] pair (behind the `http-peer`
//! feature) is the one transport this crate ships: a plain HTTP GET treating
//! the response body as raw value bytes. There is no length-prefixed or
//! protobuf wire format here — that framing is left to integrators who need
//! it.

extern crate alloc;

use crate::error::CacheError;
use crate::ring::ConsistentHashRing;
use crate::value::Value;
use alloc::string::String;
use alloc::sync::Arc;

#[cfg(feature = "http-peer")]
use alloc::vec::Vec;
#[cfg(feature = "http-peer")]
use std::collections::HashMap;
#[cfg(feature = "http-peer")]
use std::io::Read as _;
#[cfg(feature = "http-peer")]
use std::sync::Mutex;

/// The default number of virtual nodes per peer on the consistent-hash ring.
pub const DEFAULT_REPLICAS: usize = 50;

/// The HTTP path peers expose for cache fetches.
pub const DEFAULT_ROUTE: &str = "/_dcache";

/// A remote cache node this process can fetch a key from.
pub trait Peer: Send + Sync {
    /// Fetches `key` from `group` on this peer.
    fn get(&self, group: &str, key: &str) -> Result<Value, CacheError>;

    /// This peer's own address, as registered with the picker. Always a
    /// plain accessor — never derives the address by asking the picker or
    /// any other indirection that could recurse back into this peer.
    fn addr(&self) -> &str;
}

/// Decides, for a given key, which peer owns it.
pub trait PeerPicker: Send + Sync {
    /// Returns the peer that owns `key`, or `None` if there are no peers or
    /// the local process itself owns the key.
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn Peer>>;
}

/// A [`Peer`] reached over plain HTTP.
#[cfg(feature = "http-peer")]
#[derive(Debug)]
pub struct HttpPeer {
    addr: String,
    route: String,
}

#[cfg(feature = "http-peer")]
impl HttpPeer {
    /// Creates a peer at `addr` (e.g. `"10.0.0.12:8080"`), using the default
    /// fetch route.
    pub fn new(addr: impl Into<String>) -> Self {
        Self::with_route(addr, DEFAULT_ROUTE)
    }

    /// Creates a peer at `addr` using an explicit route.
    pub fn with_route(addr: impl Into<String>, route: impl Into<String>) -> Self {
        HttpPeer {
            addr: addr.into(),
            route: route.into(),
        }
    }
}

#[cfg(feature = "http-peer")]
impl Peer for HttpPeer {
    fn get(&self, group: &str, key: &str) -> Result<Value, CacheError> {
        let url = alloc::format!(
            "http://{}{}?group={}&key={}",
            self.addr,
            self.route,
            urlencode(group),
            urlencode(key)
        );
        tracing::trace!(peer = %self.addr, %group, %key, "peer.get");
        let response = ureq::get(&url)
            .call()
            .map_err(|e| CacheError::PeerFailure(alloc::format!("{e}")))?;
        let mut body = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut body)
            .map_err(|e| CacheError::PeerFailure(alloc::format!("reading peer response: {e}")))?;
        Ok(Value::from_vec(body))
    }

    fn addr(&self) -> &str {
        &self.addr
    }
}

#[cfg(feature = "http-peer")]
fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char);
            }
            _ => out.push_str(&alloc::format!("%{b:02X}")),
        }
    }
    out
}

/// A [`PeerPicker`] backed by a [`ConsistentHashRing`] over HTTP peers.
///
/// Holds the local process's own address so `pick_peer` can recognize and
/// skip self-ownership, and a name-to-peer map built from whatever has been
/// registered via [`HttpPeerPicker::set_peers`].
#[cfg(feature = "http-peer")]
pub struct HttpPeerPicker {
    self_addr: String,
    state: Mutex<PickerState>,
}

#[cfg(feature = "http-peer")]
struct PickerState {
    ring: ConsistentHashRing,
    peers: HashMap<String, Arc<dyn Peer>>,
}

#[cfg(feature = "http-peer")]
impl core::fmt::Debug for HttpPeerPicker {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HttpPeerPicker")
            .field("self_addr", &self.self_addr)
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "http-peer")]
impl HttpPeerPicker {
    /// Creates a picker for the local process at `self_addr`, with no peers
    /// registered yet.
    pub fn new(self_addr: impl Into<String>) -> Self {
        Self::with_replicas(self_addr, DEFAULT_REPLICAS)
    }

    /// Creates a picker with an explicit virtual-node replica count.
    pub fn with_replicas(self_addr: impl Into<String>, replicas: usize) -> Self {
        HttpPeerPicker {
            self_addr: self_addr.into(),
            state: Mutex::new(PickerState {
                ring: ConsistentHashRing::new(replicas),
                peers: HashMap::new(),
            }),
        }
    }

    /// Replaces the full peer set. Addresses not in `addrs` are dropped;
    /// new addresses are added to the ring and registered as [`HttpPeer`]s.
    pub fn set_peers(&self, addrs: impl IntoIterator<Item = String>) {
        let mut state = self.state.lock().expect("picker mutex poisoned");
        let PickerState { ring, peers } = &mut *state;
        *ring = ConsistentHashRing::new(DEFAULT_REPLICAS);
        peers.clear();
        let addrs: Vec<String> = addrs.into_iter().collect();
        ring.add_nodes(addrs.iter().cloned());
        for addr in addrs {
            let peer: Arc<dyn Peer> = Arc::new(HttpPeer::new(addr.clone()));
            peers.insert(addr, peer);
        }
    }

    /// Removes a single peer, if present.
    pub fn del_peer(&self, addr: &str) {
        let mut state = self.state.lock().expect("picker mutex poisoned");
        state.ring.del_node(addr);
        state.peers.remove(addr);
    }

    /// Returns the addresses of every peer currently registered.
    pub fn get_peers(&self) -> Vec<String> {
        self.state
            .lock()
            .expect("picker mutex poisoned")
            .peers
            .keys()
            .cloned()
            .collect()
    }
}

#[cfg(feature = "http-peer")]
impl PeerPicker for HttpPeerPicker {
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn Peer>> {
        let state = self.state.lock().expect("picker mutex poisoned");
        let node = state.ring.get_node(key)?;
        if node == self.self_addr {
            return None;
        }
        state.peers.get(node).cloned()
    }
}
