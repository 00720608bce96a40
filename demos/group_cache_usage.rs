//! Group Cache Usage Example
//!
//! Demonstrates the top-level `GroupCache` orchestrator: a named group
//! backed by a loader closure, with a peer picker attached so keys owned by
//! another process are fetched remotely instead of recomputed locally.

extern crate ringcache;

use ringcache::config::GroupCacheConfig;
use ringcache::group::{Getter, GetterFn};
use ringcache::peer::HttpPeerPicker;
use ringcache::{GroupCache, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

fn main() {
    tracing_subscriber::fmt::init();

    let computations = Arc::new(AtomicUsize::new(0));
    let loader_computations = Arc::clone(&computations);
    let getter: Arc<dyn Getter> = Arc::new(GetterFn(move |group: &str, key: &str| {
        loader_computations.fetch_add(1, Ordering::SeqCst);
        println!("computing {group}/{key} from source of record");
        Ok(Value::from(format!("{key}-computed-at-{:?}", Instant::now())))
    }));

    let config = GroupCacheConfig::default()
        .with_max_bytes(1 << 20)
        .with_bloom(10_000, 0.01);

    // With no peers registered, pick_peer always returns None and every
    // lookup falls through to the loader above.
    let picker = Arc::new(HttpPeerPicker::new("127.0.0.1:9000"));
    let group = GroupCache::new("demo-group", config, getter).with_peer_picker(picker.clone());

    for key in ["alice", "bob", "alice", "carol", "alice"] {
        let value = group.get(key).expect("lookup failed");
        println!("{key} -> {}", value.as_str().unwrap());
    }

    println!(
        "loader ran {} times for 5 lookups across 3 distinct keys",
        computations.load(Ordering::SeqCst)
    );

    picker.set_peers(["127.0.0.1:9001".into(), "127.0.0.1:9002".into()]);
    println!("peers registered: {:?}", picker.get_peers());
}
