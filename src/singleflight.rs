//! Single-flight request coalescer.
//!
//! `Shots` collapses concurrent callers asking for the same key into one
//! execution of the supplied closure: the first caller to arrive becomes the
//! executor, every other caller that arrives while it is in flight blocks on
//! a condition variable and receives the same result, and a caller that
//! arrives after the executor has finished starts a fresh execution.
//!
//! Built on `parking_lot::{Mutex, Condvar}` rather than a channel, matching
//! the rest of this crate's concurrency primitives.

extern crate alloc;

use crate::error::CacheError;
use crate::value::Value;
use alloc::string::String;
use alloc::sync::Arc;
use std::collections::HashMap;
use std::sync::Mutex as StdMutex;

use parking_lot::{Condvar, Mutex};

type CallResult = Result<Value, CacheError>;

struct Call {
    done: Mutex<Option<CallResult>>,
    condvar: Condvar,
}

impl Call {
    fn new() -> Self {
        Call {
            done: Mutex::new(None),
            condvar: Condvar::new(),
        }
    }

    fn wait(&self) -> CallResult {
        let mut guard = self.done.lock();
        while guard.is_none() {
            self.condvar.wait(&mut guard);
        }
        guard.clone().expect("checked by the loop condition above")
    }

    fn finish(&self, result: CallResult) {
        *self.done.lock() = Some(result);
        self.condvar.notify_all();
    }
}

/// Registry of in-flight calls, keyed by the caller-supplied key.
///
/// At most one [`Call`] is registered per key at any moment; `do_call`
/// enforces this by checking and inserting under one short-held lock.
pub struct Shots {
    registry: StdMutex<HashMap<String, Arc<Call>>>,
}

impl core::fmt::Debug for Shots {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Shots").finish_non_exhaustive()
    }
}

impl Default for Shots {
    fn default() -> Self {
        Self::new()
    }
}

impl Shots {
    /// Creates an empty coalescer.
    pub fn new() -> Self {
        Shots {
            registry: StdMutex::new(HashMap::new()),
        }
    }

    /// Runs `f` for `key` with single-flight semantics:
    ///
    /// 1. If a call is already registered for `key`, wait for it and return
    ///    its result — `f` is not invoked.
    /// 2. Otherwise register a new call, release the registry lock, and run
    ///    `f` without holding any lock.
    /// 3. Store the result, wake every waiter, then remove the registry
    ///    entry so the next arrival starts fresh.
    pub fn do_call<F>(&self, key: &str, f: F) -> CallResult
    where
        F: FnOnce() -> CallResult,
    {
        let mut registry = self.registry.lock().expect("registry mutex poisoned");
        if let Some(existing) = registry.get(key).cloned() {
            drop(registry);
            tracing::trace!(key, "singleflight.join_in_flight");
            return existing.wait();
        }
        let call = Arc::new(Call::new());
        registry.insert(key.into(), Arc::clone(&call));
        drop(registry);

        let result = f();
        call.finish(result.clone());

        self.registry
            .lock()
            .expect("registry mutex poisoned")
            .remove(key);

        result
    }
}
