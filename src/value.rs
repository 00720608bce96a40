//! Immutable opaque byte payload.
//!
//! `Value` is the unit of storage for every cache layer in this crate: the
//! LRU store, the concurrent cache, and the group-cache orchestrator all
//! move `Value`s around rather than raw `Vec<u8>` so that "empty, no error"
//! has one canonical representation ([`Value::empty`]) across the whole
//! lookup pipeline.

extern crate alloc;

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use core::str;

/// An immutable byte payload, cheap to clone (reference-counted storage).
///
/// Equality is byte equality. `as_bytes` borrows the stored bytes; `to_vec`
/// always returns a fresh, independently-owned copy, so callers may mutate
/// it freely without affecting what is cached.
#[derive(Clone, PartialEq, Eq)]
pub struct Value(Arc<[u8]>);

impl Value {
    /// The canonical zero-length value, returned by a lookup that exhausted
    /// every allowed source without error.
    pub fn empty() -> Self {
        Value(Arc::from(&[][..]))
    }

    /// Wraps an owned byte buffer.
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Value(Arc::from(bytes))
    }

    /// Wraps a borrowed byte slice, copying it.
    pub fn from_slice(bytes: &[u8]) -> Self {
        Value(Arc::from(bytes))
    }

    /// Returns the length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if this value holds no bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrows the stored bytes without copying.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Interprets the stored bytes as UTF-8, borrowing.
    pub fn as_str(&self) -> Result<&str, str::Utf8Error> {
        str::from_utf8(&self.0)
    }

    /// Returns a fresh, owned copy of the stored bytes.
    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::from_slice(s.as_bytes())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::from_vec(s.into_bytes())
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::from_vec(bytes)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Ok(s) => f.debug_tuple("Value").field(&s).finish(),
            Err(_) => f.debug_tuple("Value").field(&self.0).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_has_zero_length() {
        assert_eq!(Value::empty().len(), 0);
        assert!(Value::empty().is_empty());
    }

    #[test]
    fn to_vec_returns_independent_copy() {
        let v = Value::from("hello");
        let mut copy = v.to_vec();
        copy.push(b'!');
        assert_eq!(v.as_str().unwrap(), "hello");
        assert_eq!(copy, b"hello!");
    }

    #[test]
    fn equality_is_byte_equality() {
        assert_eq!(Value::from("abc"), Value::from_vec(alloc::vec![97, 98, 99]));
        assert_ne!(Value::from("abc"), Value::from("abd"));
    }

    #[test]
    fn as_str_roundtrips_utf8() {
        let v = Value::from("caf\u{e9}");
        assert_eq!(v.as_str().unwrap(), "caf\u{e9}");
    }
}
