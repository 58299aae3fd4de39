//! The hash container.

use std::collections::HashMap;
use std::sync::RwLock;

use bytes::Bytes;

/// A field-to-value map with a per-container lock. Field names are
/// binary-safe and compared byte-exact.
#[derive(Debug, Default)]
pub struct Hash {
    inner: RwLock<HashMap<Bytes, Bytes>>,
}

impl Hash {
    pub fn new() -> Hash {
        Hash::default()
    }

    /// Sets a field; returns `true` if the field was newly created.
    pub fn set(&self, field: Bytes, value: Bytes) -> bool {
        self.inner
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .insert(field, value)
            .is_none()
    }

    pub fn get(&self, field: &[u8]) -> Option<Bytes> {
        self.inner
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(field)
            .cloned()
    }

    /// Deletes a field; returns `true` if it was present.
    pub fn del(&self, field: &[u8]) -> bool {
        self.inner
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .remove(field)
            .is_some()
    }

    /// Snapshot of all field/value pairs, in no particular order.
    pub fn entries(&self) -> Vec<(Bytes, Bytes)> {
        self.inner
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .map(|(f, v)| (f.clone(), v.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, field: &[u8]) -> bool {
        self.inner
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .contains_key(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(s: &'static str) -> Bytes {
        Bytes::from_static(s.as_bytes())
    }

    #[test]
    fn set_reports_field_newness() {
        let hash = Hash::new();
        assert!(hash.set(b("f"), b("v1")));
        assert!(!hash.set(b("f"), b("v2")));
        assert_eq!(hash.get(b"f"), Some(b("v2")));
    }

    #[test]
    fn del_reports_presence() {
        let hash = Hash::new();
        hash.set(b("f"), b("v"));
        assert!(hash.del(b"f"));
        assert!(!hash.del(b"f"));
        assert!(hash.is_empty());
    }

    #[test]
    fn get_missing_field() {
        let hash = Hash::new();
        assert_eq!(hash.get(b"nope"), None);
    }

    #[test]
    fn entries_snapshot() {
        let hash = Hash::new();
        hash.set(b("a"), b("1"));
        hash.set(b("b"), b("2"));
        let mut entries = hash.entries();
        entries.sort();
        assert_eq!(entries, vec![(b("a"), b("1")), (b("b"), b("2"))]);
    }

    #[test]
    fn exists() {
        let hash = Hash::new();
        hash.set(b("f"), b("v"));
        assert!(hash.contains(b"f"));
        assert!(!hash.contains(b"g"));
    }
}
