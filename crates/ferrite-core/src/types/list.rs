//! The list container.

use std::collections::VecDeque;
use std::sync::RwLock;

use bytes::Bytes;

/// A double-ended list of binary-safe elements.
///
/// `VecDeque` gives O(1) push/pop at both ends with good cache locality.
/// The lock is per-container: one list under write never blocks operations
/// on any other key.
#[derive(Debug, Default)]
pub struct List {
    inner: RwLock<VecDeque<Bytes>>,
}

impl List {
    pub fn new() -> List {
        List::default()
    }

    /// Pushes to the head and returns the new length.
    pub fn push_front(&self, value: Bytes) -> usize {
        let mut inner = self.inner.write().unwrap_or_else(|p| p.into_inner());
        inner.push_front(value);
        inner.len()
    }

    /// Pushes to the tail and returns the new length.
    pub fn push_back(&self, value: Bytes) -> usize {
        let mut inner = self.inner.write().unwrap_or_else(|p| p.into_inner());
        inner.push_back(value);
        inner.len()
    }

    pub fn pop_front(&self) -> Option<Bytes> {
        self.inner
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .pop_front()
    }

    pub fn pop_back(&self) -> Option<Bytes> {
        self.inner
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .pop_back()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at `index`, counted from the head. No negative indexing;
    /// out of range is `None`.
    pub fn get(&self, index: usize) -> Option<Bytes> {
        self.inner
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(index)
            .cloned()
    }

    /// Elements from `start` to `end`, both inclusive. `end` is capped at
    /// the last element; `start > end` after capping yields an empty vec.
    pub fn range(&self, start: usize, end: usize) -> Vec<Bytes> {
        let inner = self.inner.read().unwrap_or_else(|p| p.into_inner());
        if inner.is_empty() {
            return Vec::new();
        }
        let end = end.min(inner.len() - 1);
        if start > end {
            return Vec::new();
        }
        inner.iter().skip(start).take(end - start + 1).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(s: &'static str) -> Bytes {
        Bytes::from_static(s.as_bytes())
    }

    #[test]
    fn push_returns_new_length() {
        let list = List::new();
        assert_eq!(list.push_back(b("a")), 1);
        assert_eq!(list.push_back(b("b")), 2);
        assert_eq!(list.push_front(b("c")), 3);
    }

    #[test]
    fn push_front_then_pop_front_is_lifo() {
        let list = List::new();
        list.push_front(b("a"));
        list.push_front(b("b"));
        assert_eq!(list.pop_front(), Some(b("b")));
        assert_eq!(list.pop_front(), Some(b("a")));
        assert_eq!(list.pop_front(), None);
    }

    #[test]
    fn push_back_preserves_order() {
        let list = List::new();
        list.push_back(b("1"));
        list.push_back(b("2"));
        assert_eq!(list.pop_front(), Some(b("1")));
        assert_eq!(list.pop_back(), Some(b("2")));
    }

    #[test]
    fn index_within_and_out_of_range() {
        let list = List::new();
        list.push_back(b("x"));
        list.push_back(b("y"));
        assert_eq!(list.get(0), Some(b("x")));
        assert_eq!(list.get(1), Some(b("y")));
        assert_eq!(list.get(2), None);
    }

    #[test]
    fn range_clamps_end() {
        let list = List::new();
        for v in ["a", "b", "c"] {
            list.push_back(Bytes::from_static(v.as_bytes()));
        }
        assert_eq!(list.range(0, 999), vec![b("a"), b("b"), b("c")]);
        assert_eq!(list.range(1, 1), vec![b("b")]);
    }

    #[test]
    fn range_start_past_end_is_empty() {
        let list = List::new();
        list.push_back(b("a"));
        assert!(list.range(5, 9).is_empty());
        assert!(list.range(1, 0).is_empty());
    }

    #[test]
    fn range_on_empty_list() {
        let list = List::new();
        assert!(list.range(0, 10).is_empty());
    }
}
