//! The set container.

use std::collections::HashSet;
use std::sync::RwLock;

use bytes::Bytes;

/// An unordered set of binary-safe members with a per-container lock.
#[derive(Debug, Default)]
pub struct Set {
    inner: RwLock<HashSet<Bytes>>,
}

impl Set {
    pub fn new() -> Set {
        Set::default()
    }

    /// Adds a member; returns `true` if it was newly inserted.
    pub fn add(&self, member: Bytes) -> bool {
        self.inner
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .insert(member)
    }

    /// Removes a member; returns `true` if it was present.
    pub fn remove(&self, member: &[u8]) -> bool {
        self.inner
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .remove(member)
    }

    /// Snapshot of all members, in no particular order.
    pub fn members(&self) -> Vec<Bytes> {
        self.inner
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    pub fn card(&self) -> usize {
        self.inner.read().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn contains(&self, member: &[u8]) -> bool {
        self.inner
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .contains(member)
    }
}
