//! The keyspace: a concurrent map from key to typed cache item, plus the
//! TTL index that accelerates the background sweeper.
//!
//! Expiration discipline: every operation that observes a key first checks
//! the item's deadline and, when it has passed, removes the key from both
//! the map and the TTL index before proceeding. The per-item `expires_at` is
//! the source of truth; the index exists only so the sweeper doesn't have to
//! walk the whole keyspace.
//!
//! Lock order: the map operation always comes first, the TTL lock second,
//! and the TTL lock is never held across a map iteration. Containers carry
//! their own locks, taken only after the item handle has been cloned out of
//! the map, so no container operation holds a map shard lock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, RwLock};

use bytes::Bytes;
use dashmap::DashMap;

use crate::error::{IncrError, WrongType};
use crate::pattern::glob_match;
use crate::time::{deadline, NO_EXPIRY};
use crate::types::{Hash, List, Set, Value};

/// A stored item: the typed value plus its expiration bookkeeping.
///
/// `expires_at` is atomic so EXPIRE can retarget the deadline of an item
/// that other connections already hold a handle to.
#[derive(Debug)]
pub struct CacheItem {
    value: Value,
    expires_at: AtomicI64,
    created_at: i64,
}

impl CacheItem {
    fn new(value: Value, created_at: i64, expires_at: i64) -> CacheItem {
        CacheItem {
            value,
            expires_at: AtomicI64::new(expires_at),
            created_at,
        }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Absolute Unix-second deadline; [`NO_EXPIRY`] means none.
    pub fn expires_at(&self) -> i64 {
        self.expires_at.load(Ordering::Acquire)
    }

    fn set_expires_at(&self, deadline: i64) {
        self.expires_at.store(deadline, Ordering::Release);
    }

    /// Unix seconds at first write; updates don't touch it.
    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    fn is_expired(&self, now: i64) -> bool {
        let deadline = self.expires_at();
        deadline != NO_EXPIRY && deadline <= now
    }
}

/// Result of a TTL query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlResult {
    /// Key exists and expires in this many seconds.
    Seconds(i64),
    /// Key exists without a deadline.
    NoExpiry,
    /// Key does not exist (or just expired).
    NotFound,
}

/// The concurrent keyspace.
#[derive(Debug, Default)]
pub struct Keyspace {
    items: DashMap<Bytes, Arc<CacheItem>>,
    ttl: RwLock<HashMap<Bytes, i64>>,
}

impl Keyspace {
    pub fn new() -> Keyspace {
        Keyspace::default()
    }

    /// Number of keys currently stored, expired stragglers included.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Loads an item handle, evicting it first if its deadline has passed.
    fn load(&self, key: &[u8], now: i64) -> Option<Arc<CacheItem>> {
        let item = self.items.get(key).map(|entry| entry.value().clone())?;
        if item.is_expired(now) {
            self.items.remove_if(key, |_, it| it.is_expired(now));
            let mut ttl = self.ttl.write().unwrap_or_else(|p| p.into_inner());
            if ttl.get(key).is_some_and(|&d| d <= now) {
                ttl.remove(key);
            }
            return None;
        }
        Some(item)
    }

    /// Inserts an item and reconciles the TTL index with its deadline.
    fn store(&self, key: Bytes, item: CacheItem) {
        let deadline = item.expires_at();
        self.items.insert(key.clone(), Arc::new(item));
        let mut ttl = self.ttl.write().unwrap_or_else(|p| p.into_inner());
        if deadline > NO_EXPIRY {
            ttl.insert(key, deadline);
        } else {
            ttl.remove(&key);
        }
    }

    /// Removes a key and its TTL entry without reporting anything.
    fn remove_entry(&self, key: &[u8]) {
        self.items.remove(key);
        self.ttl
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .remove(key);
    }

    /// Batch removal used by KEYS/SCAN after iteration ends. Items are only
    /// removed if still expired, and index entries only if their recorded
    /// deadline has actually passed, so a concurrently refreshed key
    /// survives.
    fn remove_expired_batch(&self, keys: &[Bytes], now: i64) {
        if keys.is_empty() {
            return;
        }
        for key in keys {
            self.items.remove_if(key, |_, item| item.is_expired(now));
        }
        let mut ttl = self.ttl.write().unwrap_or_else(|p| p.into_inner());
        for key in keys {
            if ttl.get(key).is_some_and(|&d| d <= now) {
                ttl.remove(key);
            }
        }
    }

    // --- string commands ---

    /// SET: stores a string value. An existing string is replaced outright,
    /// deadline included; a live key of any other type is a type error;
    /// rewriting it needs a prior DEL or natural expiration.
    pub fn set_string(
        &self,
        key: Bytes,
        value: Bytes,
        ttl_secs: u32,
        now: i64,
    ) -> Result<(), WrongType> {
        if let Some(item) = self.load(&key, now) {
            if !matches!(item.value(), Value::String(_)) {
                return Err(WrongType);
            }
        }
        let item = CacheItem::new(Value::String(value), now, deadline(now, ttl_secs));
        self.store(key, item);
        Ok(())
    }

    /// GET: the string value, `None` when missing or expired.
    pub fn get_string(&self, key: &Bytes, now: i64) -> Result<Option<Bytes>, WrongType> {
        match self.load(key, now) {
            None => Ok(None),
            Some(item) => match item.value() {
                Value::String(data) => Ok(Some(data.clone())),
                _ => Err(WrongType),
            },
        }
    }

    /// DEL: returns `true` if a live key was removed.
    pub fn delete(&self, key: &Bytes, now: i64) -> bool {
        let removed = self.items.remove(key.as_ref());
        self.ttl
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .remove(key.as_ref());
        matches!(removed, Some((_, item)) if !item.is_expired(now))
    }

    /// EXISTS.
    pub fn exists(&self, key: &Bytes, now: i64) -> bool {
        self.load(key, now).is_some()
    }

    /// EXPIRE: returns `false` when the key is missing. A TTL of 0 clears
    /// the deadline. The stored type is untouched.
    pub fn expire(&self, key: &Bytes, ttl_secs: u32, now: i64) -> bool {
        let Some(item) = self.load(key, now) else {
            return false;
        };
        let deadline = deadline(now, ttl_secs);
        item.set_expires_at(deadline);
        let mut ttl = self.ttl.write().unwrap_or_else(|p| p.into_inner());
        if deadline > NO_EXPIRY {
            ttl.insert(key.clone(), deadline);
        } else {
            ttl.remove(key.as_ref());
        }
        true
    }

    /// TTL query. `load` already evicted anything past its deadline, so a
    /// returned `Seconds` is always positive.
    pub fn ttl(&self, key: &Bytes, now: i64) -> TtlResult {
        match self.load(key, now) {
            None => TtlResult::NotFound,
            Some(item) => match item.expires_at() {
                NO_EXPIRY => TtlResult::NoExpiry,
                deadline => TtlResult::Seconds(deadline - now),
            },
        }
    }

    /// INCR/DECR: treats a missing key as 0, keeps an existing deadline and
    /// creation time.
    pub fn incr_by(&self, key: &Bytes, delta: i64, now: i64) -> Result<i64, IncrError> {
        let existing = self.load(key, now);
        let (current, expires_at, created_at) = match &existing {
            None => (0, NO_EXPIRY, now),
            Some(item) => match item.value() {
                Value::String(raw) => {
                    let parsed = std::str::from_utf8(raw)
                        .ok()
                        .and_then(|s| s.parse::<i64>().ok())
                        .ok_or(IncrError::NotAnInteger)?;
                    (parsed, item.expires_at(), item.created_at())
                }
                _ => return Err(WrongType.into()),
            },
        };

        let next = current.checked_add(delta).ok_or(IncrError::NotAnInteger)?;
        let value = Bytes::from(next.to_string());
        self.store(
            key.clone(),
            CacheItem::new(Value::String(value), created_at, expires_at),
        );
        Ok(next)
    }

    /// GETSET: returns the old string value and stores the new one either
    /// way, keeping an existing deadline and creation time.
    pub fn get_set(&self, key: &Bytes, value: Bytes, now: i64) -> Result<Option<Bytes>, WrongType> {
        let existing = self.load(key, now);
        let (old, expires_at, created_at) = match &existing {
            None => (None, NO_EXPIRY, now),
            Some(item) => match item.value() {
                Value::String(data) => (Some(data.clone()), item.expires_at(), item.created_at()),
                _ => return Err(WrongType),
            },
        };
        self.store(
            key.clone(),
            CacheItem::new(Value::String(value), created_at, expires_at),
        );
        Ok(old)
    }

    // --- list commands ---

    /// LPUSH/RPUSH: creates the list on demand, returns the new length.
    pub fn list_push(
        &self,
        key: &Bytes,
        value: Bytes,
        front: bool,
        now: i64,
    ) -> Result<usize, WrongType> {
        self.load(key, now); // evict a stale deadline before re-creating
        let item = self
            .items
            .entry(key.clone())
            .or_insert_with(|| Arc::new(CacheItem::new(Value::List(List::new()), now, NO_EXPIRY)))
            .clone();
        match item.value() {
            Value::List(list) => Ok(if front {
                list.push_front(value)
            } else {
                list.push_back(value)
            }),
            _ => Err(WrongType),
        }
    }

    /// LPOP/RPOP: `None` when the key is missing or the list empty. Popping
    /// the last element removes the key.
    pub fn list_pop(&self, key: &Bytes, front: bool, now: i64) -> Result<Option<Bytes>, WrongType> {
        let Some(item) = self.load(key, now) else {
            return Ok(None);
        };
        let Value::List(list) = item.value() else {
            return Err(WrongType);
        };
        let popped = if front {
            list.pop_front()
        } else {
            list.pop_back()
        };
        if popped.is_some() && list.is_empty() {
            self.remove_entry(key);
        }
        Ok(popped)
    }

    /// LLEN: 0 for a missing key.
    pub fn list_len(&self, key: &Bytes, now: i64) -> Result<usize, WrongType> {
        match self.load(key, now) {
            None => Ok(0),
            Some(item) => match item.value() {
                Value::List(list) => Ok(list.len()),
                _ => Err(WrongType),
            },
        }
    }

    /// LINDEX: `None` when the key is missing or the index out of range.
    pub fn list_index(
        &self,
        key: &Bytes,
        index: usize,
        now: i64,
    ) -> Result<Option<Bytes>, WrongType> {
        match self.load(key, now) {
            None => Ok(None),
            Some(item) => match item.value() {
                Value::List(list) => Ok(list.get(index)),
                _ => Err(WrongType),
            },
        }
    }

    /// LRANGE: empty for a missing key.
    pub fn list_range(
        &self,
        key: &Bytes,
        start: usize,
        end: usize,
        now: i64,
    ) -> Result<Vec<Bytes>, WrongType> {
        match self.load(key, now) {
            None => Ok(Vec::new()),
            Some(item) => match item.value() {
                Value::List(list) => Ok(list.range(start, end)),
                _ => Err(WrongType),
            },
        }
    }

    // --- set commands ---

    /// SADD: creates the set on demand, returns whether the member was new.
    pub fn set_add(&self, key: &Bytes, member: Bytes, now: i64) -> Result<bool, WrongType> {
        self.load(key, now);
        let item = self
            .items
            .entry(key.clone())
            .or_insert_with(|| Arc::new(CacheItem::new(Value::Set(Set::new()), now, NO_EXPIRY)))
            .clone();
        match item.value() {
            Value::Set(set) => Ok(set.add(member)),
            _ => Err(WrongType),
        }
    }

    /// SREM: removing the last member removes the key.
    pub fn set_remove(&self, key: &Bytes, member: &[u8], now: i64) -> Result<bool, WrongType> {
        let Some(item) = self.load(key, now) else {
            return Ok(false);
        };
        let Value::Set(set) = item.value() else {
            return Err(WrongType);
        };
        let removed = set.remove(member);
        if set.card() == 0 {
            self.remove_entry(key);
        }
        Ok(removed)
    }

    /// SMEMBERS: unordered snapshot, empty for a missing key.
    pub fn set_members(&self, key: &Bytes, now: i64) -> Result<Vec<Bytes>, WrongType> {
        match self.load(key, now) {
            None => Ok(Vec::new()),
            Some(item) => match item.value() {
                Value::Set(set) => Ok(set.members()),
                _ => Err(WrongType),
            },
        }
    }

    /// SCARD: 0 for a missing key.
    pub fn set_card(&self, key: &Bytes, now: i64) -> Result<usize, WrongType> {
        match self.load(key, now) {
            None => Ok(0),
            Some(item) => match item.value() {
                Value::Set(set) => Ok(set.card()),
                _ => Err(WrongType),
            },
        }
    }

    /// SISMEMBER.
    pub fn set_contains(&self, key: &Bytes, member: &[u8], now: i64) -> Result<bool, WrongType> {
        match self.load(key, now) {
            None => Ok(false),
            Some(item) => match item.value() {
                Value::Set(set) => Ok(set.contains(member)),
                _ => Err(WrongType),
            },
        }
    }

    // --- hash commands ---

    /// HSET: creates the hash on demand, returns whether the field was new.
    pub fn hash_set(
        &self,
        key: &Bytes,
        field: Bytes,
        value: Bytes,
        now: i64,
    ) -> Result<bool, WrongType> {
        self.load(key, now);
        let item = self
            .items
            .entry(key.clone())
            .or_insert_with(|| Arc::new(CacheItem::new(Value::Hash(Hash::new()), now, NO_EXPIRY)))
            .clone();
        match item.value() {
            Value::Hash(hash) => Ok(hash.set(field, value)),
            _ => Err(WrongType),
        }
    }

    /// HGET: `None` when the key or field is missing.
    pub fn hash_get(&self, key: &Bytes, field: &[u8], now: i64) -> Result<Option<Bytes>, WrongType> {
        match self.load(key, now) {
            None => Ok(None),
            Some(item) => match item.value() {
                Value::Hash(hash) => Ok(hash.get(field)),
                _ => Err(WrongType),
            },
        }
    }

    /// HDEL: deleting the last field removes the key.
    pub fn hash_del(&self, key: &Bytes, field: &[u8], now: i64) -> Result<bool, WrongType> {
        let Some(item) = self.load(key, now) else {
            return Ok(false);
        };
        let Value::Hash(hash) = item.value() else {
            return Err(WrongType);
        };
        let removed = hash.del(field);
        if hash.is_empty() {
            self.remove_entry(key);
        }
        Ok(removed)
    }

    /// HGETALL: snapshot of field/value pairs, empty for a missing key.
    pub fn hash_entries(&self, key: &Bytes, now: i64) -> Result<Vec<(Bytes, Bytes)>, WrongType> {
        match self.load(key, now) {
            None => Ok(Vec::new()),
            Some(item) => match item.value() {
                Value::Hash(hash) => Ok(hash.entries()),
                _ => Err(WrongType),
            },
        }
    }

    /// HLEN: 0 for a missing key.
    pub fn hash_len(&self, key: &Bytes, now: i64) -> Result<usize, WrongType> {
        match self.load(key, now) {
            None => Ok(0),
            Some(item) => match item.value() {
                Value::Hash(hash) => Ok(hash.len()),
                _ => Err(WrongType),
            },
        }
    }

    /// HEXISTS.
    pub fn hash_contains(&self, key: &Bytes, field: &[u8], now: i64) -> Result<bool, WrongType> {
        match self.load(key, now) {
            None => Ok(false),
            Some(item) => match item.value() {
                Value::Hash(hash) => Ok(hash.contains(field)),
                _ => Err(WrongType),
            },
        }
    }

    // --- keyspace iteration ---

    /// KEYS: every live key matching the glob pattern. Expired keys met
    /// along the way are collected and removed in one batch after the
    /// iteration ends.
    pub fn keys(&self, pattern: &[u8], now: i64) -> Vec<Bytes> {
        let mut matched = Vec::new();
        let mut expired = Vec::new();
        for entry in self.items.iter() {
            if entry.value().is_expired(now) {
                expired.push(entry.key().clone());
            } else if glob_match(pattern, entry.key()) {
                matched.push(entry.key().clone());
            }
        }
        self.remove_expired_batch(&expired, now);
        matched
    }

    /// SCAN: positional cursor over a sorted snapshot of live keys.
    ///
    /// Takes the snapshot, sorts it byte-lexicographically, returns the
    /// pattern-filtered slice `[cursor, cursor + batch)` and the next
    /// cursor (0 at the end). The cursor indexes the snapshot and is not
    /// stable across concurrent writes.
    pub fn scan(&self, cursor: u32, pattern: &[u8], batch: usize, now: i64) -> (u32, Vec<Bytes>) {
        let mut keys = Vec::new();
        let mut expired = Vec::new();
        for entry in self.items.iter() {
            if entry.value().is_expired(now) {
                expired.push(entry.key().clone());
            } else {
                keys.push(entry.key().clone());
            }
        }
        self.remove_expired_batch(&expired, now);

        keys.sort();

        let start = cursor as usize;
        if start >= keys.len() {
            return (0, Vec::new());
        }
        let end = (start + batch).min(keys.len());
        let next_cursor = if end == keys.len() { 0 } else { end as u32 };
        let page = keys[start..end]
            .iter()
            .filter(|key| glob_match(pattern, key))
            .cloned()
            .collect();
        (next_cursor, page)
    }

    /// One sweeper pass: collect every indexed key whose deadline has
    /// passed, then delete outside the TTL lock. Returns how many items
    /// were evicted.
    ///
    /// A key refreshed between the collect and the delete survives both
    /// the map removal (`remove_if` re-checks) and the index removal (the
    /// recorded deadline is re-checked under the write lock).
    pub fn purge_expired(&self, now: i64) -> usize {
        let expired: Vec<Bytes> = {
            let ttl = self.ttl.read().unwrap_or_else(|p| p.into_inner());
            ttl.iter()
                .filter(|(_, &deadline)| deadline <= now)
                .map(|(key, _)| key.clone())
                .collect()
        };

        let mut removed = 0;
        for key in &expired {
            if self
                .items
                .remove_if(key, |_, item| item.is_expired(now))
                .is_some()
            {
                removed += 1;
            }
        }

        let mut ttl = self.ttl.write().unwrap_or_else(|p| p.into_inner());
        for key in &expired {
            if ttl.get(key).is_some_and(|&d| d <= now) {
                ttl.remove(key);
            }
        }
        removed
    }
}
