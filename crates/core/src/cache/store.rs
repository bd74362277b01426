//! Bounded, expiring, recency-ordered response cache.
//!
//! Entries live in an arena of slots linked in recency order: the head is the
//! least recently used entry and the first eviction candidate, the tail is the
//! most recently used. A hash index maps keys to slots so lookups, touches and
//! evictions are O(1). Expired entries are only removed when a `get` finds them.
//!
//! The store does no locking. Callers that share it across tasks wrap it in a
//! mutex and hold the guard for a whole operation.

use std::collections::HashMap;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::entry::CacheEntry;
use crate::Error;

/// Snapshot of cache occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CacheStats {
    /// Stored entries, including expired ones not yet cleaned up.
    pub current: usize,
    /// Stored entries whose TTL has elapsed.
    pub expired: usize,
    /// Configured capacity.
    pub max_entries: usize,
}

#[derive(Debug)]
struct Node<V> {
    key: String,
    entry: CacheEntry<V>,
    prev: Option<usize>,
    next: Option<usize>,
}

/// In-memory cache with TTL expiration and LRU eviction.
#[derive(Debug)]
pub struct ResponseCache<V> {
    index: HashMap<String, usize>,
    slots: Vec<Option<Node<V>>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    max_entries: usize,
    default_ttl: Duration,
}

impl<V> ResponseCache<V> {
    /// Create a cache holding at most `max_entries` entries (minimum 1).
    pub fn new(max_entries: usize, default_ttl: Duration) -> Self {
        let max_entries = max_entries.max(1);
        Self {
            index: HashMap::new(),
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            max_entries,
            default_ttl,
        }
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Number of stored entries, expired or not.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Whether `key` is stored. Does not touch recency or check expiry.
    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Return the live value for `key` and mark it most recently used.
    ///
    /// An expired entry is removed and reported as a miss.
    pub fn get(&mut self, key: &str) -> Option<&V> {
        let idx = *self.index.get(key)?;

        if self.node(idx).entry.is_expired_at(Instant::now()) {
            self.remove_slot(idx);
            tracing::trace!(key, "cache entry expired");
            return None;
        }

        self.detach(idx);
        self.push_back(idx);
        Some(&self.node(idx).entry.value)
    }

    /// Store `value` under `key` for `ttl` (or the default TTL).
    ///
    /// Inserting a new key into a full cache evicts the least recently used
    /// entry first. Overwriting an existing key never evicts.
    pub fn set(&mut self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        let key = key.into();
        let entry = CacheEntry::new(value, Instant::now(), ttl.unwrap_or(self.default_ttl));

        if let Some(&idx) = self.index.get(&key) {
            self.node_mut(idx).entry = entry;
            self.detach(idx);
            self.push_back(idx);
            return;
        }

        if self.index.len() >= self.max_entries
            && let Some(lru) = self.head
        {
            let evicted = self.remove_slot(lru);
            tracing::trace!(key = %evicted.key, "evicted least recently used entry");
        }

        let node = Node { key: key.clone(), entry, prev: None, next: None };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(node);
                idx
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        };
        self.index.insert(key, idx);
        self.push_back(idx);
    }

    /// Remove `key` if present.
    pub fn invalidate(&mut self, key: &str) {
        if let Some(&idx) = self.index.get(key) {
            self.remove_slot(idx);
        }
    }

    /// Remove every key matched by `pattern` from its first character.
    ///
    /// Returns the number of entries removed.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidPattern` if `pattern` is not a valid regular expression.
    pub fn invalidate_pattern(&mut self, pattern: &str) -> Result<usize, Error> {
        let regex = Regex::new(&format!("^(?:{pattern})"))?;

        let matched: Vec<usize> = self
            .index
            .iter()
            .filter(|(key, _)| regex.is_match(key))
            .map(|(_, &idx)| idx)
            .collect();

        for &idx in &matched {
            self.remove_slot(idx);
        }

        tracing::debug!(pattern, removed = matched.len(), "invalidated cache entries");
        Ok(matched.len())
    }

    /// Remove all entries.
    pub fn clear(&mut self) {
        self.index.clear();
        self.slots.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
    }

    /// Count stored and expired entries without removing anything.
    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let expired = self
            .slots
            .iter()
            .flatten()
            .filter(|node| node.entry.is_expired_at(now))
            .count();

        CacheStats { current: self.index.len(), expired, max_entries: self.max_entries }
    }

    /// Keys from least to most recently used.
    pub fn keys_by_recency(&self) -> Vec<&str> {
        let mut keys = Vec::with_capacity(self.index.len());
        let mut cursor = self.head;
        while let Some(idx) = cursor {
            let node = self.node(idx);
            keys.push(node.key.as_str());
            cursor = node.next;
        }
        keys
    }

    fn node(&self, idx: usize) -> &Node<V> {
        self.slots[idx].as_ref().expect("linked slot is occupied")
    }

    fn node_mut(&mut self, idx: usize) -> &mut Node<V> {
        self.slots[idx].as_mut().expect("linked slot is occupied")
    }

    fn detach(&mut self, idx: usize) {
        let (prev, next) = {
            let node = self.node(idx);
            (node.prev, node.next)
        };

        match prev {
            Some(p) => self.node_mut(p).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.node_mut(n).prev = prev,
            None => self.tail = prev,
        }

        let node = self.node_mut(idx);
        node.prev = None;
        node.next = None;
    }

    fn push_back(&mut self, idx: usize) {
        let old_tail = self.tail;
        {
            let node = self.node_mut(idx);
            node.prev = old_tail;
            node.next = None;
        }
        match old_tail {
            Some(t) => self.node_mut(t).next = Some(idx),
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
    }

    fn remove_slot(&mut self, idx: usize) -> Node<V> {
        self.detach(idx);
        let node = self.slots[idx].take().expect("linked slot is occupied");
        self.index.remove(&node.key);
        self.free.push(idx);
        node
    }
}
