//! Cache: thread-safe handle around the LRU engine

use std::hash::Hash;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::config::CacheConfig;
use crate::error::Result;
use crate::lru::LruCache;

/// Fixed-capacity LRU cache safe for concurrent callers
///
/// Every operation, lookups included, takes the same exclusive lock:
/// a hit promotes the entry, so there is no read-only path through the
/// recency list. Share across threads with `Arc<Cache<K, V>>`.
pub struct Cache<K, V> {
    inner: Mutex<LruCache<K, V>>,

    /// Fixed at construction, readable without the lock
    capacity: usize,
}

impl<K, V> Cache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Create a new cache with the given capacity
    ///
    /// # Arguments
    /// * `capacity` - Maximum number of entries, at least 1
    ///
    /// # Returns
    /// * `Result<Cache>` - `Error::InvalidCapacity` if `capacity` is 0
    pub fn new(capacity: usize) -> Result<Self> {
        let lru = LruCache::new(capacity)?;
        debug!(capacity, "lru cache created");

        Ok(Self {
            inner: Mutex::new(lru),
            capacity,
        })
    }

    /// Create a new cache from a config section
    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        Self::new(config.capacity)
    }

    /// Look up a value, promoting it to most recently used on a hit
    ///
    /// # Returns
    /// * `Some(value)` - a clone of the stored value
    /// * `None` - key not present; nothing is reordered
    pub fn get(&self, key: &K) -> Option<V> {
        let mut cache = self.inner.lock();
        cache.get(key).cloned()
    }

    /// Look up a value without touching its recency
    pub fn peek(&self, key: &K) -> Option<V> {
        self.inner.lock().peek(key).cloned()
    }

    /// Check whether a key is present without touching its recency
    pub fn contains(&self, key: &K) -> bool {
        self.inner.lock().contains(key)
    }

    /// Insert or overwrite a value, promoting it to most recently used
    ///
    /// A new key arriving at a full cache evicts the least recently used entry.
    pub fn set(&self, key: K, value: V) {
        let mut cache = self.inner.lock();
        if cache.set(key, value).is_some() {
            trace!(len = cache.len(), "evicted least recently used entry");
        }
    }

    /// Alias for [`set`](Self::set)
    pub fn put(&self, key: K, value: V) {
        self.set(key, value)
    }

    /// Remove the least recently used entry; no-op on an empty cache
    pub fn evict(&self) {
        let mut cache = self.inner.lock();
        if cache.evict().is_some() {
            trace!(len = cache.len(), "evicted least recently used entry");
        }
    }

    /// Get the current number of entries
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Get the maximum number of entries
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Snapshot of keys from most to least recently used
    pub fn keys(&self) -> Vec<K> {
        self.inner.lock().keys().cloned().collect()
    }

    /// Verify index and recency list agree; see [`LruCache::check_invariants`]
    pub fn check_invariants(&self) -> Result<()> {
        self.inner.lock().check_invariants()
    }
}
