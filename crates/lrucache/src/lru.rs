//! LRU (Least Recently Used) cache engine
//!
//! Entries live in a slot arena and are threaded into a doubly-linked
//! recency list by index, so promotion and eviction are O(1) without
//! shared mutable references. The hash index maps each key to its slot.
//!
//! This type is single-owner: every operation that reorders the list takes
//! `&mut self`. Wrap it in [`Cache`](crate::Cache) to share it across threads.

use std::collections::HashMap;
use std::hash::Hash;
use ahash::RandomState;

use crate::config::CacheConfig;
use crate::error::{Error, Result};

/// Upper bound on slots reserved at construction
const MAX_PREALLOC: usize = 1024;

/// Node in the LRU doubly-linked list
struct Node<K, V> {
    key: K,
    value: V,
    prev: Option<usize>,
    next: Option<usize>,
}

/// LRU cache with fixed capacity
pub struct LruCache<K, V> {
    map: HashMap<K, usize, RandomState>,
    nodes: Vec<Option<Node<K, V>>>,
    /// Most recently used
    head: Option<usize>,
    /// Least recently used, next to be evicted
    tail: Option<usize>,
    free_list: Vec<usize>,
    capacity: usize,
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Create a new LRU cache with the given capacity
    ///
    /// # Returns
    /// * `Err(Error::InvalidCapacity)` - if `capacity` is 0
    pub fn new(capacity: usize) -> Result<Self> {
        CacheConfig::new(capacity).validate()?;

        // One spare slot: a new entry is linked in before the tail is evicted.
        // Large capacities grow on demand instead of allocating up front.
        let hint = capacity.saturating_add(1).min(MAX_PREALLOC);
        Ok(Self {
            map: HashMap::with_capacity_and_hasher(hint, RandomState::new()),
            nodes: Vec::with_capacity(hint),
            head: None,
            tail: None,
            free_list: Vec::new(),
            capacity,
        })
    }

    /// Create a new LRU cache from a validated config
    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        Self::new(config.capacity)
    }

    /// Get a value from the cache, promoting it to most recently used
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let idx = *self.map.get(key)?;
        self.move_to_front(idx);
        self.nodes[idx].as_ref().map(|node| &node.value)
    }

    /// Get a value without touching its recency
    pub fn peek(&self, key: &K) -> Option<&V> {
        let idx = *self.map.get(key)?;
        self.nodes[idx].as_ref().map(|node| &node.value)
    }

    /// Check whether a key is present without touching its recency
    pub fn contains(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    /// Insert or overwrite a key-value pair, promoting it to most recently used
    ///
    /// Inserting a new key into a full cache evicts the least recently used
    /// entry, which is returned.
    pub fn set(&mut self, key: K, value: V) -> Option<(K, V)> {
        if let Some(&idx) = self.map.get(&key) {
            if let Some(node) = &mut self.nodes[idx] {
                node.value = value;
            }
            self.move_to_front(idx);
            return None;
        }

        let idx = self.alloc_node();
        self.nodes[idx] = Some(Node {
            key: key.clone(),
            value,
            prev: None,
            next: None,
        });
        self.link_front(idx);
        self.map.insert(key, idx);

        // A single insert can overshoot by at most one
        if self.map.len() > self.capacity {
            self.evict()
        } else {
            None
        }
    }

    /// Remove the least recently used entry
    ///
    /// Returns `None` if the cache is empty.
    pub fn evict(&mut self) -> Option<(K, V)> {
        let tail_idx = self.tail?;
        self.unlink(tail_idx);
        let node = self.nodes[tail_idx].take()?;
        self.free_node(tail_idx);
        self.map.remove(&node.key);
        Some((node.key, node.value))
    }

    /// Get the current number of entries
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Get the maximum number of entries
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterate keys from most to least recently used
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys {
            nodes: &self.nodes,
            cursor: self.head,
            remaining: self.map.len(),
        }
    }

    /// Walk the recency list and verify it agrees with the index
    ///
    /// Checks length equality, the key bijection, the capacity bound,
    /// head/tail terminators, that forward and backward links mirror
    /// each other, and that the free list names each empty slot exactly
    /// once. O(n); meant for tests and debugging.
    pub fn check_invariants(&self) -> Result<()> {
        let len = self.map.len();
        if len > self.capacity {
            return Err(Error::Invariant(format!(
                "{} entries exceed capacity {}",
                len, self.capacity
            )));
        }

        let live = self.nodes.iter().filter(|slot| slot.is_some()).count();
        if live != len {
            return Err(Error::Invariant(format!(
                "{} live slots but {} indexed keys",
                live, len
            )));
        }

        let mut freed = vec![false; self.nodes.len()];
        for &idx in &self.free_list {
            match self.nodes.get(idx) {
                Some(None) => {}
                _ => {
                    return Err(Error::Invariant(format!(
                        "free slot {} is occupied or out of range",
                        idx
                    )))
                }
            }
            if std::mem::replace(&mut freed[idx], true) {
                return Err(Error::Invariant(format!("slot {} freed twice", idx)));
            }
        }
        if self.free_list.len() + live != self.nodes.len() {
            return Err(Error::Invariant(format!(
                "{} free and {} live slots but arena holds {}",
                self.free_list.len(),
                live,
                self.nodes.len()
            )));
        }

        let mut prev: Option<usize> = None;
        let mut cursor = self.head;
        let mut visited = 0;
        while let Some(idx) = cursor {
            visited += 1;
            if visited > len {
                return Err(Error::Invariant("cycle in recency list".into()));
            }

            let node = self
                .nodes
                .get(idx)
                .and_then(|slot| slot.as_ref())
                .ok_or_else(|| Error::Invariant(format!("slot {} linked but empty", idx)))?;
            if node.prev != prev {
                return Err(Error::Invariant(format!(
                    "slot {} has backward link {:?}, expected {:?}",
                    idx, node.prev, prev
                )));
            }
            if self.map.get(&node.key) != Some(&idx) {
                return Err(Error::Invariant(format!(
                    "slot {} is not the indexed slot for its key",
                    idx
                )));
            }

            prev = Some(idx);
            cursor = node.next;
        }

        if visited != len {
            return Err(Error::Invariant(format!(
                "recency list has {} entries but index has {}",
                visited, len
            )));
        }
        if self.tail != prev {
            return Err(Error::Invariant(format!(
                "tail is {:?} but list ends at {:?}",
                self.tail, prev
            )));
        }

        Ok(())
    }

    fn move_to_front(&mut self, idx: usize) {
        if self.head == Some(idx) {
            return; // Already at front
        }

        self.unlink(idx);
        self.link_front(idx);
    }

    fn link_front(&mut self, idx: usize) {
        if let Some(node) = &mut self.nodes[idx] {
            node.prev = None;
            node.next = self.head;
        }

        match self.head {
            Some(head_idx) => {
                if let Some(head) = &mut self.nodes[head_idx] {
                    head.prev = Some(idx);
                }
            }
            None => {
                self.tail = Some(idx);
            }
        }

        self.head = Some(idx);
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = if let Some(node) = &mut self.nodes[idx] {
            (node.prev.take(), node.next.take())
        } else {
            return;
        };

        match prev {
            Some(prev_idx) => {
                if let Some(prev_node) = &mut self.nodes[prev_idx] {
                    prev_node.next = next;
                }
            }
            None => {
                self.head = next;
            }
        }

        match next {
            Some(next_idx) => {
                if let Some(next_node) = &mut self.nodes[next_idx] {
                    next_node.prev = prev;
                }
            }
            None => {
                self.tail = prev;
            }
        }
    }

    fn alloc_node(&mut self) -> usize {
        if let Some(idx) = self.free_list.pop() {
            idx
        } else {
            let idx = self.nodes.len();
            self.nodes.push(None);
            idx
        }
    }

    fn free_node(&mut self, idx: usize) {
        self.free_list.push(idx);
    }
}

/// Iterator over cache keys, most recently used first
pub struct Keys<'a, K, V> {
    nodes: &'a [Option<Node<K, V>>],
    cursor: Option<usize>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let nodes = self.nodes;
        let node = nodes.get(self.cursor?)?.as_ref()?;
        self.cursor = node.next;
        self.remaining -= 1;
        Some(&node.key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(cache: &LruCache<i32, &'static str>) -> Vec<i32> {
        cache.keys().copied().collect()
    }

    #[test]
    fn test_lru_basic() {
        let mut cache = LruCache::new(2).unwrap();

        cache.set(1, "a");
        cache.set(2, "b");

        assert_eq!(cache.get(&1), Some(&"a"));
        assert_eq!(cache.get(&2), Some(&"b"));
        assert_eq!(cache.len(), 2);
        cache.check_invariants().unwrap();
    }

    #[test]
    fn test_lru_zero_capacity() {
        assert!(matches!(
            LruCache::<i32, i32>::new(0),
            Err(Error::InvalidCapacity(0))
        ));
    }

    #[test]
    fn test_lru_eviction() {
        let mut cache = LruCache::new(2).unwrap();

        cache.set(1, "a");
        cache.set(2, "b");
        let evicted = cache.set(3, "c"); // Should evict 1

        assert_eq!(evicted, Some((1, "a")));
        assert_eq!(cache.get(&1), None);
        assert_eq!(cache.get(&2), Some(&"b"));
        assert_eq!(cache.get(&3), Some(&"c"));
        cache.check_invariants().unwrap();
    }

    #[test]
    fn test_lru_promotion() {
        let mut cache = LruCache::new(2).unwrap();

        cache.set(1, "a");
        cache.set(2, "b");
        cache.get(&1); // Move 1 to front
        cache.set(3, "c"); // Should evict 2

        assert_eq!(cache.get(&1), Some(&"a"));
        assert_eq!(cache.get(&2), None);
        assert_eq!(cache.get(&3), Some(&"c"));
    }

    #[test]
    fn test_lru_overwrite() {
        let mut cache = LruCache::new(2).unwrap();

        cache.set(1, "a");
        cache.set(2, "b");
        assert_eq!(cache.set(1, "z"), None); // Overwrite, no growth

        assert_eq!(cache.len(), 2);
        assert_eq!(order(&cache), vec![1, 2]);
        assert_eq!(cache.peek(&1), Some(&"z"));
        cache.check_invariants().unwrap();
    }

    #[test]
    fn test_lru_miss_leaves_order() {
        let mut cache = LruCache::new(3).unwrap();

        cache.set(1, "a");
        cache.set(2, "b");
        cache.set(3, "c");
        assert_eq!(cache.get(&42), None);

        assert_eq!(order(&cache), vec![3, 2, 1]);
        cache.check_invariants().unwrap();
    }

    #[test]
    fn test_lru_peek_does_not_promote() {
        let mut cache = LruCache::new(2).unwrap();

        cache.set(1, "a");
        cache.set(2, "b");
        assert_eq!(cache.peek(&1), Some(&"a"));
        assert!(cache.contains(&1));
        cache.set(3, "c");

        assert!(!cache.contains(&1));
    }

    #[test]
    fn test_lru_evict_empty() {
        let mut cache = LruCache::<i32, &str>::new(1).unwrap();
        assert_eq!(cache.evict(), None);
        assert!(cache.is_empty());
        cache.check_invariants().unwrap();
    }

    #[test]
    fn test_lru_evict_until_empty() {
        let mut cache = LruCache::new(3).unwrap();

        cache.set(1, "a");
        cache.set(2, "b");
        cache.get(&1);

        assert_eq!(cache.evict(), Some((2, "b")));
        cache.check_invariants().unwrap();
        assert_eq!(cache.evict(), Some((1, "a")));
        cache.check_invariants().unwrap();
        assert_eq!(cache.evict(), None);
        assert!(cache.keys().next().is_none());
    }

    #[test]
    fn test_lru_capacity_one() {
        let mut cache = LruCache::new(1).unwrap();

        cache.set(1, "a");
        assert_eq!(cache.set(2, "b"), Some((1, "a")));
        assert_eq!(cache.get(&2), Some(&"b"));
        assert_eq!(cache.len(), 1);
        cache.check_invariants().unwrap();
    }

    #[test]
    fn test_lru_move_tail_to_front() {
        let mut cache = LruCache::new(3).unwrap();

        cache.set(1, "a");
        cache.set(2, "b");
        cache.set(3, "c");
        cache.get(&1); // tail
        assert_eq!(order(&cache), vec![1, 3, 2]);
        cache.get(&3); // middle
        assert_eq!(order(&cache), vec![3, 1, 2]);
        cache.check_invariants().unwrap();
    }

    #[test]
    fn test_lru_slots_reused() {
        let mut cache = LruCache::new(2).unwrap();

        for i in 0..100 {
            cache.set(i, "x");
        }

        assert_eq!(cache.len(), 2);
        assert!(cache.nodes.len() <= 3);
        cache.check_invariants().unwrap();
    }

    #[test]
    fn test_lru_huge_capacity() {
        let mut cache = LruCache::new(usize::MAX).unwrap();
        assert_eq!(cache.capacity(), usize::MAX);
        assert!(cache.nodes.capacity() <= MAX_PREALLOC);

        cache.set(1, "a");
        assert_eq!(cache.get(&1), Some(&"a"));
        cache.check_invariants().unwrap();

        let cache = LruCache::<u32, u32>::new(1usize << 48).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_keys_exact_size() {
        let mut cache = LruCache::new(4).unwrap();

        cache.set(1, "a");
        cache.set(2, "b");
        cache.set(3, "c");

        let mut keys = cache.keys();
        assert_eq!(keys.len(), 3);
        keys.next();
        assert_eq!(keys.size_hint(), (2, Some(2)));
    }

    #[test]
    fn test_check_invariants_detects_bad_free_list() {
        let mut cache = LruCache::new(2).unwrap();

        cache.set(1, "a");
        cache.set(2, "b");
        cache.set(3, "c"); // frees one slot

        cache.check_invariants().unwrap();
        let free = cache.free_list[0];
        cache.free_list.push(free);
        assert!(matches!(cache.check_invariants(), Err(Error::Invariant(_))));

        cache.free_list.pop();
        let head = cache.head.unwrap();
        cache.free_list.push(head);
        assert!(matches!(cache.check_invariants(), Err(Error::Invariant(_))));
    }

    #[test]
    fn test_check_invariants_detects_corruption() {
        let mut cache = LruCache::new(3).unwrap();

        cache.set(1, "a");
        cache.set(2, "b");
        cache.tail = cache.head;

        assert!(matches!(cache.check_invariants(), Err(Error::Invariant(_))));
    }
}
