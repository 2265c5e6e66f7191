//! Strict least-recently-used cache.
//!
//! The tile cache needs deterministic eviction: inserting into a full cache
//! must evict exactly the least-recently-touched entry, nothing else. A
//! probabilistic admission policy would make cache behavior untestable, so
//! this is a plain map plus an explicit recency order. Capacities here are
//! tiny (tens of entries), so the O(n) recency updates are irrelevant.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

/// Bounded map with strict LRU eviction.
///
/// Both `get` and `insert` count as a touch and promote the entry to
/// most-recently-used.
#[derive(Debug)]
pub struct LruCache<K, V> {
    capacity: usize,
    map: HashMap<K, V>,
    // Recency order, least-recent at the front.
    order: VecDeque<K>,
}

impl<K: Eq + Hash + Clone, V> LruCache<K, V> {
    /// Creates a cache bounded to `capacity` entries (at least 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            map: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
        }
    }

    /// Looks up a key, promoting it on hit.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        if self.map.contains_key(key) {
            self.promote(key);
        }
        self.map.get(key)
    }

    /// Inserts or replaces an entry, returning the evicted key if the
    /// insert pushed the cache past capacity.
    pub fn insert(&mut self, key: K, value: V) -> Option<K> {
        if self.map.insert(key.clone(), value).is_some() {
            self.promote(&key);
            return None;
        }
        self.order.push_back(key);

        if self.map.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.map.remove(&oldest);
                return Some(oldest);
            }
        }
        None
    }

    pub fn contains(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn promote(&mut self, key: &K) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            if let Some(k) = self.order.remove(pos) {
                self.order.push_back(k);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut cache = LruCache::new(3);
        cache.insert("a", 1);
        cache.insert("b", 2);
        assert_eq!(cache.get(&"a"), Some(&1));
        assert_eq!(cache.get(&"c"), None);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_overflow_evicts_exactly_the_oldest() {
        let mut cache = LruCache::new(3);
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.insert("c", 3);

        let evicted = cache.insert("d", 4);
        assert_eq!(evicted, Some("a"));
        assert!(!cache.contains(&"a"));
        assert!(cache.contains(&"b"));
        assert!(cache.contains(&"c"));
        assert!(cache.contains(&"d"));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_get_promotes_against_eviction() {
        let mut cache = LruCache::new(3);
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.insert("c", 3);

        // Touch "a"; "b" becomes the eviction candidate.
        cache.get(&"a");
        let evicted = cache.insert("d", 4);
        assert_eq!(evicted, Some("b"));
        assert!(cache.contains(&"a"));
    }

    #[test]
    fn test_reinsert_replaces_and_promotes() {
        let mut cache = LruCache::new(2);
        cache.insert("a", 1);
        cache.insert("b", 2);

        assert_eq!(cache.insert("a", 10), None);
        assert_eq!(cache.get(&"a"), Some(&10));

        let evicted = cache.insert("c", 3);
        assert_eq!(evicted, Some("b"));
    }

    #[test]
    fn test_zero_capacity_is_clamped_to_one() {
        let mut cache = LruCache::new(0);
        assert_eq!(cache.insert("a", 1), None);
        assert_eq!(cache.insert("b", 2), Some("a"));
        assert_eq!(cache.len(), 1);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_len_never_exceeds_capacity(
                capacity in 1usize..16,
                keys in proptest::collection::vec(0u32..64, 1..200),
            ) {
                let mut cache = LruCache::new(capacity);
                for k in keys {
                    cache.insert(k, k);
                    prop_assert!(cache.len() <= capacity);
                }
            }

            #[test]
            fn test_distinct_overflow_evicts_in_insertion_order(
                capacity in 1usize..10,
            ) {
                // Insert capacity + 3 distinct keys without touching any:
                // evictions must come back 0, 1, 2.
                let mut cache = LruCache::new(capacity);
                let mut evicted = Vec::new();
                for k in 0..capacity + 3 {
                    if let Some(old) = cache.insert(k, ()) {
                        evicted.push(old);
                    }
                }
                prop_assert_eq!(evicted, vec![0, 1, 2]);
            }
        }
    }
}
