use std::hash::Hash;

use super::arena::Arena;
use super::Policy;

/// The single recency queue.
const QUEUE: usize = 0;

/// O(1) LRU policy backed by an index-arena doubly-linked list.
///
/// Every hit moves the entry to the MRU end; evictions take from the LRU end
/// until the total weight is back within `max_weight`.  An entry heavier than
/// the whole cache evicts everything, itself included.
pub struct LruPolicy<K> {
    arena: Arena<K>,
    max_weight: u64,
}

impl<K: Hash + Eq + Clone + Send> LruPolicy<K> {
    /// Creates a new `LruPolicy` with the given maximum total weight.
    pub fn new(max_weight: u64) -> Self {
        Self::with_capacity(max_weight, 16)
    }

    /// Like [`LruPolicy::new`], pre-sizing the arena for `expected_entries`.
    pub fn with_capacity(max_weight: u64, expected_entries: usize) -> Self {
        LruPolicy {
            arena: Arena::new(1, expected_entries),
            max_weight: max_weight.max(1),
        }
    }

    /// Drains evictions until the total weight is within `max_weight`.
    fn drain_evictions(&mut self) -> Vec<K> {
        let mut evicted = Vec::new();
        while self.arena.total_weight() > self.max_weight {
            let Some(idx) = self.arena.coldest(QUEUE) else { break };
            evicted.extend(self.arena.remove(idx));
        }
        evicted
    }
}

impl<K: Hash + Eq + Clone + Send> Policy<K> for LruPolicy<K> {
    fn on_access(&mut self, key: &K) {
        if let Some(idx) = self.arena.get(key) {
            self.arena.move_to_front(QUEUE, idx);
        }
    }

    fn on_insert(&mut self, key: K, weight: u64) -> Vec<K> {
        match self.arena.get(&key) {
            Some(idx) => {
                self.arena.reweigh(idx, weight);
                self.arena.move_to_front(QUEUE, idx);
            }
            None => {
                self.arena.push_front(QUEUE, key, 0, weight);
            }
        }
        self.drain_evictions()
    }

    fn on_update(&mut self, key: &K, _old_weight: u64, new_weight: u64) -> Vec<K> {
        if let Some(idx) = self.arena.get(key) {
            self.arena.reweigh(idx, new_weight);
            self.arena.move_to_front(QUEUE, idx);
        }
        self.drain_evictions()
    }

    fn on_remove(&mut self, key: &K) {
        if let Some(idx) = self.arena.get(key) {
            self.arena.remove(idx);
        }
    }

    fn current_weight(&self) -> u64 {
        self.arena.total_weight()
    }
}
