//! Index-arena doubly-linked lists shared by the LRU and W-TinyLFU policies.
//!
//! The arena holds any number of independent queues.  Queue `q` owns the
//! sentinel pair at indices `2q` (head, most-recently-used end) and `2q + 1`
//! (tail, least-recently-used end).  Real entries live after the sentinels
//! and are linked by index, so no raw pointers are involved.
//!
//! Weight bookkeeping is per queue and is kept in sync by every method that
//! links, unlinks or reweighs a node.

use std::hash::Hash;

use ahash::AHashMap;

use super::sketch::MAX_TRACKED_ENTRIES;

const NULL: usize = usize::MAX;

struct Node<K> {
    /// `None` for sentinels and recycled slots.
    key: Option<K>,
    /// Precomputed key hash (only the TinyLFU sketch reads it).
    hash: u64,
    weight: u64,
    prev: usize,
    next: usize,
    queue: usize,
}

pub(crate) struct Arena<K> {
    nodes: Vec<Node<K>>,
    index: AHashMap<K, usize>,
    free_list: Vec<usize>,
    weights: Vec<u64>,
}

impl<K: Hash + Eq + Clone> Arena<K> {
    pub(crate) fn new(queues: usize, expected_entries: usize) -> Self {
        let sentinels = queues * 2;
        let expected_entries = expected_entries.min(MAX_TRACKED_ENTRIES);
        let mut nodes = Vec::with_capacity(sentinels + expected_entries);
        for q in 0..queues {
            let (head, tail) = (2 * q, 2 * q + 1);
            nodes.push(Node {
                key: None,
                hash: 0,
                weight: 0,
                prev: NULL,
                next: tail,
                queue: q,
            });
            nodes.push(Node {
                key: None,
                hash: 0,
                weight: 0,
                prev: head,
                next: NULL,
                queue: q,
            });
        }
        Arena {
            nodes,
            index: AHashMap::with_capacity(expected_entries),
            free_list: Vec::new(),
            weights: vec![0; queues],
        }
    }

    #[inline]
    fn head(queue: usize) -> usize {
        2 * queue
    }

    #[inline]
    fn tail(queue: usize) -> usize {
        2 * queue + 1
    }

    #[inline]
    pub(crate) fn get(&self, key: &K) -> Option<usize> {
        self.index.get(key).copied()
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    #[inline]
    pub(crate) fn weight(&self, idx: usize) -> u64 {
        self.nodes[idx].weight
    }

    #[inline]
    pub(crate) fn hash(&self, idx: usize) -> u64 {
        self.nodes[idx].hash
    }

    #[inline]
    pub(crate) fn queue(&self, idx: usize) -> usize {
        self.nodes[idx].queue
    }

    /// Total weight linked into `queue`.
    #[inline]
    pub(crate) fn queue_weight(&self, queue: usize) -> u64 {
        self.weights[queue]
    }

    pub(crate) fn total_weight(&self) -> u64 {
        self.weights.iter().sum()
    }

    /// Least-recently-used node of `queue`, or `None` when it is empty.
    #[inline]
    pub(crate) fn coldest(&self, queue: usize) -> Option<usize> {
        let idx = self.nodes[Self::tail(queue)].prev;
        (idx != Self::head(queue)).then_some(idx)
    }

    /// Allocates a node for a new key and links it at the MRU end of `queue`.
    pub(crate) fn push_front(&mut self, queue: usize, key: K, hash: u64, weight: u64) -> usize {
        let node = Node {
            key: Some(key.clone()),
            hash,
            weight,
            prev: NULL,
            next: NULL,
            queue,
        };
        let idx = match self.free_list.pop() {
            Some(idx) => {
                self.nodes[idx] = node;
                idx
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        };
        self.index.insert(key, idx);
        self.link_front(queue, idx);
        idx
    }

    /// Moves a linked node to the MRU end of `queue` (which may differ from
    /// its current queue).
    pub(crate) fn move_to_front(&mut self, queue: usize, idx: usize) {
        self.unlink(idx);
        self.link_front(queue, idx);
    }

    /// Changes a linked node's weight, keeping its queue total in step.
    pub(crate) fn reweigh(&mut self, idx: usize, weight: u64) {
        let q = self.nodes[idx].queue;
        self.weights[q] = self.weights[q] - self.nodes[idx].weight + weight;
        self.nodes[idx].weight = weight;
    }

    /// Unlinks and frees a node, returning its key.
    pub(crate) fn remove(&mut self, idx: usize) -> Option<K> {
        self.unlink(idx);
        let key = self.nodes[idx].key.take()?;
        self.index.remove(&key);
        self.free_list.push(idx);
        Some(key)
    }

    fn link_front(&mut self, queue: usize, idx: usize) {
        let head = Self::head(queue);
        let old_first = self.nodes[head].next;
        self.nodes[idx].prev = head;
        self.nodes[idx].next = old_first;
        self.nodes[idx].queue = queue;
        self.nodes[head].next = idx;
        self.nodes[old_first].prev = idx;
        self.weights[queue] += self.nodes[idx].weight;
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = (self.nodes[idx].prev, self.nodes[idx].next);
        if prev == NULL || next == NULL {
            return;
        }
        self.nodes[prev].next = next;
        self.nodes[next].prev = prev;
        self.nodes[idx].prev = NULL;
        self.nodes[idx].next = NULL;
        let q = self.nodes[idx].queue;
        self.weights[q] -= self.nodes[idx].weight;
    }
}
