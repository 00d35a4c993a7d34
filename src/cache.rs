use std::hash::Hash;
use std::sync::Arc;

use ahash::RandomState;
use parking_lot::Mutex;

use crate::buffer::read::StripedReadBuffer;
use crate::buffer::write::{WriteBuffer, WriteOp};
use crate::builder::CacheBuilder;
use crate::metrics::stats::{Metrics, StatsCounter};
use crate::policy::{EvictionPolicy, Policy};
use crate::store::sharded::ShardedStore;
use crate::weigher::Weigher;

// ---------------------------------------------------------------------------
// Cache interior
// ---------------------------------------------------------------------------

/// Shared interior of a [`Cache`].
struct Inner<K, V> {
    store: ShardedStore<K, V>,
    policy: Mutex<Box<dyn Policy<K>>>,
    eviction_policy: EvictionPolicy,
    max_capacity: u64,
    expected_entries: usize,
    build_hasher: RandomState,
    weigher: Box<dyn Weigher<K, V>>,
    read_buf: StripedReadBuffer<K>,
    write_buf: WriteBuffer<K>,
    maintain_lock: Mutex<()>,
    metrics: StatsCounter,
}

// ---------------------------------------------------------------------------
// Cache handle
// ---------------------------------------------------------------------------

/// A concurrent, bounded, weighted in-memory cache.
///
/// Cloning a `Cache` clones the handle, not the data: all clones see the same
/// entries.  The cache's memory is released when the last handle is dropped.
///
/// Reads and writes touch the sharded store directly and defer policy
/// bookkeeping to buffers.  A maintenance pass runs after every write (and
/// whenever the calling thread's read stripe fills up), so a single thread
/// driving the cache always observes the capacity bound after `insert`
/// returns.
///
/// # Example
/// ```
/// let cache: doppio_sim::Cache<i64, u32> = doppio_sim::CacheBuilder::new(100).build().unwrap();
/// cache.insert(1, 5);
/// assert_eq!(cache.get(&1).as_deref(), Some(&5));
/// assert_eq!(cache.get(&2), None);
/// ```
pub struct Cache<K, V> {
    inner: Arc<Inner<K, V>>,
}

impl<K, V> Clone for Cache<K, V> {
    fn clone(&self) -> Self {
        Cache {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> Cache<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    pub(crate) fn new(
        max_capacity: u64,
        num_shards: usize,
        expected_entries: usize,
        eviction_policy: EvictionPolicy,
        build_hasher: RandomState,
        weigher: Box<dyn Weigher<K, V>>,
    ) -> Self {
        let policy = eviction_policy.build(max_capacity, expected_entries, build_hasher.clone());
        let per_shard = expected_entries / num_shards;
        Cache {
            inner: Arc::new(Inner {
                store: ShardedStore::new(num_shards, per_shard, build_hasher.clone()),
                policy: Mutex::new(policy),
                eviction_policy,
                max_capacity,
                expected_entries,
                build_hasher,
                weigher,
                read_buf: StripedReadBuffer::new(),
                write_buf: WriteBuffer::new(),
                maintain_lock: Mutex::new(()),
                metrics: StatsCounter::new(),
            }),
        }
    }

    /// Returns a [`CacheBuilder`] for constructing a new cache.
    pub fn builder(max_capacity: u64) -> CacheBuilder<K, V> {
        CacheBuilder::new(max_capacity)
    }

    #[inline]
    fn weigh(&self, key: &K, value: &V) -> u64 {
        self.inner.weigher.weigh(key, value).max(1)
    }

    // -----------------------------------------------------------------------
    // Hot-path: get
    // -----------------------------------------------------------------------

    /// Returns the value for `key`, counting the hit as an access for the
    /// eviction policy.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        let Some(value) = self.inner.store.get(key) else {
            self.inner.metrics.record_miss();
            return None;
        };
        self.inner.metrics.record_hit();

        if let Err(key) = self.inner.read_buf.offer(key.clone()) {
            self.try_maintain();
            // Still full means another thread is maintaining; drop the hit.
            let _ = self.inner.read_buf.offer(key);
        }
        Some(value)
    }

    // -----------------------------------------------------------------------
    // Hot-path: insert
    // -----------------------------------------------------------------------

    /// Inserts `value` for `key`, replacing any previous value.  Eviction may
    /// occur to stay within capacity, possibly of `key` itself.
    pub fn insert(&self, key: K, value: V) {
        let new_weight = self.weigh(&key, &value);
        let old = self.inner.store.insert(key.clone(), value);

        let op = match old {
            Some(old) => WriteOp::Update {
                old_weight: self.weigh(&key, &old),
                key,
                new_weight,
            },
            None => WriteOp::Add {
                key,
                weight: new_weight,
            },
        };
        self.schedule(op);
    }

    /// Removes the entry for `key`, if present.
    pub fn invalidate(&self, key: &K) {
        if self.inner.store.remove(key).is_some() {
            self.schedule(WriteOp::Remove { key: key.clone() });
        }
    }

    /// Removes all entries and resets the policy's history.
    pub fn invalidate_all(&self) {
        let _guard = self.inner.maintain_lock.lock();
        let mut pending = Vec::new();
        self.inner.read_buf.drain(&mut Vec::new());
        self.inner.write_buf.drain(&mut pending);
        self.inner.store.clear();
        *self.inner.policy.lock() = self.inner.eviction_policy.build(
            self.inner.max_capacity,
            self.inner.expected_entries,
            self.inner.build_hasher.clone(),
        );
    }

    // -----------------------------------------------------------------------
    // Maintenance
    // -----------------------------------------------------------------------

    fn schedule(&self, op: WriteOp<K>) {
        match self.inner.write_buf.push(op) {
            Ok(()) => self.try_maintain(),
            Err(op) => {
                let _guard = self.inner.maintain_lock.lock();
                self.maintain(Some(op));
            }
        }
    }

    fn try_maintain(&self) {
        let Some(_guard) = self.inner.maintain_lock.try_lock() else { return };
        self.maintain(None);
    }

    /// Applies every buffered operation now, blocking on a concurrent
    /// maintenance pass if one is running.
    pub fn run_pending_tasks(&self) {
        let _guard = self.inner.maintain_lock.lock();
        self.maintain(None);
    }

    /// Replays buffered reads, then buffered writes (and `extra`), into the
    /// policy under one lock acquisition.  Caller holds `maintain_lock`.
    fn maintain(&self, extra: Option<WriteOp<K>>) {
        let mut reads: Vec<K> = Vec::new();
        let mut writes: Vec<WriteOp<K>> = Vec::new();
        self.inner.read_buf.drain(&mut reads);
        self.inner.write_buf.drain(&mut writes);
        writes.extend(extra);

        if reads.is_empty() && writes.is_empty() {
            return;
        }

        let mut evicted: Vec<K> = Vec::new();
        {
            let mut policy = self.inner.policy.lock();
            for key in &reads {
                policy.on_access(key);
            }
            for op in writes {
                match op {
                    WriteOp::Add { key, weight } => evicted.extend(policy.on_insert(key, weight)),
                    WriteOp::Update {
                        key,
                        old_weight,
                        new_weight,
                    } => evicted.extend(policy.on_update(&key, old_weight, new_weight)),
                    WriteOp::Remove { key } => policy.on_remove(&key),
                }
            }
        }

        for key in evicted {
            if let Some(value) = self.inner.store.remove(&key) {
                self.inner.metrics.record_eviction(self.weigh(&key, &value));
            }
        }
    }

    // -----------------------------------------------------------------------
    // Introspection
    // -----------------------------------------------------------------------

    pub fn stats(&self) -> Metrics {
        self.inner.metrics.snapshot()
    }

    /// Summed weight of resident entries as seen by the policy.
    pub fn weighted_size(&self) -> u64 {
        self.inner.policy.lock().current_weight()
    }

    pub fn max_capacity(&self) -> u64 {
        self.inner.max_capacity
    }

    pub fn eviction_policy(&self) -> EvictionPolicy {
        self.inner.eviction_policy
    }

    pub fn entry_count(&self) -> usize {
        self.inner.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.store.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.inner.store.contains(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lru(cap: u64) -> Cache<i64, u32> {
        CacheBuilder::new(cap).eviction_policy(EvictionPolicy::Lru).build().unwrap()
    }

    #[test]
    fn buffered_hits_reach_the_policy_before_the_next_write() {
        let cache = lru(2);
        cache.insert(1, 1);
        cache.insert(2, 1);
        assert!(cache.get(&1).is_some()); // 1 becomes MRU
        cache.insert(3, 1); // evicts 2, not 1
        assert!(cache.contains(&1));
        assert!(!cache.contains(&2));
    }

    #[test]
    fn replacing_a_value_updates_weight_accounting() {
        let cache: Cache<i64, u32> = CacheBuilder::new(10)
            .weigher(|_k: &i64, v: &u32| u64::from(*v))
            .build()
            .unwrap();
        cache.insert(5, 3);
        cache.insert(5, 7);
        assert_eq!(cache.weighted_size(), 7);
        assert_eq!(cache.entry_count(), 1);
    }

    #[test]
    fn zero_weight_counts_as_one() {
        let cache: Cache<i64, u32> = CacheBuilder::new(2)
            .eviction_policy(EvictionPolicy::Lru)
            .weigher(|_k: &i64, v: &u32| u64::from(*v))
            .build()
            .unwrap();
        for k in 0..5 {
            cache.insert(k, 0);
        }
        assert_eq!(cache.entry_count(), 2);
        assert_eq!(cache.weighted_size(), 2);
    }

    #[test]
    fn evictions_are_counted_with_their_weight() {
        let cache = lru(3);
        for k in 0..5 {
            cache.insert(k, 1);
        }
        let m = cache.stats();
        assert_eq!(m.evictions, 2);
        assert_eq!(m.evicted_weight, 2);
    }

    #[test]
    fn many_hits_without_writes_do_not_lose_recency() {
        let cache = lru(2);
        cache.insert(1, 1);
        cache.insert(2, 1);
        // Fill and overflow the read stripe several times.
        for _ in 0..100 {
            cache.get(&2);
        }
        cache.get(&1);
        cache.insert(3, 1);
        assert!(cache.contains(&1), "last hit must make key 1 the MRU");
        assert!(!cache.contains(&2));
    }

    #[test]
    fn invalidate_all_empties_the_cache() {
        let cache = lru(10);
        for k in 0..5 {
            cache.insert(k, 1);
        }
        cache.invalidate_all();
        assert!(cache.is_empty());
        assert_eq!(cache.weighted_size(), 0);
    }

    #[test]
    fn invalidate_releases_weight() {
        let cache = lru(10);
        cache.insert(1, 1);
        cache.invalidate(&1);
        assert!(!cache.contains(&1));
        assert_eq!(cache.weighted_size(), 0);
    }
}
