use std::hash::Hash;
use std::sync::Arc;

use ahash::{AHashMap, RandomState};
use parking_lot::RwLock;

// ---------------------------------------------------------------------------
// Shard
// ---------------------------------------------------------------------------

/// Cache-line padding to prevent false sharing between shards.
#[repr(align(64))]
struct Shard<K, V> {
    map: RwLock<AHashMap<K, Arc<V>>>,
}

// ---------------------------------------------------------------------------
// ShardedStore
// ---------------------------------------------------------------------------

/// A thread-safe key-value store backed by `N` independently-locked shards.
///
/// The store holds at most one value per key; `insert` replaces.  It knows
/// nothing about capacity: the cache removes whatever its policy evicts.
pub struct ShardedStore<K, V> {
    shards: Box<[Shard<K, V>]>,
    /// Always `shards.len() - 1`; shards.len() is a power of two.
    shard_mask: usize,
    build_hasher: RandomState,
}

impl<K: Hash + Eq, V> ShardedStore<K, V> {
    /// `num_shards` must be a power of two (the builder validates it).
    pub fn new(num_shards: usize, per_shard: usize, build_hasher: RandomState) -> Self {
        debug_assert!(num_shards.is_power_of_two());
        let shards = (0..num_shards)
            .map(|_| Shard {
                map: RwLock::new(AHashMap::with_capacity(per_shard)),
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();

        ShardedStore {
            shards,
            shard_mask: num_shards - 1,
            build_hasher,
        }
    }

    #[inline]
    fn shard(&self, key: &K) -> &Shard<K, V> {
        let h = self.build_hasher.hash_one(key);
        // High bits: ahash avalanches well there.
        &self.shards[((h >> 32) as usize) & self.shard_mask]
    }

    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        self.shard(key).map.read().get(key).cloned()
    }

    /// Inserts `value` for `key`, returning the previous value, if any.
    pub fn insert(&self, key: K, value: V) -> Option<Arc<V>> {
        self.shard(&key).map.write().insert(key, Arc::new(value))
    }

    pub fn remove(&self, key: &K) -> Option<Arc<V>> {
        self.shard(key).map.write().remove(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.shard(key).map.read().contains_key(key)
    }

    /// Total number of entries across all shards.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.map.read().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|s| s.map.read().is_empty())
    }

    pub fn clear(&self) {
        for shard in self.shards.iter() {
            shard.map.write().clear();
        }
    }
}
