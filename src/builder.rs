use std::hash::Hash;

use ahash::RandomState;

use crate::cache::Cache;
use crate::error::{Error, Result};
use crate::policy::EvictionPolicy;
use crate::weigher::{FnWeigher, UnitWeigher, Weigher};

/// Seed used unless [`CacheBuilder::hash_seed`] overrides it.  A fixed seed
/// makes admission decisions repeatable across runs of the same trace.
pub const DEFAULT_HASH_SEED: u64 = 0x0DA4_1D55_73E1_B71E;

/// Upper bound on pre-allocation when no initial capacity is given.  Weighted
/// capacities are often byte counts, far larger than the entry count.
const DEFAULT_EXPECTED_ENTRIES: u64 = 1 << 16;

/// Upper bound on any presizing request.
const MAX_EXPECTED_ENTRIES: usize = 1 << 22;

/// Builder for configuring and constructing a [`Cache`].
///
/// # Example
/// ```
/// use doppio_sim::{CacheBuilder, EvictionPolicy};
///
/// let cache: doppio_sim::Cache<i64, u32> = CacheBuilder::new(1_000)
///     .eviction_policy(EvictionPolicy::Lru)
///     .build()
///     .unwrap();
/// cache.insert(7, 1);
/// assert_eq!(cache.get(&7).as_deref(), Some(&1));
/// ```
pub struct CacheBuilder<K, V> {
    max_capacity: u64,
    num_shards: usize,
    initial_capacity: Option<usize>,
    eviction_policy: EvictionPolicy,
    hash_seed: u64,
    weigher: Box<dyn Weigher<K, V>>,
}

impl<K: 'static, V: 'static> CacheBuilder<K, V> {
    /// Starts a builder for a cache holding at most `max_capacity` units of
    /// weight.  A zero capacity is rejected by [`build`](Self::build).
    pub fn new(max_capacity: u64) -> Self {
        CacheBuilder {
            max_capacity,
            num_shards: 64,
            initial_capacity: None,
            eviction_policy: EvictionPolicy::default(),
            hash_seed: DEFAULT_HASH_SEED,
            weigher: Box::new(UnitWeigher),
        }
    }

    /// Set the number of internal shards (must be a power of two; default: 64).
    pub fn num_shards(mut self, n: usize) -> Self {
        self.num_shards = n;
        self
    }

    /// Pre-size internal tables for `n` entries.
    pub fn initial_capacity(mut self, n: usize) -> Self {
        self.initial_capacity = Some(n);
        self
    }

    /// Select the eviction algorithm (default: W-TinyLFU).
    pub fn eviction_policy(mut self, policy: EvictionPolicy) -> Self {
        self.eviction_policy = policy;
        self
    }

    /// Seed for every hash the cache computes (sharding, sketch, doorkeeper).
    pub fn hash_seed(mut self, seed: u64) -> Self {
        self.hash_seed = seed;
        self
    }

    /// Set a custom entry weigher via closure.
    pub fn weigher<F>(mut self, f: F) -> Self
    where
        F: Fn(&K, &V) -> u64 + Send + Sync + 'static,
    {
        self.weigher = Box::new(FnWeigher(f));
        self
    }
}

impl<K, V> CacheBuilder<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    pub fn build(self) -> Result<Cache<K, V>> {
        if self.max_capacity == 0 {
            return Err(Error::InvalidCapacity);
        }
        if !self.num_shards.is_power_of_two() {
            return Err(Error::InvalidShardCount(self.num_shards));
        }

        let expected_entries = self
            .initial_capacity
            .unwrap_or_else(|| usize::try_from(self.max_capacity.min(DEFAULT_EXPECTED_ENTRIES)).unwrap_or(usize::MAX))
            .min(MAX_EXPECTED_ENTRIES);
        let s = self.hash_seed;
        let hasher = RandomState::with_seeds(s, s.rotate_left(16), s.rotate_left(32), s.rotate_left(48));

        log::debug!(
            "building {} cache: max_capacity={} shards={} expected_entries={}",
            self.eviction_policy,
            self.max_capacity,
            self.num_shards,
            expected_entries,
        );

        Ok(Cache::new(
            self.max_capacity,
            self.num_shards,
            expected_entries,
            self.eviction_policy,
            hasher,
            self.weigher,
        ))
    }
}
