//! Entry weigher: assigns a cost (weight) to each cached entry.
//!
//! The cache enforces `Σ weight(entry) ≤ max_capacity`.  By default every
//! entry costs 1 unit ([`UnitWeigher`]), so `max_capacity` is a maximum
//! entry count.  A custom weigher bounds something else instead; the
//! simulator's weighted mode uses the stored value itself as the weight.
//!
//! # Example
//! ```
//! use doppio_sim::CacheBuilder;
//!
//! // The value *is* the weight: capacity counts summed weights.
//! let cache: doppio_sim::Cache<i64, u32> = CacheBuilder::new(100)
//!     .weigher(|_key: &i64, weight: &u32| u64::from(*weight))
//!     .build()
//!     .unwrap();
//! cache.insert(1, 60);
//! cache.insert(2, 60);
//! assert!(cache.weighted_size() <= 100);
//! ```

/// Computes the cost of a cache entry.
///
/// Weights below 1 are raised to 1 by the cache so that no entry escapes
/// capacity accounting.
pub trait Weigher<K, V>: Send + Sync + 'static {
    fn weigh(&self, key: &K, value: &V) -> u64;
}

/// Every entry costs exactly 1 unit.  This is the default weigher.
pub struct UnitWeigher;

impl<K, V> Weigher<K, V> for UnitWeigher {
    #[inline]
    fn weigh(&self, _key: &K, _value: &V) -> u64 {
        1
    }
}

/// A weigher backed by a closure.
///
/// Created via [`CacheBuilder::weigher`](crate::CacheBuilder::weigher).
pub struct FnWeigher<F>(pub F);

impl<K, V, F> Weigher<K, V> for FnWeigher<F>
where
    F: Fn(&K, &V) -> u64 + Send + Sync + 'static,
{
    #[inline]
    fn weigh(&self, key: &K, value: &V) -> u64 {
        (self.0)(key, value)
    }
}
