use std::sync::atomic::{AtomicU64, Ordering};

/// Engine-side counters, updated with relaxed atomics on every operation.
///
/// These count engine events (lookups and evictions).  Simulator statistics
/// are kept separately per adapter in
/// [`PolicyStats`](crate::simulator::PolicyStats).
#[derive(Default)]
pub struct StatsCounter {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    evicted_weight: AtomicU64,
}

impl StatsCounter {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_eviction(&self, weight: u64) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
        self.evicted_weight.fetch_add(weight, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> Metrics {
        Metrics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            evicted_weight: self.evicted_weight.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of engine statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Metrics {
    /// Lookups that found the key.
    pub hits: u64,
    /// Lookups that did not.
    pub misses: u64,
    /// Entries removed to stay within capacity.
    pub evictions: u64,
    /// Summed weight of those entries.
    pub evicted_weight: u64,
}

impl Metrics {
    pub fn request_count(&self) -> u64 {
        self.hits + self.misses
    }

    /// `hits / (hits + misses)`, or `0.0` before the first lookup.
    pub fn hit_rate(&self) -> f64 {
        match self.request_count() {
            0 => 0.0,
            total => self.hits as f64 / total as f64,
        }
    }
}
