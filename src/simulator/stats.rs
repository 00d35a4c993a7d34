use std::time::{Duration, Instant};

use super::event::Weight;

/// Hit/miss accumulator owned by one adapter.
///
/// Counts are per access; weights are the summed event weights.  Every
/// recorded event lands in exactly one of the two buckets.
#[derive(Debug, Clone)]
pub struct PolicyStats {
    name: String,
    hit_count: u64,
    miss_count: u64,
    hits_weight: u64,
    misses_weight: u64,
    eviction_count: u64,
    started: Option<Instant>,
    elapsed: Duration,
}

impl PolicyStats {
    pub fn new(name: impl Into<String>) -> Self {
        PolicyStats {
            name: name.into(),
            hit_count: 0,
            miss_count: 0,
            hits_weight: 0,
            misses_weight: 0,
            eviction_count: 0,
            started: None,
            elapsed: Duration::ZERO,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn record_weighted_hit(&mut self, weight: Weight) {
        self.hit_count += 1;
        self.hits_weight += u64::from(weight);
    }

    #[inline]
    pub fn record_weighted_miss(&mut self, weight: Weight) {
        self.miss_count += 1;
        self.misses_weight += u64::from(weight);
    }

    pub fn add_evictions(&mut self, count: u64) {
        self.eviction_count += count;
    }

    /// Starts the replay stopwatch; later calls while running are ignored.
    pub fn start(&mut self) {
        self.started.get_or_insert_with(Instant::now);
    }

    /// Stops the stopwatch, folding the running interval into `elapsed`.
    pub fn stop(&mut self) {
        if let Some(started) = self.started.take() {
            self.elapsed += started.elapsed();
        }
    }

    pub fn hit_count(&self) -> u64 {
        self.hit_count
    }

    pub fn miss_count(&self) -> u64 {
        self.miss_count
    }

    pub fn hits_weight(&self) -> u64 {
        self.hits_weight
    }

    pub fn misses_weight(&self) -> u64 {
        self.misses_weight
    }

    pub fn eviction_count(&self) -> u64 {
        self.eviction_count
    }

    /// Number of recorded accesses.
    pub fn request_count(&self) -> u64 {
        self.hit_count + self.miss_count
    }

    pub fn request_weight(&self) -> u64 {
        self.hits_weight + self.misses_weight
    }

    pub fn hit_rate(&self) -> f64 {
        ratio(self.hit_count, self.request_count())
    }

    pub fn miss_rate(&self) -> f64 {
        ratio(self.miss_count, self.request_count())
    }

    pub fn weighted_hit_rate(&self) -> f64 {
        ratio(self.hits_weight, self.request_weight())
    }

    pub fn weighted_miss_rate(&self) -> f64 {
        ratio(self.misses_weight, self.request_weight())
    }

    /// Replay time, including the running interval if the stopwatch is on.
    pub fn elapsed(&self) -> Duration {
        self.elapsed + self.started.map_or(Duration::ZERO, |s| s.elapsed())
    }
}

fn ratio(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}
