//! Hit-rate comparison: the default policy set vs Moka vs QuickCache.
//!
//! Replays one Zipf(s=1.0) trace through every policy built from the
//! simulator settings, then through the reference caches with the same
//! look-up-then-insert procedure.
//!
//! Run with:
//!     cargo run --example hit_rate --release
//!     cargo run --example hit_rate --release -- '{"maximum-size": 50000, "weighted": true}'

use std::time::{Duration, Instant};

use doppio_sim::simulator::{AccessEvent, PolicySet, SimulatorSettings};
use moka::sync::Cache as MokaCache;
use quick_cache::sync::Cache as QuickCache;

/// Key universe size.
const POOL: usize = 100_000;
/// Number of accesses in the trace.
const TRACE: usize = 500_000;
/// Heaviest event weight in weighted mode.
const MAX_WEIGHT: u64 = 8;

// ---------------------------------------------------------------------------
// Zipf(s=1.0) sampler
//
//   P(X ≤ k) ≈ ln(k) / ln(N)   ⟹   k = N^u,  u ~ Uniform(0, 1]
// ---------------------------------------------------------------------------

struct Xorshift64(u64);

impl Xorshift64 {
    fn next(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }

    /// Uniform float in (0, 1].
    fn uniform(&mut self) -> f64 {
        let bits = self.next() >> 11;
        (bits + 1) as f64 / (1u64 << 53) as f64
    }

    /// Zipf(s=1) sample in [0, pool).
    fn zipf(&mut self, pool: usize) -> usize {
        let k = (pool as f64).powf(self.uniform()) as usize;
        k.saturating_sub(1).min(pool - 1)
    }
}

/// Each key keeps one weight for the whole trace, derived from the key.
fn generate_trace(seed: u64, weighted: bool) -> Vec<AccessEvent> {
    let mut rng = Xorshift64(seed);
    (0..TRACE)
        .map(|_| {
            let key = rng.zipf(POOL) as i64;
            let weight = if weighted { 1 + (key as u64 * 2_654_435_761) % MAX_WEIGHT } else { 1 };
            AccessEvent::new(key, weight as u32)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Reference runners
// ---------------------------------------------------------------------------

fn run_moka(trace: &[AccessEvent], settings: &SimulatorSettings) -> (f64, Duration) {
    let builder = MokaCache::builder().max_capacity(settings.maximum_size);
    let cache: MokaCache<i64, u32> = if settings.weighted {
        builder.weigher(|_k: &i64, w: &u32| *w).build()
    } else {
        builder.build()
    };
    let start = Instant::now();
    let mut hits = 0usize;
    for event in trace {
        if cache.get(&event.key()).is_some() {
            hits += 1;
        } else {
            cache.insert(event.key(), event.weight());
        }
    }
    (hits as f64 / trace.len() as f64, start.elapsed())
}

fn run_quick_cache(trace: &[AccessEvent], settings: &SimulatorSettings) -> (f64, Duration) {
    let cache: QuickCache<i64, u32> = QuickCache::new(settings.maximum_size as usize);
    let start = Instant::now();
    let mut hits = 0usize;
    for event in trace {
        if cache.get(&event.key()).is_some() {
            hits += 1;
        } else {
            cache.insert(event.key(), event.weight());
        }
    }
    (hits as f64 / trace.len() as f64, start.elapsed())
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> doppio_sim::Result<()> {
    log_init::init();

    let settings = match std::env::args().nth(1) {
        Some(json) => SimulatorSettings::from_json(&json)?,
        None => SimulatorSettings::default().maximum_size(10_000),
    };

    println!("  Distribution : Zipf(s = 1.0)");
    println!("  Key universe : {POOL:>10} unique keys");
    println!("  Capacity     : {:>10} {}", settings.maximum_size, if settings.weighted { "weight units" } else { "entries" });
    println!("  Trace length : {TRACE:>10} accesses");
    println!();

    let trace = generate_trace(0xDEAD_BEEF_1234_5678, settings.weighted);
    let mut set: PolicySet = PolicySet::build(&settings);
    for err in set.rejected() {
        println!("  skipped: {err}");
    }
    if set.is_empty() {
        return Ok(());
    }
    set.replay_parallel(&trace);

    println!("{:<28} {:>10} {:>10} {:>12}", "Policy", "Hit Rate", "Weighted", "Time (ms)");
    println!("{}", "─".repeat(63));
    for policy in set.policies() {
        let stats = policy.stats();
        println!(
            "{:<28} {:>9.2}% {:>9.2}% {:>12}",
            stats.name(),
            stats.hit_rate() * 100.0,
            stats.weighted_hit_rate() * 100.0,
            stats.elapsed().as_millis(),
        );
    }

    let (rate, elapsed) = run_moka(&trace, &settings);
    println!("{:<28} {:>9.2}% {:>10} {:>12}", "Moka", rate * 100.0, "-", elapsed.as_millis());
    if !settings.weighted {
        let (rate, elapsed) = run_quick_cache(&trace, &settings);
        println!("{:<28} {:>9.2}% {:>10} {:>12}", "QuickCache", rate * 100.0, "-", elapsed.as_millis());
    }
    Ok(())
}
