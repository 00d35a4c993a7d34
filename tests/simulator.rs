use std::collections::HashMap;
use std::sync::Arc;

use doppio_sim::simulator::{
    AccessEvent, CachePolicy, Characteristic, Engine, EngineConfig, Key, PolicySet, SharedEngines,
    SimulatorSettings, TracePolicy, Weight,
};
use doppio_sim::{Error, EvictionPolicy, Result};
use parking_lot::Mutex;

#[static_init::constructor(0)]
extern "C" fn _log_init() {
    log_init::init();
}

fn settings(maximum_size: u64, weighted: bool) -> SimulatorSettings {
    SimulatorSettings::default()
        .maximum_size(maximum_size)
        .weighted(weighted)
}

fn exclusive(maximum_size: u64, weighted: bool, policy: EvictionPolicy) -> CachePolicy {
    CachePolicy::exclusive(&settings(maximum_size, weighted), policy).unwrap()
}

/// Unbounded engine that records every call made to it.
#[derive(Default)]
struct SpyEngine {
    entries: Mutex<HashMap<Key, Weight>>,
    upserts: Mutex<Vec<(Key, Weight)>>,
}

impl Engine for SpyEngine {
    fn create(config: &EngineConfig) -> Result<Self> {
        if config.max_capacity == 0 {
            return Err(Error::InvalidCapacity);
        }
        Ok(SpyEngine::default())
    }

    fn lookup(&self, key: Key) -> Option<Weight> {
        self.entries.lock().get(&key).copied()
    }

    fn upsert(&self, key: Key, weight: Weight) {
        self.upserts.lock().push((key, weight));
        self.entries.lock().insert(key, weight);
    }
}

// ---------------------------------------------------------------------------
// Decision procedure
// ---------------------------------------------------------------------------

#[test]
fn miss_then_hit() {
    for policy in EvictionPolicy::ALL {
        let mut adapter = exclusive(10, false, policy);
        adapter.record(AccessEvent::for_key(42));
        adapter.record(AccessEvent::for_key(42));
        let stats = adapter.stats();
        assert_eq!((stats.miss_count(), stats.hit_count()), (1, 1), "{policy}");
    }
}

#[test]
fn weight_update_on_hit() {
    let mut adapter = exclusive(10, true, EvictionPolicy::TinyLfu);
    adapter.record(AccessEvent::new(5, 3));
    adapter.record(AccessEvent::new(5, 7));

    let engine = adapter.engine().unwrap();
    assert_eq!(engine.lookup(5), Some(7));
    assert_eq!(engine.weighted_size(), 7);
    assert_eq!(adapter.stats().hits_weight(), 7);
}

#[test]
fn upserts_only_on_miss_or_changed_weight() {
    let engines: SharedEngines<SpyEngine> = SharedEngines::new();
    let mut adapter =
        CachePolicy::shared(&settings(10, true), EvictionPolicy::Lru, &engines).unwrap();

    adapter.record(AccessEvent::new(1, 4)); // miss
    adapter.record(AccessEvent::new(1, 4)); // hit, same weight
    adapter.record(AccessEvent::new(1, 9)); // hit, new weight
    adapter.record(AccessEvent::new(2, 1)); // miss

    let engine = adapter.engine().unwrap();
    assert_eq!(*engine.upserts.lock(), [(1, 4), (1, 9), (2, 1)]);
    assert_eq!(adapter.stats().hit_count(), 2);
    assert_eq!(adapter.stats().hits_weight(), 13);
}

#[test]
fn every_record_lands_in_exactly_one_bucket() {
    let mut adapter = exclusive(16, true, EvictionPolicy::TinyLfu);
    let mut total_weight = 0u64;
    for i in 0..1_000i64 {
        let event = AccessEvent::new((i * 31) % 97, 1 + (i % 5) as u32);
        total_weight += u64::from(event.weight());
        adapter.record(event);
    }
    let stats = adapter.stats();
    assert_eq!(stats.request_count(), 1_000);
    assert_eq!(stats.request_weight(), total_weight);
}

#[test]
fn capacity_bound_holds_after_every_record() {
    for policy in EvictionPolicy::ALL {
        let mut adapter = exclusive(20, true, policy);
        for i in 0..2_000i64 {
            adapter.record(AccessEvent::new((i * 7) % 61, 1 + (i % 9) as u32));
            let size = adapter.engine().unwrap().weighted_size();
            assert!(size <= 20, "{policy}: weighted size {size} after event {i}");
        }
    }
}

#[test]
fn exclusive_adapters_are_independent() {
    let trace = [1, 2, 1, 3].map(AccessEvent::for_key);
    let mut tiny = exclusive(10, false, EvictionPolicy::TinyLfu);
    let mut lru = exclusive(10, false, EvictionPolicy::Lru);
    for event in trace {
        tiny.record(event);
        lru.record(event);
    }
    for adapter in [&tiny, &lru] {
        let stats = adapter.stats();
        assert_eq!(stats.request_count(), trace.len() as u64, "{}", stats.name());
        assert_eq!((stats.miss_count(), stats.hit_count()), (3, 1), "{}", stats.name());
        assert_eq!(adapter.engine().unwrap().entry_count(), 3, "{}", stats.name());
    }
}

#[test]
fn maximum_capacity_replays_like_any_other() {
    for policy in EvictionPolicy::ALL {
        for weighted in [true, false] {
            let mut adapter = exclusive(u64::MAX, weighted, policy);
            for key in [4, 4, 9] {
                adapter.record(AccessEvent::new(key, 5));
            }
            let stats = adapter.stats();
            assert_eq!((stats.miss_count(), stats.hit_count()), (2, 1), "{policy} weighted={weighted}");
            let expected = if weighted { 10 } else { 2 };
            assert_eq!(adapter.engine().unwrap().weighted_size(), expected, "{policy} weighted={weighted}");
        }
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn lru_thrashes_on_a_cyclic_trace() {
    let mut adapter = exclusive(2, false, EvictionPolicy::Lru);
    for key in [1, 2, 3, 1] {
        adapter.record(AccessEvent::for_key(key));
    }
    adapter.finished();

    let stats = adapter.stats();
    assert_eq!(stats.miss_count(), 4);
    assert_eq!(stats.hit_count(), 0);
    assert!(stats.eviction_count() >= 2);
}

#[test]
fn weighted_hits_use_the_event_weight() {
    for policy in EvictionPolicy::ALL {
        let mut adapter = exclusive(10, true, policy);
        for (key, weight) in [(5, 3), (5, 7), (5, 3)] {
            adapter.record(AccessEvent::new(key, weight));
        }
        let stats = adapter.stats();
        assert_eq!((stats.miss_count(), stats.misses_weight()), (1, 3), "{policy}");
        assert_eq!((stats.hit_count(), stats.hits_weight()), (2, 10), "{policy}");
    }
}

// ---------------------------------------------------------------------------
// Ownership
// ---------------------------------------------------------------------------

#[test]
fn shared_adapters_with_equal_settings_share_one_engine() {
    let engines = SharedEngines::new();
    let s = settings(10, false);
    let mut first: CachePolicy = CachePolicy::shared(&s, EvictionPolicy::Lru, &engines).unwrap();
    let mut second: CachePolicy = CachePolicy::shared(&s, EvictionPolicy::Lru, &engines).unwrap();

    first.record(AccessEvent::for_key(7));
    second.record(AccessEvent::for_key(7));
    assert_eq!(second.stats().hit_count(), 1, "second adapter sees the first one's insert");
    assert_eq!(first.stats().hit_count(), 0, "stats are never shared");
    assert_eq!(engines.len(), 1);
}

#[test]
fn shared_adapters_with_different_settings_do_not_interfere() {
    let engines = SharedEngines::new();
    let mut small: CachePolicy =
        CachePolicy::shared(&settings(2, false), EvictionPolicy::Lru, &engines).unwrap();
    let mut large: CachePolicy =
        CachePolicy::shared(&settings(100, false), EvictionPolicy::Lru, &engines).unwrap();

    small.record(AccessEvent::for_key(1));
    large.record(AccessEvent::for_key(1));
    assert_eq!(large.stats().miss_count(), 1);
    assert_eq!(engines.len(), 2);
}

#[test]
fn shared_engine_outlives_finished_adapters() {
    let engines = SharedEngines::new();
    let s = settings(10, false);
    let mut first: CachePolicy = CachePolicy::shared(&s, EvictionPolicy::TinyLfu, &engines).unwrap();
    first.record(AccessEvent::for_key(3));
    first.finished();
    drop(first);

    let mut second: CachePolicy = CachePolicy::shared(&s, EvictionPolicy::TinyLfu, &engines).unwrap();
    second.record(AccessEvent::for_key(3));
    assert_eq!(second.stats().hit_count(), 1);
}

#[test]
fn finished_releases_the_exclusive_engine() {
    let mut adapter = exclusive(4, false, EvictionPolicy::Lru);
    for key in 0..10 {
        adapter.record(AccessEvent::for_key(key));
    }
    adapter.finished();
    adapter.finished();

    assert!(adapter.engine().is_none());
    assert_eq!(adapter.stats().miss_count(), 10);
    assert_eq!(adapter.stats().eviction_count(), 6);
}

#[test]
fn dropping_a_shared_adapter_releases_only_its_handle() {
    let engines: SharedEngines = SharedEngines::new();
    let engine = engines
        .get_or_create(&settings(4, false).engine_config(EvictionPolicy::Lru))
        .unwrap();
    let adapter: CachePolicy =
        CachePolicy::shared(&settings(4, false), EvictionPolicy::Lru, &engines).unwrap();
    assert_eq!(Arc::strong_count(&engine), 3);
    drop(adapter);
    assert_eq!(Arc::strong_count(&engine), 2);
}

// ---------------------------------------------------------------------------
// Harness seam
// ---------------------------------------------------------------------------

#[test]
fn adapters_behind_the_trace_policy_trait() {
    let mut policies: Vec<Box<dyn TracePolicy>> = vec![
        Box::new(exclusive(10, true, EvictionPolicy::TinyLfu)),
        Box::new(exclusive(10, false, EvictionPolicy::Lru)),
    ];
    for policy in &mut policies {
        policy.record(AccessEvent::new(1, 2));
        policy.record(AccessEvent::new(1, 2));
        policy.finished();
    }
    assert_eq!(policies[0].name(), "product.Doppio (TinyLFU)");
    assert_eq!(policies[0].characteristics(), [Characteristic::Weighted]);
    assert!(policies[1].characteristics().is_empty());
    assert!(policies.iter().all(|p| p.stats().hit_count() == 1));
}

// ---------------------------------------------------------------------------
// Policy set
// ---------------------------------------------------------------------------

#[test]
fn policy_set_replays_every_policy() {
    let mut set: PolicySet = PolicySet::build(&settings(2, false));
    set.replay([1, 2, 3, 1].map(AccessEvent::for_key));

    let lru = set.get(EvictionPolicy::Lru).unwrap();
    assert_eq!(lru.stats().miss_count(), 4);
    for policy in set.policies() {
        assert_eq!(policy.stats().request_count(), 4);
        assert!(policy.engine().is_none(), "replay finishes every policy");
    }
}

#[test]
fn parallel_replay_matches_sequential() {
    let trace: Vec<AccessEvent> = (0..5_000i64)
        .map(|i| AccessEvent::new((i * i + 3 * i) % 211, 1 + (i % 4) as u32))
        .collect();

    let mut sequential: PolicySet = PolicySet::build(&settings(40, true));
    sequential.replay(trace.iter().copied());
    let mut parallel: PolicySet = PolicySet::build(&settings(40, true));
    parallel.replay_parallel(&trace);

    for (s, p) in sequential.policies().iter().zip(parallel.policies()) {
        assert_eq!(s.stats().name(), p.stats().name());
        assert_eq!(s.stats().hit_count(), p.stats().hit_count());
        assert_eq!(s.stats().hits_weight(), p.stats().hits_weight());
    }
}

#[test]
fn policy_set_keeps_rejections() {
    let settings = SimulatorSettings::from_json(
        r#"{ "maximum-size": 8, "eviction-policies": ["TinyLFU", "ARC", "tinylfu"] }"#,
    )
    .unwrap();
    let set: PolicySet = PolicySet::build(&settings);

    assert_eq!(set.len(), 1);
    assert_eq!(set.rejected().len(), 1);
    assert!(set.rejected()[0].to_string().contains("ARC"));
}

#[test]
fn policy_set_over_a_custom_engine() {
    let mut set: PolicySet<SpyEngine> = PolicySet::build(&settings(8, true));
    set.record(AccessEvent::new(9, 2));
    set.record(AccessEvent::new(9, 2));
    for policy in set.policies() {
        assert_eq!(*policy.engine().unwrap().upserts.lock(), [(9, 2)]);
    }
}
