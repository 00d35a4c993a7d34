use std::sync::Arc;

use crate::error::Result;
use crate::policy::EvictionPolicy;

use super::engine::{DefaultEngine, Engine, EngineConfig, SharedEngine, SharedEngines};
use super::event::AccessEvent;
use super::settings::SimulatorSettings;
use super::stats::PolicyStats;
use super::{Characteristic, TracePolicy, POLICY_NAME};

/// How an adapter gets hold of its engine.
pub enum Ownership<'a, E = DefaultEngine> {
    /// A dedicated engine, created now and released by `finished()`.
    Exclusive,
    /// The registry's engine for this configuration, shared with every other
    /// adapter that joined it.  Never released by the adapter.
    Shared(&'a SharedEngines<E>),
}

enum Handle<E> {
    /// `None` once released.
    Exclusive(Option<E>),
    Shared(SharedEngine<E>),
}

/// Drives one engine from a trace and keeps hit/miss statistics for it.
///
/// ```
/// use doppio_sim::simulator::{AccessEvent, CachePolicy, SimulatorSettings};
/// use doppio_sim::EvictionPolicy;
///
/// let settings = SimulatorSettings::default().maximum_size(10).weighted(true);
/// let mut policy: CachePolicy = CachePolicy::exclusive(&settings, EvictionPolicy::TinyLfu).unwrap();
/// policy.record(AccessEvent::new(5, 3));
/// policy.record(AccessEvent::new(5, 7));
/// policy.finished();
///
/// assert_eq!(policy.stats().miss_count(), 1);
/// assert_eq!(policy.stats().hits_weight(), 7);
/// ```
pub struct CachePolicy<E: Engine = DefaultEngine> {
    handle: Handle<E>,
    config: EngineConfig,
    stats: PolicyStats,
}

impl<E: Engine> CachePolicy<E> {
    pub fn new(settings: &SimulatorSettings, eviction_policy: EvictionPolicy, ownership: Ownership<'_, E>) -> Result<Self> {
        let config = settings.engine_config(eviction_policy);
        let handle = match ownership {
            Ownership::Exclusive => Handle::Exclusive(Some(E::create(&config)?)),
            Ownership::Shared(engines) => Handle::Shared(engines.get_or_create(&config)?),
        };
        let stats = PolicyStats::new(format!("{POLICY_NAME} ({eviction_policy})"));
        log::debug!(
            "{} adapter ready: {} engine, max_capacity={} weighted={}",
            stats.name(),
            if matches!(handle, Handle::Shared(_)) { "shared" } else { "exclusive" },
            config.max_capacity,
            config.weighted,
        );
        Ok(CachePolicy { handle, config, stats })
    }

    pub fn exclusive(settings: &SimulatorSettings, eviction_policy: EvictionPolicy) -> Result<Self> {
        Self::new(settings, eviction_policy, Ownership::Exclusive)
    }

    pub fn shared(
        settings: &SimulatorSettings,
        eviction_policy: EvictionPolicy,
        engines: &SharedEngines<E>,
    ) -> Result<Self> {
        Self::new(settings, eviction_policy, Ownership::Shared(engines))
    }

    /// Replays one access.
    ///
    /// A miss inserts the key with the event's weight.  A hit whose stored
    /// weight differs from the event's replaces the stored weight.
    ///
    /// # Panics
    ///
    /// Panics if called on an exclusive adapter after [`finished`](Self::finished).
    pub fn record(&mut self, event: AccessEvent) {
        let engine: &E = match &self.handle {
            Handle::Exclusive(Some(engine)) => engine,
            Handle::Exclusive(None) => panic!("{}: record called after finished", self.stats.name()),
            Handle::Shared(engine) => Arc::as_ref(engine),
        };
        self.stats.start();

        let (key, weight) = (event.key(), event.weight());
        match engine.lookup(key) {
            None => {
                engine.upsert(key, weight);
                self.stats.record_weighted_miss(weight);
            }
            Some(stored) => {
                self.stats.record_weighted_hit(weight);
                if stored != weight {
                    engine.upsert(key, weight);
                }
            }
        }
    }

    /// Ends the replay.  An exclusive adapter reports its engine's evictions
    /// and releases the engine; calling this again does nothing.
    pub fn finished(&mut self) {
        self.stats.stop();
        if let Handle::Exclusive(slot) = &mut self.handle {
            if let Some(engine) = slot.take() {
                self.stats.add_evictions(engine.evictions());
                drop(engine);
                log::debug!("{} released its engine", self.stats.name());
            }
        }
    }

    pub fn stats(&self) -> &PolicyStats {
        &self.stats
    }

    /// The engine, unless this adapter already released it.
    pub fn engine(&self) -> Option<&E> {
        match &self.handle {
            Handle::Exclusive(engine) => engine.as_ref(),
            Handle::Shared(engine) => Some(Arc::as_ref(engine)),
        }
    }

    pub fn eviction_policy(&self) -> EvictionPolicy {
        self.config.eviction_policy
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_shared(&self) -> bool {
        matches!(self.handle, Handle::Shared(_))
    }

    pub fn characteristics(&self) -> &'static [Characteristic] {
        if self.config.weighted {
            &[Characteristic::Weighted]
        } else {
            &[]
        }
    }
}

impl<E: Engine> TracePolicy for CachePolicy<E> {
    fn name(&self) -> &str {
        self.stats.name()
    }

    fn characteristics(&self) -> &'static [Characteristic] {
        CachePolicy::characteristics(self)
    }

    fn record(&mut self, event: AccessEvent) {
        CachePolicy::record(self, event)
    }

    fn finished(&mut self) {
        CachePolicy::finished(self)
    }

    fn stats(&self) -> &PolicyStats {
        CachePolicy::stats(self)
    }
}
