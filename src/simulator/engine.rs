//! The contract between an adapter and the cache it drives.
//!
//! An engine is created from an [`EngineConfig`], answers lookups with the
//! stored weight (or `None`), accepts upserts, and is destroyed by dropping
//! it.  [`Cache<Key, Weight>`](crate::Cache) is the built-in engine; tests
//! and other harnesses may plug in their own.

use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::Mutex;

use crate::builder::CacheBuilder;
use crate::cache::Cache;
use crate::error::Result;
use crate::policy::EvictionPolicy;

use super::event::{Key, Weight};

/// Largest entry count an unweighted engine pre-allocates for.
const MAX_PRESIZED_ENTRIES: u64 = 1 << 22;

/// The engine every adapter uses unless told otherwise.
pub type DefaultEngine = Cache<Key, Weight>;

/// Engine shared by every adapter holding the same [`EngineConfig`].
pub type SharedEngine<E = DefaultEngine> = Arc<E>;

/// Everything needed to create one engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EngineConfig {
    /// Total weight when `weighted`, else entry count.
    pub max_capacity: u64,
    pub weighted: bool,
    pub eviction_policy: EvictionPolicy,
}

pub trait Engine: Send + Sync + Sized {
    /// Builds a fresh, empty engine.  Fails when the configuration cannot be
    /// honoured (e.g. zero capacity).
    fn create(config: &EngineConfig) -> Result<Self>;

    /// Stored weight for `key`, or `None` when absent.  A hit counts as an
    /// access for the eviction policy.
    fn lookup(&self, key: Key) -> Option<Weight>;

    /// Inserts `key` or replaces its weight.  May evict other entries.
    fn upsert(&self, key: Key, weight: Weight);

    /// Entries evicted so far to stay within capacity.
    fn evictions(&self) -> u64 {
        0
    }
}

impl Engine for Cache<Key, Weight> {
    fn create(config: &EngineConfig) -> Result<Self> {
        let builder = CacheBuilder::new(config.max_capacity).eviction_policy(config.eviction_policy);
        let builder = if config.weighted {
            builder.weigher(|_key: &Key, weight: &Weight| u64::from(*weight))
        } else {
            let presize = config.max_capacity.min(MAX_PRESIZED_ENTRIES);
            builder.initial_capacity(usize::try_from(presize).unwrap_or(usize::MAX))
        };
        builder.build()
    }

    #[inline]
    fn lookup(&self, key: Key) -> Option<Weight> {
        self.get(&key).map(|weight| *weight)
    }

    #[inline]
    fn upsert(&self, key: Key, weight: Weight) {
        self.insert(key, weight);
    }

    fn evictions(&self) -> u64 {
        self.stats().evictions
    }
}

/// Explicit registry of engines shared across adapters.
///
/// Adapters built with the same [`EngineConfig`] through one registry drive
/// the same engine; a different configuration always gets its own.  The
/// registry keeps its engines alive until it is dropped, so a harness that
/// wants process-long sharing keeps one registry for the whole run and
/// passes it to every adapter it builds.
pub struct SharedEngines<E = DefaultEngine> {
    engines: Mutex<AHashMap<EngineConfig, SharedEngine<E>>>,
}

impl<E: Engine> SharedEngines<E> {
    pub fn new() -> Self {
        SharedEngines {
            engines: Mutex::new(AHashMap::new()),
        }
    }

    /// The engine for `config`, created on first request.
    pub fn get_or_create(&self, config: &EngineConfig) -> Result<SharedEngine<E>> {
        let mut engines = self.engines.lock();
        if let Some(engine) = engines.get(config) {
            return Ok(Arc::clone(engine));
        }
        let engine = Arc::new(E::create(config)?);
        log::debug!("created shared {} engine (max_capacity={})", config.eviction_policy, config.max_capacity);
        engines.insert(*config, Arc::clone(&engine));
        Ok(engine)
    }

    pub fn len(&self) -> usize {
        self.engines.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.lock().is_empty()
    }
}

impl<E: Engine> Default for SharedEngines<E> {
    fn default() -> Self {
        Self::new()
    }
}
