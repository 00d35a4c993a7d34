mod arena;
pub mod lru;
pub mod sketch;
pub mod tinylfu;

use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use ahash::RandomState;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Core eviction/admission strategy.
///
/// All methods are called **single-threadedly** by the maintenance path.
/// Implementors only need to be `Send`; `Sync` is not required because
/// the cache wraps the policy in a `Mutex`.
pub trait Policy<K>: Send {
    /// Called when an existing entry is accessed (read hit).
    fn on_access(&mut self, key: &K);

    /// Called when a new entry is inserted.
    ///
    /// Returns the keys that must be evicted to stay within capacity.  The
    /// inserted key itself may be among them when the policy rejects it.
    fn on_insert(&mut self, key: K, weight: u64) -> Vec<K>;

    /// Called when an existing entry's weight changes (value replaced).
    ///
    /// Returns the keys that must be evicted to stay within capacity.
    fn on_update(&mut self, key: &K, old_weight: u64, new_weight: u64) -> Vec<K>;

    /// Called when an entry is explicitly removed.
    fn on_remove(&mut self, key: &K);

    /// Total weight currently tracked by the policy.
    fn current_weight(&self) -> u64;
}

/// Selects the eviction algorithm a cache runs under.
///
/// This is a closed set.  New algorithms are added here and in
/// [`EvictionPolicy::build`]; nothing else in the crate branches on it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EvictionPolicy {
    /// Window TinyLFU: recency window in front of a frequency-gated main area.
    #[default]
    #[serde(rename = "TinyLFU")]
    TinyLfu,
    /// Plain least-recently-used.
    #[serde(rename = "LRU")]
    Lru,
}

impl EvictionPolicy {
    /// Every supported selector, in the order policy sets are built.
    pub const ALL: [EvictionPolicy; 2] = [EvictionPolicy::TinyLfu, EvictionPolicy::Lru];

    pub fn as_str(&self) -> &'static str {
        match self {
            EvictionPolicy::TinyLfu => "TinyLFU",
            EvictionPolicy::Lru => "LRU",
        }
    }

    /// Instantiates the policy for `max_capacity` units of weight.
    ///
    /// `expected_entries` sizes the TinyLFU sketch and the node arenas.
    pub(crate) fn build<K>(
        self,
        max_capacity: u64,
        expected_entries: usize,
        hasher: RandomState,
    ) -> Box<dyn Policy<K>>
    where
        K: Hash + Eq + Clone + Send + 'static,
    {
        match self {
            EvictionPolicy::TinyLfu => Box::new(tinylfu::WTinyLfuPolicy::with_hasher(
                max_capacity,
                expected_entries,
                hasher,
            )),
            EvictionPolicy::Lru => {
                Box::new(lru::LruPolicy::with_capacity(max_capacity, expected_entries))
            }
        }
    }
}

impl fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EvictionPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EvictionPolicy::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnsupportedEvictionPolicy(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("TinyLFU".parse::<EvictionPolicy>().unwrap(), EvictionPolicy::TinyLfu);
        assert_eq!("tinylfu".parse::<EvictionPolicy>().unwrap(), EvictionPolicy::TinyLfu);
        assert_eq!(" lru ".parse::<EvictionPolicy>().unwrap(), EvictionPolicy::Lru);
    }

    #[test]
    fn unknown_name_is_rejected_by_name() {
        let err = "ARC".parse::<EvictionPolicy>().unwrap_err();
        assert!(matches!(&err, Error::UnsupportedEvictionPolicy(n) if n == "ARC"));
        assert!(err.to_string().contains("\"ARC\""), "message was: {err}");
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for p in EvictionPolicy::ALL {
            assert_eq!(p.to_string().parse::<EvictionPolicy>().unwrap(), p);
        }
    }
}
