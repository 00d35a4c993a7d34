use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::policy::EvictionPolicy;

use super::engine::EngineConfig;

/// Simulator configuration shared by every policy under test.
///
/// Deserializes from JSON with kebab-case keys; absent keys keep their
/// defaults:
///
/// ```
/// use doppio_sim::simulator::SimulatorSettings;
///
/// let settings = SimulatorSettings::from_json(r#"{ "maximum-size": 10, "weighted": true }"#).unwrap();
/// assert_eq!(settings.maximum_size, 10);
/// assert_eq!(settings.eviction_policies, ["TinyLFU", "LRU"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SimulatorSettings {
    /// Capacity: total weight when `weighted`, else entry count.
    pub maximum_size: u64,
    /// Whether event weights count against capacity.
    pub weighted: bool,
    /// Selector names; each one becomes a policy under test.
    pub eviction_policies: Vec<String>,
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        SimulatorSettings {
            maximum_size: 512,
            weighted: false,
            eviction_policies: EvictionPolicy::ALL.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl SimulatorSettings {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn maximum_size(mut self, maximum_size: u64) -> Self {
        self.maximum_size = maximum_size;
        self
    }

    pub fn weighted(mut self, weighted: bool) -> Self {
        self.weighted = weighted;
        self
    }

    pub fn eviction_policies<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.eviction_policies = names.into_iter().map(Into::into).collect();
        self
    }

    /// Engine configuration for one policy under test.
    pub fn engine_config(&self, eviction_policy: EvictionPolicy) -> EngineConfig {
        EngineConfig {
            max_capacity: self.maximum_size,
            weighted: self.weighted,
            eviction_policy,
        }
    }
}
