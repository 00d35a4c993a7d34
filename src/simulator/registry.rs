use ahash::AHashSet;

use crate::error::Error;
use crate::policy::EvictionPolicy;

use super::adapter::CachePolicy;
use super::engine::{DefaultEngine, Engine};
use super::event::AccessEvent;
use super::settings::SimulatorSettings;
use super::stats::PolicyStats;

/// One exclusive adapter per configured eviction policy.
///
/// Selectors that fail to parse, and engines that fail to build, are kept in
/// [`rejected`](Self::rejected) instead of failing the whole set.
pub struct PolicySet<E: Engine = DefaultEngine> {
    policies: Vec<CachePolicy<E>>,
    rejected: Vec<Error>,
}

impl<E: Engine> PolicySet<E> {
    pub fn build(settings: &SimulatorSettings) -> Self {
        let mut seen = AHashSet::new();
        let mut policies = Vec::new();
        let mut rejected = Vec::new();

        for name in &settings.eviction_policies {
            let built = name.parse::<EvictionPolicy>().and_then(|policy| {
                if seen.insert(policy) {
                    CachePolicy::exclusive(settings, policy).map(Some)
                } else {
                    Ok(None)
                }
            });
            match built {
                Ok(Some(policy)) => policies.push(policy),
                Ok(None) => log::debug!("skipping duplicate eviction policy {name:?}"),
                Err(err) => {
                    log::warn!("rejected eviction policy {name:?}: {err}");
                    rejected.push(err);
                }
            }
        }
        PolicySet { policies, rejected }
    }

    pub fn policies(&self) -> &[CachePolicy<E>] {
        &self.policies
    }

    pub fn rejected(&self) -> &[Error] {
        &self.rejected
    }

    pub fn get(&self, eviction_policy: EvictionPolicy) -> Option<&CachePolicy<E>> {
        self.policies.iter().find(|p| p.eviction_policy() == eviction_policy)
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Feeds one access to every policy.
    pub fn record(&mut self, event: AccessEvent) {
        for policy in &mut self.policies {
            policy.record(event);
        }
    }

    pub fn finished(&mut self) {
        for policy in &mut self.policies {
            policy.finished();
        }
        for policy in &self.policies {
            log_summary(policy.stats());
        }
    }

    /// Replays `events` in trace order, then finishes every policy.
    pub fn replay<I>(&mut self, events: I)
    where
        I: IntoIterator<Item = AccessEvent>,
    {
        for event in events {
            self.record(event);
        }
        self.finished();
    }

    /// Like [`replay`](Self::replay), with each policy on its own thread.
    pub fn replay_parallel(&mut self, events: &[AccessEvent]) {
        std::thread::scope(|scope| {
            for policy in &mut self.policies {
                scope.spawn(move || {
                    for event in events {
                        policy.record(*event);
                    }
                    policy.finished();
                });
            }
        });
        for policy in &self.policies {
            log_summary(policy.stats());
        }
    }
}

fn log_summary(stats: &PolicyStats) {
    log::info!(
        "{}: {} requests, hit rate {:.2}%, weighted hit rate {:.2}%, {} evictions in {:?}",
        stats.name(),
        stats.request_count(),
        stats.hit_rate() * 100.0,
        stats.weighted_hit_rate() * 100.0,
        stats.eviction_count(),
        stats.elapsed(),
    );
}
