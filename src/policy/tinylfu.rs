use std::hash::Hash;

use ahash::RandomState;

use super::arena::Arena;
use super::sketch::Popularity;
use super::Policy;

const WINDOW: usize = 0;
const PROBATION: usize = 1;
const PROTECTED: usize = 2;

/// W-TinyLFU eviction policy.
///
/// ## Algorithm
///
/// Capacity is partitioned into three segments:
///
/// | Segment       | Share            | Role |
/// |---------------|------------------|------|
/// | **Window**    | 1 % of capacity  | Admits every new entry; gives newcomers a chance to build frequency |
/// | **Probation** | rest of main     | Entries awaiting a second access; source of eviction victims |
/// | **Protected** | 80 % of main     | Entries accessed again while in probation |
///
/// ### Write path
/// 1. Every insert or update counts as an access in the popularity sketch.
/// 2. A new entry lands at the Window MRU.
/// 3. Window overflow turns the Window LRU entry into a **candidate** for
///    the main area.  It is admitted outright while main has room.
/// 4. Otherwise the candidate duels the Probation LRU **victim** (falling
///    back to the Protected LRU when Probation is empty).  A strictly more
///    popular candidate evicts the victim and duels the next one; a tie
///    keeps the incumbent and evicts the candidate.
/// 5. A candidate heavier than the whole main area is evicted at once.
///
/// ### Read path
/// 1. The access is recorded in the sketch.
/// 2. Probation hit → promoted to Protected MRU, demoting the Protected LRU
///    back to Probation when Protected overflows.
///
/// Weight changes on existing entries run the same capacity checks, so the
/// total weight never exceeds the configured maximum after a call returns.
///
/// ## References
/// - Einziger, Friedman, Manes (2017). *TinyLFU: A Highly Efficient Cache
///   Admission Policy.* ACM Transactions on Storage.
pub struct WTinyLfuPolicy<K> {
    popularity: Popularity,
    build_hasher: RandomState,
    arena: Arena<K>,
    max_total: u64,
    /// ~1 % of `max_total`; minimum 1.
    max_window: u64,
    /// `max_total - max_window`.
    max_main: u64,
    /// ~80 % of main; minimum 1.
    max_protected: u64,
}

impl<K: Hash + Eq + Clone + Send> WTinyLfuPolicy<K> {
    /// Creates a new policy with a caller-supplied hasher.
    ///
    /// The cache passes its own seeded hasher so that replays of the same
    /// trace make the same admission decisions.
    pub fn with_hasher(max_capacity: u64, expected_entries: usize, hasher: RandomState) -> Self {
        let max_total = max_capacity.max(1);
        let max_window = (max_total / 100).max(1);
        let max_main = max_total.saturating_sub(max_window);
        let max_protected = (max_main / 5 * 4 + max_main % 5 * 4 / 5).max(1);

        WTinyLfuPolicy {
            popularity: Popularity::new(expected_entries),
            build_hasher: hasher,
            arena: Arena::new(3, expected_entries),
            max_total,
            max_window,
            max_main,
            max_protected,
        }
    }

    #[inline]
    fn hash_key(&self, key: &K) -> u64 {
        self.build_hasher.hash_one(key)
    }

    #[inline]
    fn main_weight(&self) -> u64 {
        self.arena.queue_weight(PROBATION) + self.arena.queue_weight(PROTECTED)
    }

    /// Moves `idx` from Probation to Protected MRU, then demotes Protected
    /// LRU entries while Protected is over its share.
    fn promote(&mut self, idx: usize) {
        self.arena.move_to_front(PROTECTED, idx);
        self.rebalance_protected();
    }

    fn rebalance_protected(&mut self) {
        while self.arena.queue_weight(PROTECTED) > self.max_protected {
            let Some(demoted) = self.arena.coldest(PROTECTED) else { break };
            self.arena.move_to_front(PROBATION, demoted);
        }
    }

    /// Least valuable resident of main: Probation LRU, else Protected LRU.
    fn victim(&self) -> Option<usize> {
        self.arena
            .coldest(PROBATION)
            .or_else(|| self.arena.coldest(PROTECTED))
    }

    /// Restores every segment limit after an insert or a weight change.
    ///
    /// Returns the keys that must be removed from the backing store.
    fn drain_to_capacity(&mut self) -> Vec<K> {
        let mut evicted = Vec::new();

        // Main may be over budget on its own when a resident entry grew.
        while self.main_weight() > self.max_main {
            let Some(victim) = self.victim() else { break };
            evicted.extend(self.arena.remove(victim));
        }

        while self.arena.queue_weight(WINDOW) > self.max_window {
            let Some(cand) = self.arena.coldest(WINDOW) else { break };
            self.admit(cand, &mut evicted);
        }

        self.rebalance_protected();
        debug_assert!(self.arena.total_weight() <= self.max_total);
        evicted
    }

    /// Runs the TinyLFU admission filter for the window candidate `cand`.
    fn admit(&mut self, cand: usize, evicted: &mut Vec<K>) {
        let cand_weight = self.arena.weight(cand);
        if cand_weight > self.max_main {
            evicted.extend(self.arena.remove(cand));
            return;
        }

        let cand_freq = self.popularity.estimate(self.arena.hash(cand));
        while self.main_weight().saturating_add(cand_weight) > self.max_main {
            let Some(victim) = self.victim() else { break };
            if cand_freq > self.popularity.estimate(self.arena.hash(victim)) {
                evicted.extend(self.arena.remove(victim));
            } else {
                evicted.extend(self.arena.remove(cand));
                return;
            }
        }
        self.arena.move_to_front(PROBATION, cand);
    }
}

// ---------------------------------------------------------------------------
// Policy trait implementation
// ---------------------------------------------------------------------------

impl<K: Hash + Eq + Clone + Send> Policy<K> for WTinyLfuPolicy<K> {
    /// Records the access and refreshes the entry's position:
    /// Window → Window MRU, Probation → Protected MRU, Protected → Protected MRU.
    fn on_access(&mut self, key: &K) {
        let h = self.hash_key(key);
        self.popularity.record(h);

        let Some(idx) = self.arena.get(key) else { return };
        match self.arena.queue(idx) {
            WINDOW => self.arena.move_to_front(WINDOW, idx),
            PROBATION => self.promote(idx),
            _ => self.arena.move_to_front(PROTECTED, idx),
        }
    }

    fn on_insert(&mut self, key: K, weight: u64) -> Vec<K> {
        if let Some(idx) = self.arena.get(&key) {
            let old_weight = self.arena.weight(idx);
            return self.on_update(&key, old_weight, weight);
        }

        let h = self.hash_key(&key);
        self.popularity.record(h);
        self.arena.push_front(WINDOW, key, h, weight);
        self.drain_to_capacity()
    }

    /// An unchanged weight is just an access.  A changed weight is applied
    /// in place, the entry is refreshed, and every segment limit re-checked.
    fn on_update(&mut self, key: &K, _old_weight: u64, new_weight: u64) -> Vec<K> {
        let Some(idx) = self.arena.get(key) else { return Vec::new() };
        self.on_access(key);
        if self.arena.weight(idx) == new_weight {
            return Vec::new();
        }
        self.arena.reweigh(idx, new_weight);
        self.drain_to_capacity()
    }

    fn on_remove(&mut self, key: &K) {
        if let Some(idx) = self.arena.get(key) {
            self.arena.remove(idx);
        }
    }

    fn current_weight(&self) -> u64 {
        self.arena.total_weight()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn make(cap: u64) -> WTinyLfuPolicy<u64> {
        WTinyLfuPolicy::with_hasher(cap, cap as usize, RandomState::with_seeds(1, 2, 3, 4))
    }

    #[test]
    fn insert_and_remove() {
        let mut p = make(10);
        assert!(p.on_insert(1, 1).is_empty());
        assert_eq!(p.current_weight(), 1);
        p.on_remove(&1);
        assert_eq!(p.current_weight(), 0);
    }

    #[test]
    fn maximum_capacity_builds_without_overflow() {
        let mut p = WTinyLfuPolicy::<u64>::with_hasher(u64::MAX, 16, RandomState::with_seeds(1, 2, 3, 4));
        assert!(p.on_insert(1, 1).is_empty());
        assert!(p.on_insert(2, u64::MAX / 2).is_empty());
        assert_eq!(p.current_weight(), u64::MAX / 2 + 1);
    }

    #[test]
    fn capacity_is_respected() {
        let cap = 20u64;
        let mut p = make(cap);
        for i in 0..50u64 {
            p.on_insert(i, 1);
        }
        assert!(p.current_weight() <= cap, "weight {} > {}", p.current_weight(), cap);
    }

    #[test]
    fn duplicate_insert_does_not_grow_weight() {
        let mut p = make(10);
        p.on_insert(42, 1);
        p.on_insert(42, 1);
        assert_eq!(p.current_weight(), 1);
    }

    #[test]
    fn on_remove_unknown_key_is_noop() {
        let mut p = make(10);
        p.on_remove(&999);
        assert_eq!(p.current_weight(), 0);
    }

    #[test]
    fn weight_change_on_resident_entry_is_tracked() {
        let mut p = make(10);
        assert!(p.on_insert(5, 3).is_empty());
        assert!(p.on_update(&5, 3, 7).is_empty());
        assert_eq!(p.current_weight(), 7);
        assert!(p.on_update(&5, 7, 3).is_empty());
        assert_eq!(p.current_weight(), 3);
        assert!(p.arena.contains(&5));
    }

    #[test]
    fn growing_entry_never_breaks_the_bound() {
        let mut p = make(10);
        for k in 0..9u64 {
            p.on_insert(k, 1);
        }
        let evicted = p.on_update(&3, 1, 9);
        assert!(!evicted.is_empty());
        assert!(p.current_weight() <= 10, "weight {}", p.current_weight());
    }

    #[test]
    fn entry_heavier_than_main_is_rejected() {
        let mut p = make(10);
        p.on_insert(1, 1);
        let evicted = p.on_insert(2, 11);
        assert!(evicted.contains(&2));
        assert!(p.current_weight() <= 10);
    }

    #[test]
    fn hot_items_survive_scan_pollution() {
        let cap = 50u64;
        let mut p = make(cap);

        for i in 0..20u64 {
            p.on_insert(i, 1);
        }
        for _ in 0..8 {
            for i in 0..20u64 {
                p.on_access(&i);
            }
        }
        for i in 1000..1300u64 {
            p.on_insert(i, 1);
        }

        let survivors = (0..20u64).filter(|k| p.arena.contains(k)).count();
        assert!(survivors >= 10, "only {survivors} / 20 hot items survived the scan");
    }

    #[test]
    fn probation_entry_is_promoted_on_access() {
        let mut p = make(100);
        for i in 0..50u64 {
            p.on_insert(i, 1);
        }
        let idx = p.arena.get(&0).expect("key 0 admitted while main had room");
        assert_eq!(p.arena.queue(idx), PROBATION);
        p.on_access(&0);
        assert_eq!(p.arena.queue(idx), PROTECTED);
    }
}
