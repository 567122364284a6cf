//! # Key-Level Belady (OPT) Oracle
//!
//! Replays an annotated trace through a bounded cache that evicts the key
//! whose next use lies farthest in the future — the clairvoyant policy that
//! minimizes misses given perfect foreknowledge. Each key is cached
//! independently; the reuse annotations come from
//! [`annotate`](crate::trace::annotate::annotate).
//!
//! ## Architecture
//!
//! ```text
//!   ┌────────────────────────────────────────────────────────────────┐
//!   │                       BeladyCache<K>                           │
//!   │                                                                │
//!   │   cache: LazyMaxHeap<K, u64>                                   │
//!   │     - authoritative map: key → next_use (membership + score)   │
//!   │     - max-heap: farthest-future key surfaces first             │
//!   │                                                                │
//!   │   metrics: ReplayMetrics<K>   (warmup-gated)                   │
//!   │   config:  ReplayConfig       (capacity, warmup, checkpoint)   │
//!   └────────────────────────────────────────────────────────────────┘
//!
//!   Per request:
//!     1. membership of EVERY key tested before any insert
//!     2. observation → metrics (exact / partial / per-level hits)
//!     3. every key inserted/updated with its next_use
//!     4. while len > capacity: evict max next_use
//!        (ties: least recently updated key first)
//! ```
//!
//! The membership pre-check models "was this actually present before this
//! request's own writes"; the unconditional insert models "every access
//! refreshes future-use knowledge".
//!
//! ## Eviction
//!
//! A naive simulator re-sorts the whole cache on every eviction. Here a
//! [`LazyMaxHeap`] keeps eviction amortized O(log n) with
//! a fixed, tested tie-break: largest `next_use` evicted first, ties broken
//! by update order (least recently updated first). Keys annotated
//! [`NEVER`](crate::trace::annotate::NEVER) always outrank real indices.
//!
//! ## Example Usage
//!
//! ```
//! use beladykit::config::ReplayConfig;
//! use beladykit::policy::belady::run_belady;
//! use beladykit::trace::annotate::annotate;
//! use beladykit::trace::{Request, Trace};
//!
//! let trace: Trace<String> = [
//!     Request::single_level(vec!["a".into()]),
//!     Request::single_level(vec!["a".into()]),
//! ]
//! .into_iter()
//! .collect();
//!
//! let cfg = ReplayConfig::try_new(1).unwrap().with_warmup(0).with_checkpoint(None);
//! let snap = run_belady(&annotate(&trace), cfg).unwrap();
//! assert_eq!(snap.exact_hits, 1);
//! ```

use std::hash::Hash;

use log::info;

use crate::config::ReplayConfig;
use crate::ds::LazyMaxHeap;
use crate::error::InvariantError;
use crate::metrics::{ReplayMetrics, ReplaySnapshot, RequestObservation};
use crate::trace::annotate::{AnnotatedRequest, AnnotatedTrace};

// Heap staleness bound before a bulk rebuild, as in the lazy LFU heap.
const MAX_HEAP_FACTOR: usize = 4;

/// Key-level optimal-eviction simulator.
///
/// One instance = one run. State is created fresh per `(trace, capacity)`
/// combination; the annotated trace itself may be shared across runs.
#[derive(Debug)]
pub struct BeladyCache<K> {
    config: ReplayConfig,
    cache: LazyMaxHeap<K, u64>,
    metrics: ReplayMetrics<K>,
    req_idx: u64,
}

impl<K> BeladyCache<K>
where
    K: Eq + Hash + Ord + Clone,
{
    /// Creates a fresh simulator for one run.
    pub fn new(config: ReplayConfig) -> Self {
        Self {
            config,
            cache: LazyMaxHeap::with_capacity(config.capacity),
            metrics: ReplayMetrics::new(config.warmup),
            req_idx: 0,
        }
    }

    /// Current number of cached keys.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// `true` when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Maximum number of cached keys.
    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// `true` when `key` is currently cached.
    pub fn contains(&self, key: &K) -> bool {
        self.cache.contains(key)
    }

    /// Replays the whole annotated trace and returns the final snapshot.
    pub fn run(&mut self, trace: &AnnotatedTrace<K>) -> Result<ReplaySnapshot, InvariantError> {
        for request in trace.iter() {
            self.read_request(request)?;
        }
        let snap = self.metrics.snapshot();
        info!(
            "belady run done: capacity={} requests={} exact_hit_ratio={:.4} partial_hit_avg={:.4}",
            self.config.capacity,
            snap.requests,
            snap.exact_hit_ratio(),
            snap.partial_hit_avg()
        );
        Ok(snap)
    }

    /// Processes one request: measure, insert, evict, checkpoint.
    pub fn read_request(&mut self, request: &AnnotatedRequest<K>) -> Result<(), InvariantError> {
        let idx = self.req_idx;

        // Membership must be tested for every key before any insert from
        // this request.
        let entries = request.entries();
        let mut obs = RequestObservation {
            key_count: entries.len(),
            ..Default::default()
        };
        let mut hit_keys: Vec<&K> = Vec::new();

        // Entries carry 1-based level numbers in nondecreasing runs; each
        // run is one level.
        let mut start = 0;
        while start < entries.len() {
            let level = entries[start].level;
            let mut end = start;
            let mut all_present = true;
            while end < entries.len() && entries[end].level == level {
                if self.cache.contains(&entries[end].key) {
                    obs.present_count += 1;
                } else {
                    all_present = false;
                }
                end += 1;
            }
            obs.levels_total += 1;
            if all_present {
                obs.levels_hit += 1;
                hit_keys.extend(entries[start..end].iter().map(|e| &e.key));
            }
            start = end;
        }

        self.metrics.observe(idx, obs, hit_keys);

        // A cache write always occurs, hit or miss: every access refreshes
        // the key's future-use knowledge.
        for entry in entries {
            self.cache.update(entry.key.clone(), entry.next_use);
        }

        while self.cache.len() > self.config.capacity {
            if self.cache.pop_worst().is_none() {
                return Err(InvariantError::new(
                    "eviction heap drained while cache still over capacity",
                ));
            }
        }
        self.cache.maybe_rebuild(MAX_HEAP_FACTOR);

        if self.cache.len() > self.config.capacity {
            return Err(InvariantError::new(format!(
                "cache size {} exceeds capacity {} after eviction at request {}",
                self.cache.len(),
                self.config.capacity,
                idx
            )));
        }

        self.req_idx += 1;
        if Some(self.req_idx) == self.config.checkpoint {
            self.metrics.record_checkpoint(self.cache.keys());
        }
        Ok(())
    }

    /// Snapshot of the metrics accumulated so far.
    pub fn snapshot(&self) -> ReplaySnapshot {
        self.metrics.snapshot()
    }
}

/// Runs the key-level Belady oracle over an annotated trace.
///
/// Convenience wrapper: one fresh [`BeladyCache`] per call.
pub fn run_belady<K>(
    trace: &AnnotatedTrace<K>,
    config: ReplayConfig,
) -> Result<ReplaySnapshot, InvariantError>
where
    K: Eq + Hash + Ord + Clone,
{
    BeladyCache::new(config).run(trace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::annotate::annotate;
    use crate::trace::{Request, Trace};

    fn cfg(capacity: usize) -> ReplayConfig {
        ReplayConfig::try_new(capacity)
            .unwrap()
            .with_warmup(0)
            .with_checkpoint(None)
    }

    fn trace_of(reqs: &[&[&[&str]]]) -> Trace<String> {
        reqs.iter()
            .map(|levels| {
                Request::new(
                    levels
                        .iter()
                        .map(|level| level.iter().map(|k| k.to_string()).collect())
                        .collect(),
                )
            })
            .collect()
    }

    #[test]
    fn repeat_of_single_key_hits_on_second_request() {
        // {A} then {A}, capacity 1, warmup 0.
        let trace = trace_of(&[&[&["a"]], &[&["a"]]]);
        let snap = run_belady(&annotate(&trace), cfg(1)).unwrap();

        // Request 0 is at the warmup boundary (idx > 0 is measured);
        // request 1 is measured and is an exact hit.
        assert_eq!(snap.measured_requests, 1);
        assert_eq!(snap.exact_hits, 1);
        assert_eq!(snap.partial_hit_sum, 1.0);
    }

    #[test]
    fn evicts_farthest_future_key() {
        // a recurs at 2, b recurs at 3; capacity 1 keeps a (nearer reuse).
        let trace = trace_of(&[&[&["a", "b"]], &[&["c"]], &[&["a"]], &[&["b"]]]);
        let annotated = annotate(&trace);

        let mut sim: BeladyCache<String> = BeladyCache::new(cfg(1));
        sim.read_request(&annotated.requests()[0]).unwrap();
        assert_eq!(sim.len(), 1);
        assert!(sim.contains(&"a".to_string()));
        assert!(!sim.contains(&"b".to_string()));
    }

    #[test]
    fn never_recurring_keys_are_evicted_before_recurring_ones() {
        let trace = trace_of(&[&[&["x", "a"]], &[&["a"]]]);
        let annotated = annotate(&trace);

        let mut sim: BeladyCache<String> = BeladyCache::new(cfg(1));
        sim.read_request(&annotated.requests()[0]).unwrap();
        // x never recurs (NEVER) and must lose to a (next_use = 1).
        assert!(sim.contains(&"a".to_string()));
    }

    #[test]
    fn eviction_ties_break_by_update_order() {
        // Neither key recurs; both carry NEVER. The earlier-updated key
        // ("a") must be evicted first.
        let trace = trace_of(&[&[&["a", "b"]]]);
        let annotated = annotate(&trace);

        let mut sim: BeladyCache<String> = BeladyCache::new(cfg(1));
        sim.read_request(&annotated.requests()[0]).unwrap();
        assert!(!sim.contains(&"a".to_string()));
        assert!(sim.contains(&"b".to_string()));
    }

    #[test]
    fn capacity_invariant_holds_after_every_request() {
        let trace = trace_of(&[
            &[&["a", "b", "c"]],
            &[&["d", "e"]],
            &[&["a", "f"], &["g"]],
            &[&["h"]],
        ]);
        let annotated = annotate(&trace);

        let mut sim: BeladyCache<String> = BeladyCache::new(cfg(2));
        for request in annotated.iter() {
            sim.read_request(request).unwrap();
            assert!(sim.len() <= 2);
        }
    }

    #[test]
    fn partial_hits_accumulate_fractions() {
        // Request 1 finds a cached but not z: fraction 1/2.
        let trace = trace_of(&[&[&["a"]], &[&["a", "z"]]]);
        let snap = run_belady(&annotate(&trace), cfg(10)).unwrap();
        assert_eq!(snap.exact_hits, 0);
        assert_eq!(snap.partial_hit_sum, 0.5);
    }

    #[test]
    fn level_hits_credit_fully_present_levels_flat() {
        // Request 2: level 1 = {a} fully present, level 2 = {a2, z} not.
        let trace = trace_of(&[&[&["a"]], &[&["a2"]], &[&["a"], &["a2", "z"]]]);
        let snap = run_belady(&annotate(&trace), cfg(10)).unwrap();

        // Only requests 1 and 2 are measured (warmup 0 excludes idx 0).
        assert_eq!(snap.level_hits, 1);
        assert_eq!(snap.level_row_hits, 1);
        assert_eq!(snap.level_opportunities, 3);
    }

    #[test]
    fn checkpoint_snapshot_fires_at_configured_index() {
        let trace = trace_of(&[&[&["a"]], &[&["a"]], &[&["b"]]]);
        let config = cfg(2).with_checkpoint(Some(2));
        let snap = run_belady(&annotate(&trace), config).unwrap();
        // After request index 1 the cache holds {a}; "a" was a level hit.
        assert_eq!(snap.checkpoint_ratio, Some(1.0));
    }

    #[test]
    fn degenerate_requests_are_harmless() {
        let trace = trace_of(&[&[&["a"]], &[], &[&["a"]]]);
        let snap = run_belady(&annotate(&trace), cfg(1)).unwrap();
        assert!(snap.partial_hit_avg().is_finite());
        assert_eq!(snap.exact_hits, 1);
    }
}
