//! # Transaction-Level Belady Oracle
//!
//! Replays a raw trace through a bounded cache whose unit of reuse credit
//! is the whole transaction: a key is worth keeping when it is part of a
//! future request whose entire read set is otherwise already known. No
//! annotation pass is needed; eviction priority is a dynamic, trace-
//! dependent property maintained incrementally.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────┐
//!   │                 TransactionalBeladyCache<K>                      │
//!   │                                                                  │
//!   │   cache:      FxHashSet<K>            (bounded key set)          │
//!   │   candidates: FxHashMap<K, Vec<u64>>  (ascending request indices │
//!   │               at which the key contributes to an all-keys-       │
//!   │               already-read transactional hit)                    │
//!   │   metrics:    ReplayMetrics<K>        (warmup-gated)             │
//!   └──────────────────────────────────────────────────────────────────┘
//!
//!   preprocess_candidates(): forward pass over the raw trace
//!     read_set ← every key ever seen
//!     request i with ALL keys already in read_set
//!       → append i to every one of its keys' candidate lists
//!     all keys join read_set regardless
//!
//!   evict(current): prune candidate lists to indices > current, then
//!     1. keys with NO remaining future hit, ascending key order
//!     2. remaining keys by DESCENDING nearest candidate index
//!        (farthest future transactional hit evicted first),
//!        ties in ascending key order
//! ```
//!
//! Eviction rebuilds its priority view from scratch each time, which is
//! substantially more expensive per eviction than the key-level oracle;
//! a future use here cannot be a static annotation.
//!
//! ## Example Usage
//!
//! ```
//! use beladykit::config::ReplayConfig;
//! use beladykit::policy::txn_belady::run_transactional;
//! use beladykit::trace::{Request, Trace};
//!
//! let trace: Trace<String> = [
//!     Request::single_level(vec!["a".into(), "b".into()]),
//!     Request::single_level(vec!["a".into(), "b".into()]),
//! ]
//! .into_iter()
//! .collect();
//!
//! let cfg = ReplayConfig::try_new(2).unwrap().with_warmup(0).with_checkpoint(None);
//! let snap = run_transactional(&trace, cfg).unwrap();
//! assert_eq!(snap.exact_hits, 1);
//! ```

use std::hash::Hash;

use log::{debug, info};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::config::ReplayConfig;
use crate::error::InvariantError;
use crate::metrics::{ReplayMetrics, ReplaySnapshot, RequestObservation};
use crate::trace::{Request, Trace};

// Progress logging interval for long replays.
const PROGRESS_EVERY: u64 = 10_000;

/// Transaction-level optimal-eviction simulator.
///
/// [`preprocess_candidates`](Self::preprocess_candidates) must run over the
/// same trace before [`run`](Self::run); without it every key counts as
/// having no future transactional hit. One instance = one run.
#[derive(Debug)]
pub struct TransactionalBeladyCache<K> {
    config: ReplayConfig,
    cache: FxHashSet<K>,
    candidates: FxHashMap<K, Vec<u64>>,
    metrics: ReplayMetrics<K>,
    req_idx: u64,
}

impl<K> TransactionalBeladyCache<K>
where
    K: Eq + Hash + Ord + Clone,
{
    /// Creates a fresh simulator for one run.
    pub fn new(config: ReplayConfig) -> Self {
        Self {
            config,
            cache: FxHashSet::default(),
            candidates: FxHashMap::default(),
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

    /// Remaining candidate request indices for `key`, if any. Ascending;
    /// after an eviction pass none are ≤ the replay position at that time.
    pub fn candidates_of(&self, key: &K) -> Option<&[u64]> {
        self.candidates.get(key).map(Vec::as_slice)
    }

    /// Forward pass computing, per key, the future request indices at which
    /// the key contributes to an all-keys-already-read transactional hit.
    ///
    /// A request whose entire flattened key list is already in the
    /// accumulated read set is a transactional-hit opportunity: its index
    /// is appended to every one of its keys' candidate lists. All keys then
    /// join the read set regardless of the test.
    pub fn preprocess_candidates(&mut self, trace: &Trace<K>) {
        let mut read_set: FxHashSet<K> = FxHashSet::default();
        let mut opportunities = 0u64;

        for (i, request) in trace.iter().enumerate() {
            let all_seen = request.key_count() > 0 && request.keys().all(|k| read_set.contains(k));
            if all_seen {
                opportunities += 1;
                for key in request.keys() {
                    self.candidates.entry(key.clone()).or_default().push(i as u64);
                }
            }
            read_set.extend(request.keys().cloned());
        }

        info!(
            "candidate pass: {} transactional-hit opportunities over {} requests, {} distinct keys",
            opportunities,
            trace.len(),
            read_set.len()
        );
    }

    /// Replays the whole raw trace and returns the final snapshot.
    pub fn run(&mut self, trace: &Trace<K>) -> Result<ReplaySnapshot, InvariantError> {
        for request in trace.iter() {
            self.read_request(request)?;
        }
        let snap = self.metrics.snapshot();
        info!(
            "transactional run done: capacity={} requests={} exact_hit_ratio={:.4} partial_hit_avg={:.4}",
            self.config.capacity,
            snap.requests,
            snap.exact_hit_ratio(),
            snap.partial_hit_avg()
        );
        Ok(snap)
    }

    /// Processes one request: measure, insert, evict, checkpoint.
    pub fn read_request(&mut self, request: &Request<K>) -> Result<(), InvariantError> {
        let idx = self.req_idx;

        // All membership is measured before any insert from this request.
        // An empty level is vacuously fully present.
        let mut obs = RequestObservation {
            key_count: request.key_count(),
            levels_total: request.levels().len(),
            ..Default::default()
        };
        let mut hit_keys: Vec<&K> = Vec::new();
        for level in request.levels() {
            let mut all_present = true;
            for key in level {
                if self.cache.contains(key) {
                    obs.present_count += 1;
                } else {
                    all_present = false;
                }
            }
            if all_present {
                obs.levels_hit += 1;
                hit_keys.extend(level.iter());
            }
        }

        self.metrics.observe(idx, obs, hit_keys);

        // Sets absorb duplicates; insertion is idempotent.
        self.cache.extend(request.keys().cloned());

        if self.cache.len() > self.config.capacity {
            self.evict(idx);
        }
        if self.cache.len() > self.config.capacity {
            return Err(InvariantError::new(format!(
                "cache size {} exceeds capacity {} after eviction at request {}",
                self.cache.len(),
                self.config.capacity,
                idx
            )));
        }

        self.req_idx += 1;
        if self.req_idx % PROGRESS_EVERY == 0 {
            debug!("replayed {} requests", self.req_idx);
        }
        if Some(self.req_idx) == self.config.checkpoint {
            self.metrics.record_checkpoint(self.cache.iter());
        }
        Ok(())
    }

    /// Evicts until the cache fits its capacity.
    ///
    /// Keys with no future transactional hit go first (ascending key
    /// order); then keys by descending nearest candidate index — the
    /// transaction-level analogue of farthest-future-use — with ties in
    /// ascending key order. Both rules are fixed so eviction outcomes are
    /// deterministic.
    fn evict(&mut self, current: u64) {
        let mut no_future: Vec<K> = Vec::new();
        let mut with_future: Vec<(u64, K)> = Vec::new();

        for key in &self.cache {
            // Drop candidate indices we have already replayed past; lists
            // are ascending, so this strips a prefix.
            if let Some(list) = self.candidates.get_mut(key) {
                if list.first().is_some_and(|&v| v <= current) {
                    list.retain(|&v| v > current);
                }
                if list.is_empty() {
                    self.candidates.remove(key);
                }
            }
            match self.candidates.get(key).and_then(|list| list.first()) {
                Some(&next) => with_future.push((next, key.clone())),
                None => no_future.push(key.clone()),
            }
        }

        no_future.sort_unstable();
        for key in &no_future {
            if self.cache.len() <= self.config.capacity {
                return;
            }
            self.cache.remove(key);
        }

        with_future.sort_unstable_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        for (_, key) in &with_future {
            if self.cache.len() <= self.config.capacity {
                return;
            }
            self.cache.remove(key);
        }
    }

    /// Snapshot of the metrics accumulated so far.
    pub fn snapshot(&self) -> ReplaySnapshot {
        self.metrics.snapshot()
    }
}

/// Runs the transaction-level oracle over a raw trace: candidate
/// preprocessing followed by replay, on one fresh simulator.
pub fn run_transactional<K>(
    trace: &Trace<K>,
    config: ReplayConfig,
) -> Result<ReplaySnapshot, InvariantError>
where
    K: Eq + Hash + Ord + Clone,
{
    let mut sim = TransactionalBeladyCache::new(config);
    sim.preprocess_candidates(trace);
    sim.run(trace)
}

#[cfg(test)]
mod tests {
    use super::*;

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

    fn key(s: &str) -> String {
        s.to_string()
    }

    #[test]
    fn candidate_lists_record_all_seen_requests() {
        let trace = trace_of(&[&[&["a", "b"]], &[&["a"]], &[&["b"]], &[&["a", "b"]]]);
        let mut sim: TransactionalBeladyCache<String> = TransactionalBeladyCache::new(cfg(10));
        sim.preprocess_candidates(&trace);

        // Request 0 introduces both keys (no opportunity); 1, 2 and 3 are
        // fully covered by the read set.
        assert_eq!(sim.candidates_of(&key("a")), Some(&[1, 3][..]));
        assert_eq!(sim.candidates_of(&key("b")), Some(&[2, 3][..]));
    }

    #[test]
    fn first_occurrence_requests_never_become_candidates() {
        let trace = trace_of(&[&[&["a"]], &[&["a", "b"]]]);
        let mut sim: TransactionalBeladyCache<String> = TransactionalBeladyCache::new(cfg(10));
        sim.preprocess_candidates(&trace);

        // Request 1 introduces "b", so it is not an opportunity for "a"
        // either.
        assert_eq!(sim.candidates_of(&key("a")), None);
        assert_eq!(sim.candidates_of(&key("b")), None);
    }

    #[test]
    fn mixed_future_eviction_is_deterministic() {
        // [A,B], [A], [B] at capacity 1, warmup 0. After request 0 both A
        // and B have future candidate hits (A at 1, B at 2); B is farther
        // and must be evicted first.
        let trace = trace_of(&[&[&["a", "b"]], &[&["a"]], &[&["b"]]]);
        let mut sim: TransactionalBeladyCache<String> = TransactionalBeladyCache::new(cfg(1));
        sim.preprocess_candidates(&trace);

        sim.read_request(&trace.requests()[0]).unwrap();
        assert_eq!(sim.len(), 1);
        assert!(sim.contains(&key("a")));
        assert!(!sim.contains(&key("b")));

        sim.read_request(&trace.requests()[1]).unwrap();
        assert_eq!(sim.snapshot().exact_hits, 1);

        // Request 2 misses on B; both candidate lists are now exhausted,
        // so the no-future rule evicts "a" (ascending key order).
        sim.read_request(&trace.requests()[2]).unwrap();
        assert!(sim.contains(&key("b")));
        assert!(!sim.contains(&key("a")));
    }

    #[test]
    fn no_future_keys_are_evicted_before_future_ones() {
        // "z" never participates in a transactional hit; "a" does (at 2).
        let trace = trace_of(&[&[&["a"]], &[&["z", "a"]], &[&["a"]]]);
        let mut sim: TransactionalBeladyCache<String> = TransactionalBeladyCache::new(cfg(1));
        sim.preprocess_candidates(&trace);

        sim.read_request(&trace.requests()[0]).unwrap();
        sim.read_request(&trace.requests()[1]).unwrap();
        assert!(sim.contains(&key("a")));
        assert!(!sim.contains(&key("z")));
    }

    #[test]
    fn candidate_lists_are_pruned_behind_the_replay_position() {
        let trace = trace_of(&[&[&["a", "b"]], &[&["a"]], &[&["a", "c"]], &[&["a", "b"]]]);
        let mut sim: TransactionalBeladyCache<String> = TransactionalBeladyCache::new(cfg(1));
        sim.preprocess_candidates(&trace);
        assert_eq!(sim.candidates_of(&key("a")), Some(&[1, 3][..]));

        // Request 2 overflows the cache; its eviction pass must drop the
        // already-replayed index 1 from "a"'s list.
        for request in trace.requests().iter().take(3) {
            sim.read_request(request).unwrap();
        }
        assert_eq!(sim.candidates_of(&key("a")), Some(&[3][..]));
    }

    #[test]
    fn capacity_invariant_holds_after_every_request() {
        let trace = trace_of(&[
            &[&["a", "b", "c"]],
            &[&["a", "b", "c"]],
            &[&["d"], &["e", "f"]],
            &[&["a", "d"]],
        ]);
        let mut sim: TransactionalBeladyCache<String> = TransactionalBeladyCache::new(cfg(2));
        sim.preprocess_candidates(&trace);
        for request in trace.iter() {
            sim.read_request(request).unwrap();
            assert!(sim.len() <= 2);
        }
    }

    #[test]
    fn exact_hit_requires_every_key_cached() {
        let trace = trace_of(&[&[&["a", "b"]], &[&["a", "b"]], &[&["a", "b", "c"]]]);
        let snap = run_transactional(&trace, cfg(10)).unwrap();
        assert_eq!(snap.exact_hits, 1);
        // Request 2 finds 2 of 3 keys.
        assert!((snap.partial_hit_sum - (1.0 + 2.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn degenerate_requests_are_harmless() {
        let trace = trace_of(&[&[&["a"]], &[], &[&["a"]]]);
        let snap = run_transactional(&trace, cfg(1)).unwrap();
        assert!(snap.partial_hit_avg().is_finite());
        assert_eq!(snap.exact_hits, 1);
    }

    #[test]
    fn run_without_preprocess_treats_all_keys_as_no_future() {
        let trace = trace_of(&[&[&["a", "b"]], &[&["a"]]]);
        let mut sim: TransactionalBeladyCache<String> = TransactionalBeladyCache::new(cfg(1));
        sim.read_request(&trace.requests()[0]).unwrap();
        // No candidates at all: ascending key order evicts "a".
        assert!(sim.contains(&key("b")));
        assert!(!sim.contains(&key("a")));
    }
}
