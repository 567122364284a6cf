//! FIFO replay baseline.
//!
//! The simplest possible eviction policy, replayed over a raw trace with
//! the same measurement pass as the oracles. It exists purely as a
//! comparison yardstick: a clairvoyant policy must never lose to it, and
//! the property tests assert exactly that. It uses no future knowledge.

use std::collections::VecDeque;
use std::hash::Hash;

use rustc_hash::FxHashSet;

use crate::config::ReplayConfig;
use crate::error::InvariantError;
use crate::metrics::{ReplayMetrics, ReplaySnapshot, RequestObservation};
use crate::trace::{Request, Trace};

/// Bounded FIFO key-set replay. Evicts in insertion order.
#[derive(Debug)]
pub struct FifoReplay<K> {
    config: ReplayConfig,
    cache: FxHashSet<K>,
    insertion_order: VecDeque<K>,
    metrics: ReplayMetrics<K>,
    req_idx: u64,
}

impl<K> FifoReplay<K>
where
    K: Eq + Hash + Clone,
{
    /// Creates a fresh baseline replay.
    pub fn new(config: ReplayConfig) -> Self {
        Self {
            config,
            cache: FxHashSet::default(),
            insertion_order: VecDeque::with_capacity(config.capacity),
            metrics: ReplayMetrics::new(config.warmup),
            req_idx: 0,
        }
    }

    /// Current number of cached keys.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// `true` when `key` is currently cached.
    pub fn contains(&self, key: &K) -> bool {
        self.cache.contains(key)
    }

    /// Replays the whole raw trace and returns the final snapshot.
    pub fn run(&mut self, trace: &Trace<K>) -> Result<ReplaySnapshot, InvariantError> {
        for request in trace.iter() {
            self.read_request(request)?;
        }
        Ok(self.metrics.snapshot())
    }

    /// Processes one request with the same measure-then-insert discipline
    /// as the oracles.
    pub fn read_request(&mut self, request: &Request<K>) -> Result<(), InvariantError> {
        let idx = self.req_idx;

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

        for key in request.keys() {
            if self.cache.insert(key.clone()) {
                self.insertion_order.push_back(key.clone());
            }
        }

        while self.cache.len() > self.config.capacity {
            match self.insertion_order.pop_front() {
                Some(oldest) => {
                    self.cache.remove(&oldest);
                },
                None => {
                    return Err(InvariantError::new(
                        "insertion order drained while cache still over capacity",
                    ));
                },
            }
        }

        self.req_idx += 1;
        if Some(self.req_idx) == self.config.checkpoint {
            self.metrics.record_checkpoint(self.cache.iter());
        }
        Ok(())
    }

    /// Snapshot of the metrics accumulated so far.
    pub fn snapshot(&self) -> ReplaySnapshot {
        self.metrics.snapshot()
    }
}
