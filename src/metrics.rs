//! Warmup-gated metrics accumulation shared by both oracles.
//!
//! ## Key Components
//! - [`RequestObservation`]: per-request presence measurements handed over
//!   by an oracle *before* it mutates its cache.
//! - [`ReplayMetrics`]: the accumulator. Requests at or before the warmup
//!   threshold touch no hit counters; after it, every request updates them
//!   exactly once.
//! - [`ReplaySnapshot`]: frozen counters plus derived ratios, returned by
//!   every replay run.
//!
//! ## Tracked quantities (post-warmup only)
//! - `exact_hits`: requests with every key already cached.
//! - `partial_hit_sum`: per-request present fraction (0.0 for a zero-key
//!   request; degenerate input must never divide by zero).
//! - `level_hits`: flat 1.0 credit per fully-present level, regardless of
//!   how many levels the request has.
//! - `level_row_hits`: requests with at least one fully-present level.
//! - `level_opportunities`: one per level of each measured request.
//! - `key_hits` / `keys_seen`: per-key presence counters.
//! - `checkpoint_ratio`: fraction of currently cached keys that were ever
//!   part of a fully-present level, computed exactly once at a fixed
//!   request index.

use std::hash::Hash;

use rustc_hash::FxHashSet;

/// Presence measurements for one request, taken before any cache mutation.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestObservation {
    /// Total key occurrences in the request.
    pub key_count: usize,
    /// How many of those keys were cached before the request's own writes.
    pub present_count: usize,
    /// Number of levels in the request.
    pub levels_total: usize,
    /// Number of levels whose keys were all cached.
    pub levels_hit: usize,
}

impl RequestObservation {
    /// `true` when every key of the request was present (exact hit). A
    /// zero-key request is never an exact hit.
    pub fn is_exact_hit(&self) -> bool {
        self.key_count > 0 && self.present_count == self.key_count
    }

    /// Fraction of the request's keys found cached; 0.0 for a zero-key
    /// request.
    pub fn present_fraction(&self) -> f64 {
        if self.key_count == 0 {
            0.0
        } else {
            self.present_count as f64 / self.key_count as f64
        }
    }
}

/// Warmup-gated accumulator for one simulation run.
#[derive(Debug, Clone)]
pub struct ReplayMetrics<K> {
    warmup: u64,
    requests: u64,
    measured_requests: u64,
    exact_hits: u64,
    partial_hit_sum: f64,
    level_hits: u64,
    level_row_hits: u64,
    level_opportunities: u64,
    key_hits: u64,
    keys_seen: u64,
    hit_keys: FxHashSet<K>,
    checkpoint_ratio: Option<f64>,
}

impl<K> ReplayMetrics<K>
where
    K: Eq + Hash + Clone,
{
    /// Creates an accumulator with the given warmup threshold.
    pub fn new(warmup: u64) -> Self {
        Self {
            warmup,
            requests: 0,
            measured_requests: 0,
            exact_hits: 0,
            partial_hit_sum: 0.0,
            level_hits: 0,
            level_row_hits: 0,
            level_opportunities: 0,
            key_hits: 0,
            keys_seen: 0,
            hit_keys: FxHashSet::default(),
            checkpoint_ratio: None,
        }
    }

    /// `true` when the request at 0-based index `idx` is past the warmup
    /// threshold and will be measured.
    pub fn measures(&self, idx: u64) -> bool {
        idx > self.warmup
    }

    /// Records one request. `hit_keys` must iterate the keys of every fully
    /// present level of this request; they feed the checkpoint snapshot.
    ///
    /// Pre-warmup requests bump only the total request count.
    pub fn observe<'a, I>(&mut self, idx: u64, obs: RequestObservation, hit_keys: I)
    where
        I: IntoIterator<Item = &'a K>,
        K: 'a,
    {
        self.requests += 1;
        if !self.measures(idx) {
            return;
        }

        self.measured_requests += 1;
        if obs.is_exact_hit() {
            self.exact_hits += 1;
        }
        self.partial_hit_sum += obs.present_fraction();
        self.level_hits += obs.levels_hit as u64;
        if obs.levels_hit > 0 {
            self.level_row_hits += 1;
        }
        self.level_opportunities += obs.levels_total as u64;
        self.key_hits += obs.present_count as u64;
        self.keys_seen += obs.key_count as u64;
        self.hit_keys.extend(hit_keys.into_iter().cloned());
    }

    /// Computes the cache-composition snapshot ratio: the fraction of
    /// currently cached keys that were ever part of a fully-present level.
    /// 0.0 when the cache is empty. Intended to be called exactly once, at
    /// the configured checkpoint index.
    pub fn record_checkpoint<'a, I>(&mut self, cached: I)
    where
        I: IntoIterator<Item = &'a K>,
        K: 'a,
    {
        let mut total = 0u64;
        let mut hits = 0u64;
        for key in cached {
            total += 1;
            if self.hit_keys.contains(key) {
                hits += 1;
            }
        }
        let ratio = if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        };
        self.checkpoint_ratio = Some(ratio);
    }

    /// Freezes the counters into a snapshot.
    pub fn snapshot(&self) -> ReplaySnapshot {
        ReplaySnapshot {
            requests: self.requests,
            measured_requests: self.measured_requests,
            exact_hits: self.exact_hits,
            partial_hit_sum: self.partial_hit_sum,
            level_hits: self.level_hits,
            level_row_hits: self.level_row_hits,
            level_opportunities: self.level_opportunities,
            key_hits: self.key_hits,
            keys_seen: self.keys_seen,
            hit_key_count: self.hit_keys.len(),
            checkpoint_ratio: self.checkpoint_ratio,
        }
    }
}

/// Frozen counters for one completed (or in-progress) run.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ReplaySnapshot {
    pub requests: u64,
    pub measured_requests: u64,
    pub exact_hits: u64,
    pub partial_hit_sum: f64,
    pub level_hits: u64,
    pub level_row_hits: u64,
    pub level_opportunities: u64,
    pub key_hits: u64,
    pub keys_seen: u64,
    pub hit_key_count: usize,
    pub checkpoint_ratio: Option<f64>,
}

impl ReplaySnapshot {
    /// Exact hits over measured requests; 0.0 when nothing was measured.
    pub fn exact_hit_ratio(&self) -> f64 {
        ratio(self.exact_hits as f64, self.measured_requests as f64)
    }

    /// Mean per-request present fraction; 0.0 when nothing was measured.
    pub fn partial_hit_avg(&self) -> f64 {
        ratio(self.partial_hit_sum, self.measured_requests as f64)
    }

    /// Fully-present levels over level opportunities.
    pub fn level_hit_rate(&self) -> f64 {
        ratio(self.level_hits as f64, self.level_opportunities as f64)
    }

    /// Per-key presence ratio.
    pub fn key_hit_ratio(&self) -> f64 {
        ratio(self.key_hits as f64, self.keys_seen as f64)
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}
