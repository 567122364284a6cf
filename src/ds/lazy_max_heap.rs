//! Lazy max-heap with stale entry skipping.
//!
//! A priority queue for farthest-future eviction that supports cheap score
//! updates by deferring cleanup. Instead of modifying heap entries in
//! place, updates push new entries and leave old ones behind as stale; the
//! [`pop_worst`](LazyMaxHeap::pop_worst) operation skips stale entries
//! automatically by checking them against the authoritative score map.
//!
//! ```text
//!   scores: FxHashMap<K, S>        (authoritative source of truth)
//!   heap:   BinaryHeap<HeapEntry>  (may contain stale entries)
//!
//!   Update Flow
//!   ───────────
//!     update("A", 10):
//!       1. scores["A"] = 10            (authoritative update)
//!       2. heap.push(("A", 10, seq))   (old "A" entries become stale)
//!
//!   Pop Flow
//!   ────────
//!     pop_worst():
//!       loop:
//!         entry = heap.pop()           → ("A", 15, seq=1)
//!         scores["A"] == 15?           → No, stale — skip
//!         ...until a live entry is found
//! ```
//!
//! ## Ordering
//!
//! `pop_worst` returns the *largest* score first — for Belady eviction the
//! score is the next-use request index, so the largest score is the entry
//! reused farthest in the future. Ties are broken by update order: among
//! equal scores, the least recently updated key pops first. This rule is
//! fixed and asserted by tests; eviction outcomes must be deterministic.
//!
//! ## Operations
//!
//! | Operation       | Description                            | Complexity         |
//! |-----------------|----------------------------------------|--------------------|
//! | `update`        | Set/update score, push heap entry      | O(log n)           |
//! | `remove`        | Remove from scores map only            | O(1)               |
//! | `pop_worst`     | Pop max, skipping stale entries        | Amortized O(log n) |
//! | `score_of`      | Get current score for key              | O(1)               |
//! | `maybe_rebuild` | Rebuild if heap too stale              | O(1) or O(n log n) |
//!
//! Not thread-safe; the simulators are single-threaded batch replays.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::hash::Hash;

use rustc_hash::FxHashMap;

#[derive(Debug, Clone)]
struct HeapEntry<K, S> {
    score: S,
    seq: u64,
    key: K,
}

impl<K, S> PartialEq for HeapEntry<K, S>
where
    S: Ord,
{
    fn eq(&self, other: &Self) -> bool {
        self.score == other.score && self.seq == other.seq
    }
}

impl<K, S> Eq for HeapEntry<K, S> where S: Ord {}

impl<K, S> PartialOrd for HeapEntry<K, S>
where
    S: Ord,
{
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K, S> Ord for HeapEntry<K, S>
where
    S: Ord,
{
    fn cmp(&self, other: &Self) -> Ordering {
        match self.score.cmp(&other.score) {
            // Max-heap: among equal scores the smaller seq must surface
            // first, so seq comparison is reversed.
            Ordering::Equal => other.seq.cmp(&self.seq),
            ordering => ordering,
        }
    }
}

/// Max-heap with O(1) score updates via lazy deletion.
///
/// Maintains an authoritative `scores` map and a heap that may contain
/// stale entries. Updates modify the map and push new heap entries; old
/// entries are skipped during [`pop_worst`](Self::pop_worst).
///
/// # Example
///
/// ```
/// use beladykit::ds::LazyMaxHeap;
///
/// let mut heap: LazyMaxHeap<&str, u64> = LazyMaxHeap::new();
///
/// // Track next-use indices (higher = reused farther in the future)
/// heap.update("soon", 3);
/// heap.update("later", 90);
/// heap.update("soon", 5); // refreshed knowledge, old entry goes stale
///
/// // Evict the farthest-future key first
/// assert_eq!(heap.pop_worst(), Some(("later", 90)));
/// assert_eq!(heap.pop_worst(), Some(("soon", 5)));
/// assert_eq!(heap.pop_worst(), None);
/// ```
#[derive(Debug)]
pub struct LazyMaxHeap<K, S> {
    scores: FxHashMap<K, S>,
    heap: BinaryHeap<HeapEntry<K, S>>,
    seq: u64,
}

impl<K, S> LazyMaxHeap<K, S>
where
    K: Eq + Hash + Clone,
    S: Ord + Clone,
{
    /// Creates an empty heap.
    pub fn new() -> Self {
        Self {
            scores: FxHashMap::default(),
            heap: BinaryHeap::new(),
            seq: 0,
        }
    }

    /// Creates an empty heap with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut scores = FxHashMap::default();
        scores.reserve(capacity);
        Self {
            scores,
            heap: BinaryHeap::with_capacity(capacity),
            seq: 0,
        }
    }

    /// Returns the number of live keys.
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// `true` if there are no live keys.
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Returns the underlying heap length (may exceed `len()` due to stale
    /// entries).
    pub fn heap_len(&self) -> usize {
        self.heap.len()
    }

    /// Returns the current score for `key`, if present.
    pub fn score_of(&self, key: &K) -> Option<&S> {
        self.scores.get(key)
    }

    /// `true` when `key` is live.
    pub fn contains(&self, key: &K) -> bool {
        self.scores.contains_key(key)
    }

    /// Iterates live keys in unspecified order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.scores.keys()
    }

    /// Updates `key`'s score and returns the previous score, if any.
    ///
    /// Pushes a new heap entry; old entries become stale and are skipped by
    /// [`pop_worst`](Self::pop_worst).
    pub fn update(&mut self, key: K, score: S) -> Option<S> {
        let previous = self.scores.insert(key.clone(), score.clone());
        self.push_entry(key, score);
        previous
    }

    /// Removes `key` and returns its score, if present.
    ///
    /// Only the authoritative map is touched; stale heap entries are
    /// skipped later by [`pop_worst`](Self::pop_worst).
    pub fn remove(&mut self, key: &K) -> Option<S> {
        self.scores.remove(key)
    }

    /// Pops and returns the maximum `(key, score)`, skipping stale entries.
    ///
    /// Among equal scores the least recently updated key is returned first.
    pub fn pop_worst(&mut self) -> Option<(K, S)> {
        loop {
            let entry = self.heap.pop()?;
            match self.scores.get(&entry.key) {
                Some(score) if *score == entry.score => {
                    self.scores.remove(&entry.key);
                    return Some((entry.key, entry.score));
                },
                _ => continue,
            }
        }
    }

    /// Removes all entries.
    pub fn clear(&mut self) {
        self.scores.clear();
        self.heap.clear();
    }

    /// Rebuilds the heap from the authoritative `scores` map, dropping all
    /// stale entries.
    pub fn rebuild(&mut self) {
        self.heap.clear();
        let entries: Vec<(K, S)> = self
            .scores
            .iter()
            .map(|(key, score)| (key.clone(), score.clone()))
            .collect();
        for (key, score) in entries {
            self.push_entry(key, score);
        }
    }

    /// Rebuilds if the heap has grown too stale relative to the map size
    /// (`heap_len() > len() * factor`).
    pub fn maybe_rebuild(&mut self, factor: usize) {
        let factor = factor.max(1);
        if self.heap.len() > self.scores.len().saturating_mul(factor) {
            self.rebuild();
        }
    }

    fn push_entry(&mut self, key: K, score: S) {
        let entry = HeapEntry {
            score,
            seq: self.seq,
            key,
        };
        self.seq = self.seq.wrapping_add(1);
        self.heap.push(entry);
    }
}

impl<K, S> Default for LazyMaxHeap<K, S>
where
    K: Eq + Hash + Clone,
    S: Ord + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
