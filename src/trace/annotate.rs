//! Next-occurrence annotation (the preprocessing pass behind Belady/OPT).
//!
//! ## Architecture
//!
//! ```text
//!   raw Trace ──► annotate() ──► AnnotatedTrace ──► BeladyCache::run()
//!
//!   annotate(): single BACKWARD pass
//!
//!     last_seen: FxHashMap<K, u64>      (request index of next occurrence)
//!
//!     for i in (0..n).rev():
//!         for key in request[i] (flattened order):
//!             next_use = last_seen.get(key)  or  NEVER
//!             last_seen[key] = i             (earlier requests point here)
//! ```
//!
//! One backward pass computes, for every key occurrence, the true index of
//! its next appearance in forward order — the classical distance-to-next-
//! reuse computation underlying OPT. Level numbers are assigned 1.. in
//! forward per-request order; request order is preserved.
//!
//! ## Annotated format (line-oriented text)
//! - One line = one request.
//! - Fields separated by `,` with a terminal comma; the empty field before
//!   the newline is discarded on read.
//! - Each field is `key.next_use.level` (dot-separated triple). Reading
//!   rejects any field that does not split into exactly 3 parts.
//!
//! ## Invariants
//! - For a key occurring at request indices i1 < i2 < i3, the annotation at
//!   i1 is i2, at i2 is i3, and at i3 is [`NEVER`].
//! - Annotation is pure: the input trace is never mutated, and annotating
//!   the same trace twice yields equal (and byte-identical when serialized)
//!   output.

use std::fmt;
use std::fs::File;
use std::hash::Hash;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use log::warn;
use rustc_hash::FxHashMap;

use crate::error::TraceParseError;
use crate::trace::Trace;

/// Sentinel `next_use` for a key that never occurs again. Larger than any
/// real request index, so farthest-future eviction always prefers it.
pub const NEVER: u64 = u64::MAX;

/// One annotated key occurrence: the key, the 0-based index of the next
/// request containing it (or [`NEVER`]), and its 1-based level number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedKey<K> {
    pub key: K,
    pub next_use: u64,
    pub level: u32,
}

/// One request with every key occurrence annotated, in flattened level
/// order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AnnotatedRequest<K> {
    entries: Vec<AnnotatedKey<K>>,
}

impl<K> AnnotatedRequest<K> {
    /// The annotated occurrences in flattened level order.
    pub fn entries(&self) -> &[AnnotatedKey<K>] {
        &self.entries
    }

    /// Number of key occurrences.
    pub fn key_count(&self) -> usize {
        self.entries.len()
    }

    /// `true` when the request carries no keys (degenerate input).
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A trace with next-occurrence annotations, aligned index-for-index with
/// the raw trace it was derived from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AnnotatedTrace<K> {
    requests: Vec<AnnotatedRequest<K>>,
}

impl<K> AnnotatedTrace<K> {
    /// The annotated requests in replay order.
    pub fn requests(&self) -> &[AnnotatedRequest<K>] {
        &self.requests
    }

    /// Number of requests.
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// `true` when the trace contains no requests.
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Iterates annotated requests in replay order.
    pub fn iter(&self) -> std::slice::Iter<'_, AnnotatedRequest<K>> {
        self.requests.iter()
    }
}

/// Annotates every key occurrence with the index of its next occurrence.
///
/// Degenerate (zero-key) requests are carried through as empty annotated
/// requests so request indices stay aligned with the raw trace; a warning
/// is logged when any are present. The input is not mutated and the result
/// is deterministic.
pub fn annotate<K>(trace: &Trace<K>) -> AnnotatedTrace<K>
where
    K: Eq + Hash + Clone,
{
    let n = trace.len();
    let mut last_seen: FxHashMap<K, u64> = FxHashMap::default();
    let mut requests: Vec<AnnotatedRequest<K>> = Vec::with_capacity(n);
    let mut degenerate = 0usize;

    for i in (0..n).rev() {
        let request = &trace.requests()[i];
        if request.is_empty() {
            degenerate += 1;
        }
        let mut entries = Vec::with_capacity(request.key_count());
        for (level_idx, level) in request.levels().iter().enumerate() {
            let level_no = level_idx as u32 + 1;
            for key in level {
                let next_use = last_seen.get(key).copied().unwrap_or(NEVER);
                last_seen.insert(key.clone(), i as u64);
                entries.push(AnnotatedKey {
                    key: key.clone(),
                    next_use,
                    level: level_no,
                });
            }
        }
        requests.push(AnnotatedRequest { entries });
    }
    requests.reverse();

    if degenerate > 0 {
        warn!("annotate: {degenerate} degenerate zero-key requests carried through empty");
    }
    AnnotatedTrace { requests }
}

/// Writes an annotated trace in the `key.next_use.level,` format, one
/// request per line with a terminal comma before the newline.
pub fn write_annotated<K, W>(trace: &AnnotatedTrace<K>, writer: W) -> io::Result<()>
where
    K: fmt::Display,
    W: Write,
{
    let mut writer = BufWriter::new(writer);
    for request in trace.iter() {
        for entry in request.entries() {
            write!(writer, "{}.{}.{},", entry.key, entry.next_use, entry.level)?;
        }
        writeln!(writer)?;
    }
    writer.flush()
}

/// Writes an annotated trace to a file path.
pub fn write_annotated_file<K>(trace: &AnnotatedTrace<K>, path: impl AsRef<Path>) -> io::Result<()>
where
    K: fmt::Display,
{
    write_annotated(trace, File::create(path)?)
}

/// Reads an annotated trace in the `key.next_use.level,` format.
///
/// Every comma-delimited field (after discarding the empty terminal field)
/// must split into exactly 3 dot-separated parts with numeric `next_use`
/// and `level`; anything else fails with a [`TraceParseError`] naming the
/// offending line.
pub fn read_annotated<K, R>(reader: R) -> Result<AnnotatedTrace<K>, TraceParseError>
where
    K: FromStr + Default,
    K::Err: fmt::Display,
    R: BufRead,
{
    let mut requests = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx as u64 + 1;
        let line = line.map_err(|e| TraceParseError::new(line_no, format!("io error: {e}")))?;
        if line.is_empty() {
            // A degenerate request serializes as a bare newline.
            requests.push(AnnotatedRequest::default());
            continue;
        }

        let fields: Vec<&str> = line.split(',').collect();
        let keep = fields.len().saturating_sub(1);
        let mut entries = Vec::with_capacity(keep);
        for field in &fields[..keep] {
            let parts: Vec<&str> = field.split('.').collect();
            if parts.len() != 3 {
                return Err(TraceParseError::new(
                    line_no,
                    format!(
                        "expected 3 dot-separated fields, got {} in {field:?}",
                        parts.len()
                    ),
                ));
            }
            let key: K = parts[0]
                .parse()
                .map_err(|e| TraceParseError::new(line_no, format!("bad key {:?}: {e}", parts[0])))?;
            let next_use: u64 = parts[1].parse().map_err(|_| {
                TraceParseError::new(line_no, format!("bad next-use index {:?}", parts[1]))
            })?;
            let level: u32 = parts[2].parse().map_err(|_| {
                TraceParseError::new(line_no, format!("bad level number {:?}", parts[2]))
            })?;
            entries.push(AnnotatedKey {
                key,
                next_use,
                level,
            });
        }
        requests.push(AnnotatedRequest { entries });
    }
    Ok(AnnotatedTrace { requests })
}

/// Reads an annotated trace from a file path.
pub fn read_annotated_file<K>(path: impl AsRef<Path>) -> Result<AnnotatedTrace<K>, TraceParseError>
where
    K: FromStr + Default,
    K::Err: fmt::Display,
{
    let file =
        File::open(path).map_err(|e| TraceParseError::new(0, format!("open failed: {e}")))?;
    read_annotated(BufReader::new(file))
}
