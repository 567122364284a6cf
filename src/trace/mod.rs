//! Trace model and raw trace codec.
//!
//! ## Architecture
//! - A [`Request`] is an ordered list of levels; a level is an ordered list
//!   of keys accessed at one dependency depth of a single logical operation.
//! - A [`Trace`] is an ordered, finite list of requests, replayed in order
//!   exactly once.
//!
//! ## Raw format (line-oriented text)
//! - One line = one request.
//! - Levels separated by `;`, keys within a level by `,`.
//! - Both separators are terminal: the last `;`- and `,`-delimited fields
//!   are discarded on read (trailing empty due to the terminal separator).
//! - Blank lines are skipped.
//!
//! ```text
//! a,b,;c,;      →  levels [[a, b], [c]]
//! ```
//!
//! ## Key Components
//! - [`Request`] / [`Trace`]: owned in-memory model.
//! - [`parse_trace`]: raw-format reader over any `BufRead`.
//! - [`read_trace`]: convenience file reader.
//!
//! ## Type Constraints
//! - Keys only need `Eq + Hash` for replay; `Ord + Clone` are required by
//!   the oracles for deterministic eviction tie-breaks; `FromStr` for
//!   parsing. `String` and `u64` are the common instantiations.

pub mod annotate;

use std::fmt;
use std::fs::File;
use std::hash::Hash;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

use log::info;
use rustc_hash::FxHashSet;

use crate::error::TraceParseError;

/// One logical operation: an ordered sequence of levels, each an ordered
/// list of keys accessed at that dependency depth. Level numbering starts
/// at 1 in the order the levels appear.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request<K> {
    levels: Vec<Vec<K>>,
}

impl<K> Request<K> {
    /// Creates a request from its levels, in dependency order.
    pub fn new(levels: Vec<Vec<K>>) -> Self {
        Self { levels }
    }

    /// Creates a single-level request.
    pub fn single_level(keys: Vec<K>) -> Self {
        Self { levels: vec![keys] }
    }

    /// The levels of this request, in dependency order.
    pub fn levels(&self) -> &[Vec<K>] {
        &self.levels
    }

    /// Iterates the flattened key list: all levels concatenated in level
    /// order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.levels.iter().flatten()
    }

    /// Total number of key occurrences across all levels.
    pub fn key_count(&self) -> usize {
        self.levels.iter().map(Vec::len).sum()
    }

    /// `true` when the request carries no keys at all (degenerate input).
    pub fn is_empty(&self) -> bool {
        self.levels.iter().all(Vec::is_empty)
    }
}

/// An ordered, finite sequence of requests.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Trace<K> {
    requests: Vec<Request<K>>,
}

impl<K> Trace<K> {
    /// Creates a trace from requests in replay order.
    pub fn new(requests: Vec<Request<K>>) -> Self {
        Self { requests }
    }

    /// The requests in replay order.
    pub fn requests(&self) -> &[Request<K>] {
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

    /// Iterates requests in replay order.
    pub fn iter(&self) -> std::slice::Iter<'_, Request<K>> {
        self.requests.iter()
    }
}

impl<K> FromIterator<Request<K>> for Trace<K> {
    fn from_iter<I: IntoIterator<Item = Request<K>>>(iter: I) -> Self {
        Self {
            requests: iter.into_iter().collect(),
        }
    }
}

/// Parses a raw trace from a reader.
///
/// Blank lines are skipped. The terminal `;`/`,` separator convention means
/// the final split field of each line (and of each level) is discarded;
/// lines without the terminal separator therefore lose their last field,
/// matching the format producers' convention.
///
/// Logs the request and distinct-key counts at `info` level once parsing
/// completes.
pub fn parse_trace<K, R>(reader: R) -> Result<Trace<K>, TraceParseError>
where
    K: FromStr + Eq + Hash + Clone,
    K::Err: fmt::Display,
    R: BufRead,
{
    let mut requests = Vec::new();
    let mut distinct: FxHashSet<K> = FxHashSet::default();

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx as u64 + 1;
        let line = line.map_err(|e| TraceParseError::new(line_no, format!("io error: {e}")))?;
        if line.is_empty() {
            continue;
        }

        let mut levels = Vec::new();
        for field in drop_terminal(line.split(';')) {
            let mut level = Vec::new();
            for raw_key in drop_terminal(field.split(',')) {
                let key: K = raw_key.parse().map_err(|e| {
                    TraceParseError::new(line_no, format!("bad key {raw_key:?}: {e}"))
                })?;
                distinct.insert(key.clone());
                level.push(key);
            }
            levels.push(level);
        }
        requests.push(Request::new(levels));
    }

    info!(
        "parsed trace: {} requests, {} distinct keys",
        requests.len(),
        distinct.len()
    );
    Ok(Trace::new(requests))
}

/// Reads a raw trace from a file path.
pub fn read_trace<K>(path: impl AsRef<Path>) -> Result<Trace<K>, TraceParseError>
where
    K: FromStr + Eq + Hash + Clone,
    K::Err: fmt::Display,
{
    let file =
        File::open(path).map_err(|e| TraceParseError::new(0, format!("open failed: {e}")))?;
    parse_trace(BufReader::new(file))
}

/// Drops the last item of an iterator: the empty field produced by the
/// terminal separator convention.
fn drop_terminal<'a, I>(iter: I) -> impl Iterator<Item = &'a str>
where
    I: Iterator<Item = &'a str>,
{
    let fields: Vec<&str> = iter.collect();
    let keep = fields.len().saturating_sub(1);
    fields.into_iter().take(keep)
}
