//! beladykit: offline clairvoyant (Belady/OPT) eviction simulators for
//! DAG-shaped, leveled access traces.
//!
//! A measurement tool for comparing real eviction policies against the
//! theoretical optimum: given perfect knowledge of the future, what hit
//! ratio is achievable at cache size N, and how does it decompose by
//! level and by whole-transaction reuse? Not a production cache.
//!
//! The public surface is small:
//! [`annotate`](trace::annotate::annotate) prepares a raw trace,
//! [`run_belady`](policy::belady::run_belady) replays the key-level
//! oracle over it, and
//! [`run_transactional`](policy::txn_belady::run_transactional) replays
//! the transaction-level oracle over the raw trace directly. Each run
//! returns a [`ReplaySnapshot`](metrics::ReplaySnapshot).

pub mod config;
pub mod ds;
pub mod error;
pub mod metrics;
pub mod policy;
pub mod prelude;
pub mod trace;
