//! Replay oracles.
//!
//! - [`belady`]: key-level clairvoyant (Belady/OPT) eviction over an
//!   annotated trace.
//! - [`txn_belady`]: transaction-level clairvoyant eviction over a raw
//!   trace, crediting whole-transaction reuse.
//! - [`fifo`]: trivial FIFO baseline used as a comparison yardstick in
//!   tests and benchmarks; not part of the research surface.

pub mod belady;
pub mod fifo;
pub mod txn_belady;

pub use belady::{BeladyCache, run_belady};
pub use fifo::FifoReplay;
pub use txn_belady::{TransactionalBeladyCache, run_transactional};
