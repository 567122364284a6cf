//! Curated re-exports for simulator users.

pub use crate::config::{DEFAULT_CHECKPOINT, DEFAULT_WARMUP, ReplayConfig};
pub use crate::error::{ConfigError, InvariantError, TraceParseError};
pub use crate::metrics::{ReplayMetrics, ReplaySnapshot, RequestObservation};
pub use crate::policy::belady::{BeladyCache, run_belady};
pub use crate::policy::fifo::FifoReplay;
pub use crate::policy::txn_belady::{TransactionalBeladyCache, run_transactional};
pub use crate::trace::annotate::{
    AnnotatedKey, AnnotatedRequest, AnnotatedTrace, NEVER, annotate, read_annotated,
    read_annotated_file, write_annotated, write_annotated_file,
};
pub use crate::trace::{Request, Trace, parse_trace, read_trace};
