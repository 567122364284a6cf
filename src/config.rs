//! Replay configuration shared by both oracles.
//!
//! A [`ReplayConfig`] bundles the three knobs every simulation run needs:
//! the cache capacity, the warmup threshold below which no metrics are
//! accumulated, and the optional checkpoint index at which the
//! cache-composition snapshot ratio is taken.
//!
//! Defaults are sized for multi-hundred-thousand-request traces: warmup
//! 100 000, checkpoint 150 000.
//!
//! ## Example Usage
//!
//! ```
//! use beladykit::config::ReplayConfig;
//!
//! let cfg = ReplayConfig::try_new(10_000)
//!     .unwrap()
//!     .with_warmup(0)
//!     .with_checkpoint(None);
//! assert_eq!(cfg.capacity, 10_000);
//! assert_eq!(cfg.warmup, 0);
//! ```

use crate::error::ConfigError;

/// Default warmup threshold: requests at 0-based index <= warmup are
/// replayed but excluded from every metric.
pub const DEFAULT_WARMUP: u64 = 100_000;

/// Default checkpoint index for the cache-composition snapshot ratio.
pub const DEFAULT_CHECKPOINT: u64 = 150_000;

/// Parameters for one simulation run.
///
/// One config = one independent run; the same config may be reused across
/// runs since replay state lives in the oracle, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayConfig {
    /// Maximum number of cached keys. The cache never holds more than this
    /// many entries after a request has been fully processed.
    pub capacity: usize,
    /// Warmup threshold. A request at 0-based index `i` updates metrics
    /// only when `i > warmup`.
    pub warmup: u64,
    /// Request index at which the cache-composition hit ratio is computed,
    /// or `None` to skip the snapshot.
    pub checkpoint: Option<u64>,
}

impl ReplayConfig {
    /// Creates a config with the given capacity and default warmup and
    /// checkpoint. Rejects zero capacity.
    pub fn try_new(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::new("capacity must be > 0"));
        }
        Ok(Self {
            capacity,
            warmup: DEFAULT_WARMUP,
            checkpoint: Some(DEFAULT_CHECKPOINT),
        })
    }

    /// Sets the warmup threshold.
    pub fn with_warmup(mut self, warmup: u64) -> Self {
        self.warmup = warmup;
        self
    }

    /// Sets or clears the checkpoint index.
    pub fn with_checkpoint(mut self, checkpoint: Option<u64>) -> Self {
        self.checkpoint = checkpoint;
        self
    }
}
