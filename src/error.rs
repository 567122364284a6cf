//! Error types for the beladykit library.
//!
//! ## Key Components
//!
//! - [`TraceParseError`]: Returned when a trace file line is structurally
//!   malformed (missing separators, wrong field count, non-numeric index).
//! - [`InvariantError`]: Returned when a simulation invariant is violated
//!   (e.g. cache size exceeding capacity after eviction). Fatal for the run;
//!   it signals an eviction-loop bug, not a recoverable condition.
//! - [`ConfigError`]: Returned when replay configuration parameters are
//!   invalid (e.g. zero capacity).
//!
//! ## Example Usage
//!
//! ```
//! use beladykit::config::ReplayConfig;
//! use beladykit::error::ConfigError;
//!
//! // Fallible constructor for user-configurable parameters
//! let cfg: Result<ReplayConfig, ConfigError> = ReplayConfig::try_new(100);
//! assert!(cfg.is_ok());
//!
//! // Invalid capacity is caught without panicking
//! let bad = ReplayConfig::try_new(0);
//! assert!(bad.is_err());
//! ```

use std::fmt;

// ---------------------------------------------------------------------------
// TraceParseError
// ---------------------------------------------------------------------------

/// Error returned when a trace file line cannot be parsed.
///
/// Carries the 1-based line number of the offending line so a malformed
/// trace can be located and fixed. Produced by the raw and annotated trace
/// readers in [`crate::trace`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceParseError {
    line: u64,
    msg: String,
}

impl TraceParseError {
    /// Creates a new `TraceParseError` for the given 1-based line number.
    #[inline]
    pub fn new(line: u64, msg: impl Into<String>) -> Self {
        Self {
            line,
            msg: msg.into(),
        }
    }

    /// Returns the 1-based line number of the offending line.
    #[inline]
    pub fn line(&self) -> u64 {
        self.line
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.msg
    }
}

impl fmt::Display for TraceParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "trace line {}: {}", self.line, self.msg)
    }
}

impl std::error::Error for TraceParseError {}

// ---------------------------------------------------------------------------
// InvariantError
// ---------------------------------------------------------------------------

/// Error returned when a simulation invariant is violated.
///
/// Produced by the replay loops in [`crate::policy`] when, for example, the
/// cache still exceeds its capacity after eviction. Carries a human-readable
/// description of which invariant failed. A run that produces this error is
/// corrupted and must not be continued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantError(String);

impl InvariantError {
    /// Creates a new `InvariantError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for InvariantError {}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when replay configuration parameters are invalid.
///
/// Produced by fallible constructors such as
/// [`ReplayConfig::try_new`](crate::config::ReplayConfig::try_new). Carries a
/// human-readable description of which parameter failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(String);

impl ConfigError {
    /// Creates a new `ConfigError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- TraceParseError --------------------------------------------------

    #[test]
    fn parse_display_includes_line_number() {
        let err = TraceParseError::new(42, "expected 3 dot-separated fields");
        assert_eq!(
            err.to_string(),
            "trace line 42: expected 3 dot-separated fields"
        );
    }

    #[test]
    fn parse_accessors() {
        let err = TraceParseError::new(7, "bad index");
        assert_eq!(err.line(), 7);
        assert_eq!(err.message(), "bad index");
    }

    #[test]
    fn parse_clone_and_eq() {
        let a = TraceParseError::new(1, "x");
        let b = a.clone();
        assert_eq!(a, b);
    }

    #[test]
    fn parse_implements_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<TraceParseError>();
    }

    // -- InvariantError ---------------------------------------------------

    #[test]
    fn invariant_display_shows_message() {
        let err = InvariantError::new("cache size exceeds capacity");
        assert_eq!(err.to_string(), "cache size exceeds capacity");
    }

    #[test]
    fn invariant_message_accessor() {
        let err = InvariantError::new("test");
        assert_eq!(err.message(), "test");
    }

    #[test]
    fn invariant_implements_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<InvariantError>();
    }

    // -- ConfigError ------------------------------------------------------

    #[test]
    fn config_display_shows_message() {
        let err = ConfigError::new("capacity must be > 0");
        assert_eq!(err.to_string(), "capacity must be > 0");
    }

    #[test]
    fn config_clone_and_eq() {
        let a = ConfigError::new("x");
        let b = a.clone();
        assert_eq!(a, b);
    }

    #[test]
    fn config_implements_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<ConfigError>();
    }
}
