//! Comparison errors.

use sigcmp_trace::TraceError;

/// Result type for comparison operations
pub type CompareResult<T> = Result<T, SessionError>;

/// Raised by the lane differencer
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiffError {
    /// Compared lanes hold different numbers of samples
    #[error("length mismatch for '{signal}': {reference} vs {other} samples")]
    LengthMismatch {
        /// Reference lane name
        signal: String,
        /// Samples in the reference lane
        reference: usize,
        /// Samples in the other lane
        other: usize,
    },
}

/// Raised by a comparison session
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The traces cannot be compared sample by sample
    #[error("incomparable traces: {reason}")]
    IncomparableTraces {
        /// Why the precondition failed
        reason: String,
    },

    /// Decoder failure
    #[error(transparent)]
    Trace(#[from] TraceError),

    /// Differencer failure
    #[error(transparent)]
    Diff(#[from] DiffError),

    /// Invalid comparison configuration
    #[error("invalid configuration: {reason}")]
    Config {
        /// What was wrong
        reason: String,
    },

    /// Filesystem failure outside the decoder
    #[error("IO error: {0}")]
    Io(String),
}

impl SessionError {
    /// Shorthand for an incomparable-traces error
    pub fn incomparable(reason: impl Into<String>) -> Self {
        Self::IncomparableTraces {
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for SessionError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
