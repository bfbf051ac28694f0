//! Decoder error taxonomy.
//!
//! `Format`, `Truncated` and `CorruptData` are fatal for any comparison that
//! touches the file. `SignalNotFound` is recoverable per signal.

use sigcmp_core::CoreError;
use std::io;

/// Decoder result type
pub type TraceResult<T> = Result<T, TraceError>;

/// Errors raised while opening or reading a trace container
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TraceError {
    /// Unrecognised magic, version, signature or type code
    #[error("format error: {reason}")]
    Format {
        /// What was wrong
        reason: String,
    },

    /// A declared section or block reaches past the end of the file
    #[error("truncated file: {section} needs {needed} bytes, file has {actual}")]
    Truncated {
        /// Section being read
        section: String,
        /// End offset the section requires
        needed: u64,
        /// Actual file size
        actual: u64,
    },

    /// Stored bytes disagree with the lane's declared shape
    #[error("corrupt data in lane '{lane}': {reason}")]
    CorruptData {
        /// Lane being read
        lane: String,
        /// What was inconsistent
        reason: String,
    },

    /// No lane with that name in the catalog
    #[error("signal not found: {name}")]
    SignalNotFound {
        /// Requested name
        name: String,
    },

    /// Underlying I/O failure
    #[error("IO error: {0}")]
    Io(String),
}

impl TraceError {
    /// Shorthand for a format error
    pub fn format(reason: impl Into<String>) -> Self {
        Self::Format {
            reason: reason.into(),
        }
    }

    /// Shorthand for a corrupt data error
    pub fn corrupt(lane: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CorruptData {
            lane: lane.into(),
            reason: reason.into(),
        }
    }
}

impl From<io::Error> for TraceError {
    fn from(err: io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<CoreError> for TraceError {
    fn from(err: CoreError) -> Self {
        Self::Format {
            reason: err.to_string(),
        }
    }
}
