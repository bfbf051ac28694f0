//! Sample time axis.
//!
//! Trace timestamps are recorded in microseconds. The axis stores them
//! relative to the first sample so reports start at zero.

use serde::{Deserialize, Serialize};

/// Microseconds per second
pub const MICROS_PER_SEC: f64 = 1_000_000.0;

/// Relative sample times in microseconds, one per sample index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleAxis {
    offsets: Vec<i64>,
}

impl SampleAxis {
    /// Build from absolute timestamps
    #[must_use]
    pub fn from_timestamps(timestamps: &[i64]) -> Self {
        let base = timestamps.first().copied().unwrap_or(0);
        Self {
            offsets: timestamps.iter().map(|t| t.wrapping_sub(base)).collect(),
        }
    }

    /// Number of samples
    #[must_use]
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Check if the axis is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Relative time of a sample in microseconds.
    ///
    /// Indices past the end clamp to the last sample; an empty axis yields 0.
    #[must_use]
    pub fn micros_at(&self, index: usize) -> i64 {
        self.offsets
            .get(index)
            .or_else(|| self.offsets.last())
            .copied()
            .unwrap_or(0)
    }

    /// Relative time of a sample in seconds
    #[must_use]
    pub fn seconds_at(&self, index: usize) -> f64 {
        self.micros_at(index) as f64 / MICROS_PER_SEC
    }
}
