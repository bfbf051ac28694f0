//! Contiguous runs of divergent samples.

use serde::{Deserialize, Serialize};

/// Inclusive range of sample indices `[start, stop]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Interval {
    /// First sample of the run
    pub start: usize,
    /// Last sample of the run
    pub stop: usize,
}

impl Interval {
    /// Create a new interval
    #[must_use]
    pub const fn new(start: usize, stop: usize) -> Self {
        Self { start, stop }
    }

    /// Number of samples covered
    #[must_use]
    pub const fn len(&self) -> usize {
        self.stop - self.start + 1
    }

    /// Intervals always cover at least one sample
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Whether the sample index falls inside the run
    #[must_use]
    pub const fn contains(&self, index: usize) -> bool {
        index >= self.start && index <= self.stop
    }
}

/// Split a boolean sequence into its maximal runs of `true`
#[must_use]
pub fn intervals(bits: &[bool]) -> Vec<Interval> {
    let mut out = Vec::new();
    let mut start = None;

    for (i, &bit) in bits.iter().enumerate() {
        match (bit, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                out.push(Interval::new(s, i - 1));
                start = None;
            }
            _ => {}
        }
    }

    if let Some(s) = start {
        out.push(Interval::new(s, bits.len() - 1));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_intervals_empty() {
        assert!(intervals(&[]).is_empty());
        assert!(intervals(&[false, false]).is_empty());
    }

    #[test]
    fn test_intervals_runs() {
        let bits = [false, true, true, false, true, false];
        assert_eq!(
            intervals(&bits),
            vec![Interval::new(1, 2), Interval::new(4, 4)]
        );
    }

    #[test]
    fn test_intervals_open_end() {
        let bits = [true, false, true, true];
        assert_eq!(
            intervals(&bits),
            vec![Interval::new(0, 0), Interval::new(2, 3)]
        );
    }

    #[test]
    fn test_interval_len_contains() {
        let iv = Interval::new(3, 5);
        assert_eq!(iv.len(), 3);
        assert!(iv.contains(4));
        assert!(!iv.contains(6));
    }

    proptest! {
        #[test]
        fn prop_intervals_cover_true_bits(bits: Vec<bool>) {
            let runs = intervals(&bits);
            let covered: usize = runs.iter().map(Interval::len).sum();
            prop_assert_eq!(covered, bits.iter().filter(|b| **b).count());
            for (i, bit) in bits.iter().enumerate() {
                prop_assert_eq!(*bit, runs.iter().any(|r| r.contains(i)));
            }
        }
    }
}
