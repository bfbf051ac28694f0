//! Lane differencing.

use crate::error::DiffError;
use serde::{Deserialize, Serialize};
use sigcmp_core::{Interval, intervals};
use sigcmp_trace::{Lane, LaneValues};
use tracing::warn;

/// Named per-sample divergence flags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DivergenceVector {
    name: String,
    bits: Vec<bool>,
}

impl DivergenceVector {
    /// Wrap existing flags
    #[must_use]
    pub fn new(name: impl Into<String>, bits: Vec<bool>) -> Self {
        Self {
            name: name.into(),
            bits,
        }
    }

    /// All-false vector of `len` samples
    #[must_use]
    pub fn zeros(name: impl Into<String>, len: usize) -> Self {
        Self::new(name, vec![false; len])
    }

    /// Identifier the vector belongs to
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of samples
    #[must_use]
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Check if the vector has no samples
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Flag at `index`, false past the end
    #[must_use]
    pub fn get(&self, index: usize) -> bool {
        self.bits.get(index).copied().unwrap_or(false)
    }

    /// Number of divergent samples
    #[must_use]
    pub fn count(&self) -> usize {
        self.bits.iter().filter(|b| **b).count()
    }

    /// Index of the first divergent sample
    #[must_use]
    pub fn first(&self) -> Option<usize> {
        self.bits.iter().position(|b| *b)
    }

    /// Maximal runs of divergent samples
    #[must_use]
    pub fn intervals(&self) -> Vec<Interval> {
        intervals(&self.bits)
    }

    /// OR another vector into this one, growing to the longer length
    pub fn merge(&mut self, other: &DivergenceVector) {
        if other.bits.len() > self.bits.len() {
            self.bits.resize(other.bits.len(), false);
        }
        for (mine, theirs) in self.bits.iter_mut().zip(&other.bits) {
            *mine |= *theirs;
        }
    }

    /// Raw flags
    #[must_use]
    pub fn as_slice(&self) -> &[bool] {
        &self.bits
    }
}

/// Result of comparing two lanes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneDiff {
    /// Elements per sample in `per_element`
    pub width: usize,
    /// Sample-major per-element flags
    pub per_element: Vec<bool>,
    /// Per-sample flags, OR over each sample's elements
    pub collapsed: DivergenceVector,
}

impl LaneDiff {
    /// Flag for element `j` of sample `i`
    #[must_use]
    pub fn element(&self, sample: usize, element: usize) -> bool {
        self.per_element
            .get(sample * self.width + element)
            .copied()
            .unwrap_or(false)
    }

    /// Number of samples compared
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.collapsed.len()
    }
}

/// Compare two lanes sample by sample
///
/// Elements are compared by value. Lanes of different element kinds are
/// widened before comparing; float comparison follows IEEE rules so NaN
/// always diverges. Lanes of different widths diverge at every sample.
///
/// # Errors
///
/// Returns `LengthMismatch` if the sample counts differ
pub fn diff(reference: &Lane, other: &Lane) -> Result<LaneDiff, DiffError> {
    let samples = reference.sample_count();
    if samples != other.sample_count() {
        return Err(DiffError::LengthMismatch {
            signal: reference.name.clone(),
            reference: samples,
            other: other.sample_count(),
        });
    }

    if reference.width != other.width {
        warn!(
            signal = %reference.name,
            reference_width = reference.width,
            other_width = other.width,
            "array widths differ, every sample diverges"
        );
        return Ok(LaneDiff {
            width: reference.width,
            per_element: vec![true; samples * reference.width],
            collapsed: DivergenceVector::new(&reference.name, vec![true; samples]),
        });
    }

    let per_element = element_flags(&reference.values, &other.values);
    let collapsed = if reference.width == 1 {
        per_element.clone()
    } else {
        per_element
            .chunks(reference.width)
            .map(|sample| sample.iter().any(|b| *b))
            .collect()
    };

    Ok(LaneDiff {
        width: reference.width,
        per_element,
        collapsed: DivergenceVector::new(&reference.name, collapsed),
    })
}

fn element_flags(a: &LaneValues, b: &LaneValues) -> Vec<bool> {
    macro_rules! same_kind {
        ($($variant:ident),*) => {
            match (a, b) {
                $(
                    (LaneValues::$variant(x), LaneValues::$variant(y)) => {
                        return x.iter().zip(y).map(|(l, r)| l != r).collect();
                    }
                )*
                _ => {}
            }
        };
    }
    same_kind!(U8, I8, U16, I16, U32, I32, U64, I64, F32, F64);

    warn!(
        reference = %a.kind(),
        other = %b.kind(),
        "element kinds differ, comparing by value"
    );
    (0..a.len())
        .map(|i| !a.numeric(i).same_value(b.numeric(i)))
        .collect()
}
