//! Materialized lane data.
//!
//! Every lane is normalized to one owned, contiguous typed buffer holding
//! `sample_count * array_width` elements in sample-major order. Scalar
//! lanes are simply width 1.

use crate::error::{TraceError, TraceResult};
use serde::{Deserialize, Serialize};
use sigcmp_core::ElementKind;
use std::ops::Range;

/// Typed element buffer, one variant per element kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum LaneValues {
    U8(Vec<u8>),
    I8(Vec<i8>),
    U16(Vec<u16>),
    I16(Vec<i16>),
    U32(Vec<u32>),
    I32(Vec<i32>),
    U64(Vec<u64>),
    I64(Vec<i64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

/// Apply the same expression to whichever vector a `LaneValues` holds
macro_rules! with_values {
    ($values:expr, $v:ident => $body:expr) => {
        match $values {
            LaneValues::U8($v) => $body,
            LaneValues::I8($v) => $body,
            LaneValues::U16($v) => $body,
            LaneValues::I16($v) => $body,
            LaneValues::U32($v) => $body,
            LaneValues::I32($v) => $body,
            LaneValues::U64($v) => $body,
            LaneValues::I64($v) => $body,
            LaneValues::F32($v) => $body,
            LaneValues::F64($v) => $body,
        }
    };
}

/// Rebuild a `LaneValues` of the same variant from a vector expression
macro_rules! map_values {
    ($values:expr, $v:ident => $body:expr) => {
        match $values {
            LaneValues::U8($v) => LaneValues::U8($body),
            LaneValues::I8($v) => LaneValues::I8($body),
            LaneValues::U16($v) => LaneValues::U16($body),
            LaneValues::I16($v) => LaneValues::I16($body),
            LaneValues::U32($v) => LaneValues::U32($body),
            LaneValues::I32($v) => LaneValues::I32($body),
            LaneValues::U64($v) => LaneValues::U64($body),
            LaneValues::I64($v) => LaneValues::I64($body),
            LaneValues::F32($v) => LaneValues::F32($body),
            LaneValues::F64($v) => LaneValues::F64($body),
        }
    };
}


/// Single element widened for cross-kind comparison
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Numeric {
    /// Any integer kind
    Int(i128),
    /// Any float kind
    Float(f64),
}

impl Numeric {
    /// Value equality across integer and float representations
    #[must_use]
    pub fn same_value(self, other: Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Int(a), Self::Float(b)) | (Self::Float(b), Self::Int(a)) => a as f64 == b,
        }
    }

    /// Integer view, truncating floats toward zero
    #[must_use]
    pub fn as_i64(self) -> i64 {
        match self {
            Self::Int(v) => v as i64,
            Self::Float(v) => v as i64,
        }
    }
}

impl LaneValues {
    /// Empty buffer of the given kind
    #[must_use]
    pub fn empty(kind: ElementKind) -> Self {
        Self::with_capacity(kind, 0)
    }

    /// Empty buffer of the given kind with reserved capacity
    #[must_use]
    pub fn with_capacity(kind: ElementKind, capacity: usize) -> Self {
        match kind {
            ElementKind::U8 => Self::U8(Vec::with_capacity(capacity)),
            ElementKind::I8 => Self::I8(Vec::with_capacity(capacity)),
            ElementKind::U16 => Self::U16(Vec::with_capacity(capacity)),
            ElementKind::I16 => Self::I16(Vec::with_capacity(capacity)),
            ElementKind::U32 => Self::U32(Vec::with_capacity(capacity)),
            ElementKind::I32 => Self::I32(Vec::with_capacity(capacity)),
            ElementKind::U64 => Self::U64(Vec::with_capacity(capacity)),
            ElementKind::I64 => Self::I64(Vec::with_capacity(capacity)),
            ElementKind::F32 => Self::F32(Vec::with_capacity(capacity)),
            ElementKind::F64 => Self::F64(Vec::with_capacity(capacity)),
        }
    }

    /// Element kind of the buffer
    #[must_use]
    pub const fn kind(&self) -> ElementKind {
        match self {
            Self::U8(_) => ElementKind::U8,
            Self::I8(_) => ElementKind::I8,
            Self::U16(_) => ElementKind::U16,
            Self::I16(_) => ElementKind::I16,
            Self::U32(_) => ElementKind::U32,
            Self::I32(_) => ElementKind::I32,
            Self::U64(_) => ElementKind::U64,
            Self::I64(_) => ElementKind::I64,
            Self::F32(_) => ElementKind::F32,
            Self::F64(_) => ElementKind::F64,
        }
    }

    /// Number of elements (not samples)
    #[must_use]
    pub fn len(&self) -> usize {
        with_values!(self, v => v.len())
    }

    /// Check if the buffer holds no elements
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of an element range
    #[must_use]
    pub fn slice(&self, range: Range<usize>) -> Self {
        map_values!(self, v => v[range].to_vec())
    }

    /// Widened element at `index`
    #[must_use]
    pub fn numeric(&self, index: usize) -> Numeric {
        match self {
            Self::U8(v) => Numeric::Int(i128::from(v[index])),
            Self::I8(v) => Numeric::Int(i128::from(v[index])),
            Self::U16(v) => Numeric::Int(i128::from(v[index])),
            Self::I16(v) => Numeric::Int(i128::from(v[index])),
            Self::U32(v) => Numeric::Int(i128::from(v[index])),
            Self::I32(v) => Numeric::Int(i128::from(v[index])),
            Self::U64(v) => Numeric::Int(i128::from(v[index])),
            Self::I64(v) => Numeric::Int(i128::from(v[index])),
            Self::F32(v) => Numeric::Float(f64::from(v[index])),
            Self::F64(v) => Numeric::Float(v[index]),
        }
    }
}

macro_rules! impl_from_vec {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<Vec<$ty>> for LaneValues {
                fn from(values: Vec<$ty>) -> Self {
                    Self::$variant(values)
                }
            }
        )*
    };
}

impl_from_vec! {
    u8 => U8, i8 => I8, u16 => U16, i16 => I16, u32 => U32,
    i32 => I32, u64 => U64, i64 => I64, f32 => F32, f64 => F64,
}

/// A named lane with its samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lane {
    /// Dotted lane name
    pub name: String,
    /// Elements per sample
    pub width: usize,
    /// Sample-major element buffer
    pub values: LaneValues,
}

impl Lane {
    /// Create a lane, validating the buffer against the width
    ///
    /// # Errors
    ///
    /// Returns error if width is zero or the buffer is not a whole number of samples
    pub fn new(name: impl Into<String>, width: usize, values: impl Into<LaneValues>) -> TraceResult<Self> {
        let name = name.into();
        let values = values.into();
        if width == 0 {
            return Err(TraceError::corrupt(name, "array width must be at least 1"));
        }
        if values.len() % width != 0 {
            return Err(TraceError::corrupt(
                name,
                format!("{} elements do not divide into width {}", values.len(), width),
            ));
        }
        Ok(Self {
            name,
            width,
            values,
        })
    }

    /// Scalar lane shorthand
    ///
    /// # Errors
    ///
    /// Never fails for width 1; kept fallible for symmetry with [`Lane::new`]
    pub fn scalar(name: impl Into<String>, values: impl Into<LaneValues>) -> TraceResult<Self> {
        Self::new(name, 1, values)
    }

    /// Element kind
    #[must_use]
    pub fn kind(&self) -> ElementKind {
        self.values.kind()
    }

    /// Number of samples
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.values.len() / self.width
    }

    /// Copy of `count` samples starting at `offset`, clamped to the lane
    #[must_use]
    pub fn window(&self, offset: usize, count: Option<usize>) -> Self {
        let total = self.sample_count();
        let start = offset.min(total);
        let end = count.map_or(total, |c| start.saturating_add(c).min(total));
        Self {
            name: self.name.clone(),
            width: self.width,
            values: self.values.slice(start * self.width..end * self.width),
        }
    }

    /// First element of every sample as an integer, for time axes
    #[must_use]
    pub fn leading_i64(&self) -> Vec<i64> {
        (0..self.sample_count())
            .map(|i| self.values.numeric(i * self.width).as_i64())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lane_new_validates_width() {
        assert!(Lane::new("A.b", 0, vec![1u8]).is_err());
        assert!(Lane::new("A.b", 2, vec![1u8, 2, 3]).is_err());
        let lane = Lane::new("A.b", 3, vec![1u16, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(lane.sample_count(), 2);
        assert_eq!(lane.kind(), ElementKind::U16);
    }

    #[test]
    fn test_lane_window() {
        let lane = Lane::new("A.arr", 2, vec![0i32, 1, 2, 3, 4, 5, 6, 7]).unwrap();
        let win = lane.window(1, Some(2));
        assert_eq!(win.values, LaneValues::I32(vec![2, 3, 4, 5]));
        assert_eq!(win.sample_count(), 2);
    }

    #[test]
    fn test_lane_window_clamps() {
        let lane = Lane::scalar("A.s", vec![1.0f64, 2.0, 3.0]).unwrap();
        assert_eq!(lane.window(2, Some(100)).sample_count(), 1);
        assert_eq!(lane.window(5, None).sample_count(), 0);
        assert_eq!(lane.window(0, None), lane);
    }

    #[test]
    fn test_numeric_cross_kind() {
        let ints = LaneValues::from(vec![3u32]);
        let floats = LaneValues::from(vec![3.0f32]);
        assert!(ints.numeric(0).same_value(floats.numeric(0)));
        let other = LaneValues::from(vec![3.5f64]);
        assert!(!ints.numeric(0).same_value(other.numeric(0)));
    }

    #[test]
    fn test_numeric_nan_never_equal() {
        let a = LaneValues::from(vec![f64::NAN]);
        assert!(!a.numeric(0).same_value(a.numeric(0)));
    }


    #[test]
    fn test_leading_i64() {
        let lane = Lane::new("MTS.ts", 2, vec![10u64, 0, 20, 0]).unwrap();
        assert_eq!(lane.leading_i64(), vec![10, 20]);
    }
}
