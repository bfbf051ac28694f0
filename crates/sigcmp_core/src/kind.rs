//! Element kinds stored in trace lanes.
//!
//! The set is closed: every lane resolves to exactly one kind when the
//! catalog is decoded, and downstream code switches on the tag.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scalar type of a single lane element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    /// Unsigned 8 bit
    U8,
    /// Signed 8 bit
    I8,
    /// Unsigned 16 bit
    U16,
    /// Signed 16 bit
    I16,
    /// Unsigned 32 bit
    U32,
    /// Signed 32 bit
    I32,
    /// Unsigned 64 bit
    U64,
    /// Signed 64 bit
    I64,
    /// IEEE 754 single precision
    F32,
    /// IEEE 754 double precision
    F64,
}

impl ElementKind {
    /// All kinds, in type-code order
    pub const ALL: [ElementKind; 10] = [
        Self::U8,
        Self::I8,
        Self::U16,
        Self::I16,
        Self::U32,
        Self::I32,
        Self::U64,
        Self::I64,
        Self::F32,
        Self::F64,
    ];

    /// Size of one element in bytes
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            Self::U8 | Self::I8 => 1,
            Self::U16 | Self::I16 => 2,
            Self::U32 | Self::I32 | Self::F32 => 4,
            Self::U64 | Self::I64 | Self::F64 => 8,
        }
    }

    /// Type code used by the block layout header.
    ///
    /// Bit 15 marks signed values, bit 12 marks floating point, the low
    /// byte holds the width in bits.
    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::U8 => 0x0008,
            Self::I8 => 0x8008,
            Self::U16 => 0x0010,
            Self::I16 => 0x8010,
            Self::U32 => 0x0020,
            Self::I32 => 0x8020,
            Self::U64 => 0x0040,
            Self::I64 => 0x8040,
            Self::F32 => 0x9010,
            Self::F64 => 0x9020,
        }
    }

    /// Resolve a block layout type code
    ///
    /// # Errors
    ///
    /// Returns error if the code is not one of the ten known codes
    pub fn from_code(code: u32) -> CoreResult<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.code() == code)
            .ok_or(CoreError::UnknownElementKind { code })
    }

    /// Short lowercase name (`u8`, `f64`, ...)
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::U8 => "u8",
            Self::I8 => "i8",
            Self::U16 => "u16",
            Self::I16 => "i16",
            Self::U32 => "u32",
            Self::I32 => "i32",
            Self::U64 => "u64",
            Self::I64 => "i64",
            Self::F32 => "f32",
            Self::F64 => "f64",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ElementKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| CoreError::UnknownElementName {
                name: s.to_string(),
            })
    }
}
