//! Container format versions.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// On-disk layout family selected by the major version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Layout {
    /// Interleaved fixed-size rows (major 1)
    Legacy,
    /// Per-lane block lists with a trailer (major 2 and 3)
    Block {
        /// Block offsets are stored as u64 instead of u32
        wide_offsets: bool,
    },
}

/// Version triple stored right after the leading magic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FormatVersion {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl FormatVersion {
    /// Legacy fixed-row revision
    pub const LEGACY: Self = Self::new(1, 0, 0);
    /// Block layout with 32 bit offsets
    pub const BLOCK_V2: Self = Self::new(2, 0, 0);
    /// Block layout with 64 bit offsets
    pub const BLOCK_V3: Self = Self::new(3, 0, 0);

    /// Create a new version
    #[must_use]
    pub const fn new(major: u8, minor: u8, patch: u8) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Create from the three raw header bytes
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 3]) -> Self {
        Self::new(bytes[0], bytes[1], bytes[2])
    }

    /// Get as raw header bytes
    #[must_use]
    pub const fn as_bytes(&self) -> [u8; 3] {
        [self.major, self.minor, self.patch]
    }

    /// Layout implied by the major version
    ///
    /// # Errors
    ///
    /// Returns error for majors other than 1, 2 and 3
    pub fn layout(&self) -> CoreResult<Layout> {
        match self.major {
            1 => Ok(Layout::Legacy),
            2 => Ok(Layout::Block {
                wide_offsets: false,
            }),
            3 => Ok(Layout::Block { wide_offsets: true }),
            _ => Err(CoreError::UnsupportedVersion {
                version: self.to_string(),
            }),
        }
    }
}

impl Default for FormatVersion {
    fn default() -> Self {
        Self::BLOCK_V3
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
