//! Lane catalog: everything known about a lane without reading its data.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sigcmp_core::ElementKind;
use tracing::warn;

/// Where a lane's bytes live in the container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Storage {
    /// Block layout: absolute file offsets of each data block, in order
    Blocks(Vec<u64>),
    /// Legacy layout: byte offset of the lane's column within each row
    Row {
        /// Column offset inside a row
        column_offset: u64,
    },
}

/// Lane metadata as recorded in the container header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneDescriptor {
    /// Dotted lane name
    pub name: String,
    /// Element type
    pub kind: ElementKind,
    /// Elements per sample
    pub width: usize,
    /// Number of samples
    pub sample_count: usize,
    /// Location of the data
    pub storage: Storage,
}

impl LaneDescriptor {
    /// Total stored elements
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.sample_count * self.width
    }

    /// Bytes occupied by one sample
    #[must_use]
    pub fn sample_size(&self) -> usize {
        self.width * self.kind.size()
    }
}

/// Ordered lane catalog keyed by name.
///
/// Iteration follows the order lanes were declared in the container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    lanes: IndexMap<String, LaneDescriptor>,
}

impl Catalog {
    /// Create an empty catalog
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a lane. A repeated name keeps the first declaration.
    pub fn insert(&mut self, descriptor: LaneDescriptor) {
        if self.lanes.contains_key(&descriptor.name) {
            warn!(lane = %descriptor.name, "duplicate lane name, keeping first declaration");
            return;
        }
        self.lanes.insert(descriptor.name.clone(), descriptor);
    }

    /// Exact lookup
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&LaneDescriptor> {
        self.lanes.get(name)
    }

    /// Exact lookup, falling back to a case-insensitive match
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&LaneDescriptor> {
        self.get(name).or_else(|| {
            self.lanes
                .values()
                .find(|d| d.name.eq_ignore_ascii_case(name))
        })
    }

    /// Check if a lane exists (exact name)
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.lanes.contains_key(name)
    }

    /// Lane names in declaration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.lanes.keys().map(String::as_str)
    }

    /// Descriptors in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &LaneDescriptor> {
        self.lanes.values()
    }

    /// Number of lanes
    #[must_use]
    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    /// Check if the catalog is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }
}
