//! Read-only trace file handle.

use crate::block::{self, BlockLayout};
use crate::catalog::{Catalog, LaneDescriptor, Storage};
use crate::error::{TraceError, TraceResult};
use crate::legacy::{self, LegacyLayout};
use crate::values::Lane;
use serde::{Deserialize, Serialize};
use sigcmp_core::{ElementKind, FormatVersion, Layout};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, info};

/// Leading magic of every trace container
pub const MAGIC: [u8; 4] = *b"BSIG";

/// Options controlling how a trace is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenOptions {
    /// Element type assumed for every lane of a legacy-layout file
    pub legacy_element_kind: ElementKind,
    /// Keep full lanes in memory after the first read
    pub cache_lanes: bool,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            legacy_element_kind: ElementKind::U8,
            cache_lanes: false,
        }
    }
}

impl OpenOptions {
    /// Set the legacy element kind
    #[must_use]
    pub const fn with_legacy_element_kind(mut self, kind: ElementKind) -> Self {
        self.legacy_element_kind = kind;
        self
    }

    /// Enable or disable the lane cache
    #[must_use]
    pub const fn with_cache_lanes(mut self, enabled: bool) -> Self {
        self.cache_lanes = enabled;
        self
    }
}

#[derive(Debug, Clone, Copy)]
enum Container {
    Legacy(LegacyLayout),
    Block(BlockLayout),
}

/// An open trace container.
///
/// The catalog is parsed once at open; lane data is read lazily, one window
/// at a time, and handed out as owned buffers. Dropping the handle releases
/// the underlying reader.
#[derive(Debug)]
pub struct TraceFile<R = BufReader<File>> {
    reader: R,
    source: String,
    version: FormatVersion,
    container: Container,
    catalog: Catalog,
    options: OpenOptions,
    cache: HashMap<String, Lane>,
}

impl TraceFile<BufReader<File>> {
    /// Open a trace file with default options
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or is not a valid container
    pub fn open(path: impl AsRef<Path>) -> TraceResult<Self> {
        Self::open_with(path, OpenOptions::default())
    }

    /// Open a trace file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or is not a valid container
    pub fn open_with(path: impl AsRef<Path>, options: OpenOptions) -> TraceResult<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| TraceError::Io(format!("{}: {e}", path.display())))?;
        let mut trace = Self::from_reader(BufReader::new(file), options)?;
        trace.source = path.display().to_string();
        info!(
            path = %trace.source,
            version = %trace.version,
            signals = trace.catalog.len(),
            "opened trace"
        );
        Ok(trace)
    }
}

impl<R: Read + Seek> TraceFile<R> {
    /// Parse a container from any seekable reader
    ///
    /// # Errors
    ///
    /// Returns `Format` for a bad magic, version, signature or type code,
    /// `Truncated` when declared regions exceed the input, and `CorruptData`
    /// when a lane's storage cannot hold its declared samples.
    pub fn from_reader(mut reader: R, options: OpenOptions) -> TraceResult<Self> {
        let file_len = reader.seek(SeekFrom::End(0))?;
        if file_len < block::PREAMBLE_SIZE {
            return Err(TraceError::Truncated {
                section: "preamble".to_string(),
                needed: block::PREAMBLE_SIZE,
                actual: file_len,
            });
        }

        let mut preamble = [0u8; block::PREAMBLE_SIZE as usize];
        reader.seek(SeekFrom::Start(0))?;
        reader.read_exact(&mut preamble)?;
        if preamble[..4] != MAGIC {
            return Err(TraceError::format("missing BSIG magic"));
        }
        let version = FormatVersion::from_bytes([preamble[4], preamble[5], preamble[6]]);

        let (container, catalog) = match version.layout()? {
            Layout::Legacy => {
                let (layout, catalog) =
                    legacy::parse(&mut reader, file_len, options.legacy_element_kind)?;
                (Container::Legacy(layout), catalog)
            }
            Layout::Block { wide_offsets } => {
                let (layout, catalog) = block::parse(&mut reader, file_len, wide_offsets)?;
                (Container::Block(layout), catalog)
            }
        };
        debug!(%version, signals = catalog.len(), "catalog ready");

        Ok(Self {
            reader,
            source: String::from("<reader>"),
            version,
            container,
            catalog,
            options,
            cache: HashMap::new(),
        })
    }

    /// Lane catalog in on-disk order
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Container version
    #[must_use]
    pub const fn version(&self) -> FormatVersion {
        self.version
    }

    /// Active layout
    #[must_use]
    pub const fn layout(&self) -> Layout {
        match self.container {
            Container::Legacy(_) => Layout::Legacy,
            Container::Block(b) => Layout::Block {
                wide_offsets: b.wide_offsets,
            },
        }
    }

    /// Whether data blocks are zlib-compressed
    #[must_use]
    pub const fn is_compressed(&self) -> bool {
        matches!(self.container, Container::Block(b) if b.compressed)
    }

    /// Path or label the handle was opened from
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Look up a lane; an exact name wins over a case-insensitive match
    ///
    /// # Errors
    ///
    /// Returns `SignalNotFound` if no lane matches
    pub fn descriptor(&self, name: &str) -> TraceResult<&LaneDescriptor> {
        self.catalog
            .find(name)
            .ok_or_else(|| TraceError::SignalNotFound {
                name: name.to_string(),
            })
    }

    /// Sample count of a lane
    ///
    /// # Errors
    ///
    /// Returns `SignalNotFound` if no lane matches
    pub fn sample_count(&self, name: &str) -> TraceResult<usize> {
        self.descriptor(name).map(|d| d.sample_count)
    }

    /// Read `count` samples of a lane starting at `offset`.
    ///
    /// `count = None` reads to the end. Windows reaching past the last sample
    /// are clamped; an offset past the end yields an empty lane. Only blocks
    /// intersecting the window are read.
    ///
    /// # Errors
    ///
    /// Returns `SignalNotFound` for unknown names and `CorruptData` or
    /// `Truncated` when the stored bytes disagree with the catalog.
    pub fn materialize(&mut self, name: &str, offset: usize, count: Option<usize>) -> TraceResult<Lane> {
        let descriptor = self.descriptor(name)?.clone();

        if self.options.cache_lanes {
            if !self.cache.contains_key(&descriptor.name) {
                let full = self.read_window(&descriptor, 0, descriptor.sample_count)?;
                self.cache.insert(descriptor.name.clone(), full);
            }
            if let Some(lane) = self.cache.get(&descriptor.name) {
                return Ok(lane.window(offset, count));
            }
        }

        let total = descriptor.sample_count;
        let start = offset.min(total);
        let end = count.map_or(total, |c| start.saturating_add(c).min(total));
        self.read_window(&descriptor, start, end)
    }

    /// Read a whole lane
    ///
    /// # Errors
    ///
    /// See [`TraceFile::materialize`]
    pub fn materialize_all(&mut self, name: &str) -> TraceResult<Lane> {
        self.materialize(name, 0, None)
    }

    /// Read several whole lanes, failing on the first error
    ///
    /// # Errors
    ///
    /// See [`TraceFile::materialize`]
    pub fn materialize_many<'a, I>(&mut self, names: I) -> TraceResult<Vec<Lane>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        names
            .into_iter()
            .map(|name| self.materialize_all(name))
            .collect()
    }

    /// Drop any cached lanes
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Release the handle
    pub fn close(self) {
        debug!(path = %self.source, "closed trace");
    }

    fn read_window(&mut self, lane: &LaneDescriptor, start: usize, end: usize) -> TraceResult<Lane> {
        debug!(lane = %lane.name, start, end, "materializing");
        let values = match (&self.container, &lane.storage) {
            (Container::Block(layout), Storage::Blocks(_)) => block::read_elements(
                &mut self.reader,
                layout,
                lane,
                start * lane.width,
                end * lane.width,
            )?,
            (Container::Legacy(layout), Storage::Row { .. }) => {
                legacy::read_samples(&mut self.reader, layout, lane, start, end)?
            }
            _ => {
                return Err(TraceError::corrupt(
                    &lane.name,
                    "storage does not match the container layout",
                ));
            }
        };
        Lane::new(lane.name.clone(), lane.width, values)
    }
}
