//! Block layout (format versions 2 and 3).
//!
//! ```text
//! +--------+----------------+-------------+--------------+---------+
//! | BSIG + | data blocks    | index table | header table | trailer |
//! | ver[3] | (per lane)     |             |              | 24 B    |
//! +--------+----------------+-------------+--------------+---------+
//! ```
//!
//! Each lane's elements are flattened and packed into fixed-size blocks.
//! Compressed blocks are stored as a u32 length followed by a zlib stream.

use crate::catalog::{Catalog, LaneDescriptor, Storage};
use crate::codec::{SectionReader, append_elements, inflate};
use crate::error::{TraceError, TraceResult};
use crate::values::LaneValues;
use byteorder::{LittleEndian, ReadBytesExt};
use sigcmp_core::ElementKind;
use std::io::{Read, Seek, SeekFrom};
use tracing::{debug, trace};

/// Size of the fixed trailer at the end of a block-layout file
pub const TRAILER_SIZE: u64 = 24;

/// Trailer signature
pub const TRAILER_SIGNATURE: [u8; 4] = *b"BIN\0";

/// Bytes taken by the leading magic and version
pub const PREAMBLE_SIZE: u64 = 7;

/// Parsed trailer fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trailer {
    /// Number of lanes declared
    pub signal_count: u32,
    /// Bytes per data block
    pub block_size: u32,
    /// Size of the header table
    pub header_size: u32,
    /// Size of the index table
    pub index_table_size: u32,
    /// Whether blocks are zlib-compressed
    pub compressed: bool,
}

impl Trailer {
    /// Decode the trailer bytes
    ///
    /// # Errors
    ///
    /// Returns error if the signature is wrong
    pub fn parse(bytes: &[u8; TRAILER_SIZE as usize]) -> TraceResult<Self> {
        if bytes[20..24] != TRAILER_SIGNATURE {
            return Err(TraceError::format("trailer signature is not BIN\\0"));
        }
        let mut rdr = SectionReader::new("trailer", &bytes[..16]);
        let signal_count = rdr.u32("signal count")?;
        let block_size = rdr.u32("block size")?;
        let header_size = rdr.u32("header size")?;
        let index_table_size = rdr.u32("index table size")?;
        // bytes 16..19 carry an internal version that readers ignore
        let compressed = bytes[19] != 0;
        Ok(Self {
            signal_count,
            block_size,
            header_size,
            index_table_size,
            compressed,
        })
    }
}

/// Geometry shared by all lanes of a block-layout file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLayout {
    /// Bytes per uncompressed block
    pub block_size: u32,
    /// Whether blocks are zlib-compressed
    pub compressed: bool,
    /// Whether offsets are u64 (v3) instead of u32 (v2)
    pub wide_offsets: bool,
    /// First byte past the data region (start of the index table)
    pub data_end: u64,
}

impl BlockLayout {
    /// Elements of `kind` held by one block
    #[must_use]
    pub fn per_block(&self, kind: ElementKind) -> usize {
        self.block_size as usize / kind.size()
    }

    /// Blocks needed to store `elements` elements of `kind`
    #[must_use]
    pub fn blocks_needed(&self, kind: ElementKind, elements: usize) -> usize {
        elements.div_ceil(self.per_block(kind).max(1))
    }
}

fn read_region<R: Read + Seek>(reader: &mut R, start: u64, len: u64) -> TraceResult<Vec<u8>> {
    let mut buf = vec![0u8; len as usize];
    reader.seek(SeekFrom::Start(start))?;
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

/// Parse trailer, header table and index table into a catalog
///
/// # Errors
///
/// Returns `Format` for bad signatures or type codes, `Truncated` when a
/// declared region or block lies outside the file, and `CorruptData` when
/// a lane has fewer blocks than its sample count requires.
pub fn parse<R: Read + Seek>(
    reader: &mut R,
    file_len: u64,
    wide_offsets: bool,
) -> TraceResult<(BlockLayout, Catalog)> {
    let truncated = |section: &str, needed: u64| TraceError::Truncated {
        section: section.to_string(),
        needed,
        actual: file_len,
    };

    if file_len < PREAMBLE_SIZE + TRAILER_SIZE {
        return Err(truncated("trailer", PREAMBLE_SIZE + TRAILER_SIZE));
    }

    let mut raw = [0u8; TRAILER_SIZE as usize];
    reader.seek(SeekFrom::Start(file_len - TRAILER_SIZE))?;
    reader.read_exact(&mut raw)?;
    let trailer = Trailer::parse(&raw)?;

    if trailer.block_size == 0 {
        return Err(TraceError::format("block size is zero"));
    }

    let tables = u64::from(trailer.header_size) + u64::from(trailer.index_table_size);
    let header_start = (file_len - TRAILER_SIZE)
        .checked_sub(u64::from(trailer.header_size))
        .filter(|s| *s >= PREAMBLE_SIZE)
        .ok_or_else(|| truncated("header table", PREAMBLE_SIZE + TRAILER_SIZE + tables))?;
    let index_start = header_start
        .checked_sub(u64::from(trailer.index_table_size))
        .filter(|s| *s >= PREAMBLE_SIZE)
        .ok_or_else(|| truncated("index table", PREAMBLE_SIZE + TRAILER_SIZE + tables))?;

    let layout = BlockLayout {
        block_size: trailer.block_size,
        compressed: trailer.compressed,
        wide_offsets,
        data_end: index_start,
    };
    debug!(
        signals = trailer.signal_count,
        block_size = trailer.block_size,
        compressed = trailer.compressed,
        "parsed trailer"
    );

    let header = read_region(reader, header_start, u64::from(trailer.header_size))?;
    let index = read_region(reader, index_start, u64::from(trailer.index_table_size))?;
    let mut hdr = SectionReader::new("header", &header);
    let mut idx = SectionReader::new("index", &index);

    let mut catalog = Catalog::new();
    for _ in 0..trailer.signal_count {
        let name_len = hdr.u16("name length")?;
        let name = hdr.name(usize::from(name_len))?;
        let width = hdr.u32("array width")? as usize;
        let kind = ElementKind::from_code(hdr.u32("type code")?)?;

        let offset_count = idx.u32("offset count")? as usize;
        let sample_count = idx.u32("sample count")? as usize;
        if offset_count > idx.remaining() {
            return Err(TraceError::format(format!(
                "lane '{name}' declares {offset_count} offsets beyond the index table"
            )));
        }
        let offsets = (0..offset_count)
            .map(|_| idx.offset(wide_offsets))
            .collect::<TraceResult<Vec<_>>>()?;

        let descriptor = LaneDescriptor {
            name,
            kind,
            width,
            sample_count,
            storage: Storage::Blocks(offsets),
        };
        validate_lane(&layout, &descriptor, file_len)?;
        trace!(lane = %descriptor.name, %kind, width, sample_count, "catalogued lane");
        catalog.insert(descriptor);
    }

    Ok((layout, catalog))
}

fn validate_lane(layout: &BlockLayout, lane: &LaneDescriptor, file_len: u64) -> TraceResult<()> {
    if lane.width == 0 {
        return Err(TraceError::corrupt(&lane.name, "array width is zero"));
    }
    if (layout.block_size as usize) < lane.kind.size() {
        return Err(TraceError::format(format!(
            "block size {} is smaller than a {} element",
            layout.block_size, lane.kind
        )));
    }

    let Storage::Blocks(offsets) = &lane.storage else {
        return Ok(());
    };

    let needed = layout.blocks_needed(lane.kind, lane.element_count());
    if offsets.len() < needed {
        return Err(TraceError::corrupt(
            &lane.name,
            format!(
                "{} samples need {} blocks, index lists {}",
                lane.sample_count,
                needed,
                offsets.len()
            ),
        ));
    }

    let min_len = if layout.compressed {
        4
    } else {
        u64::from(layout.block_size)
    };
    for &offset in &offsets[..needed] {
        let end = offset.saturating_add(min_len);
        if offset < PREAMBLE_SIZE || end > layout.data_end {
            return Err(TraceError::Truncated {
                section: format!("data block of lane '{}'", lane.name),
                needed: end,
                actual: file_len.min(layout.data_end),
            });
        }
    }
    Ok(())
}

/// Read elements `[start, end)` of a block-stored lane
///
/// # Errors
///
/// Returns `CorruptData` when a block inflates to the wrong size and
/// `Truncated` when a compressed block runs past the data region.
pub fn read_elements<R: Read + Seek>(
    reader: &mut R,
    layout: &BlockLayout,
    lane: &LaneDescriptor,
    start: usize,
    end: usize,
) -> TraceResult<LaneValues> {
    let mut out = LaneValues::with_capacity(lane.kind, end.saturating_sub(start));
    if start >= end {
        return Ok(out);
    }
    let Storage::Blocks(offsets) = &lane.storage else {
        return Err(TraceError::corrupt(&lane.name, "lane is not block-stored"));
    };

    let elem = lane.kind.size();
    let per_block = layout.per_block(lane.kind);
    let total = lane.element_count();
    let first = start / per_block;
    let last = end.div_ceil(per_block);

    for (b, &offset) in offsets.iter().enumerate().take(last).skip(first) {
        let block_start = b * per_block;
        let held = per_block.min(total - block_start);
        let bytes = read_block(reader, layout, lane, offset, held * elem)?;

        let lo = start.max(block_start) - block_start;
        let hi = end.min(block_start + held) - block_start;
        append_elements(&mut out, &bytes[lo * elem..hi * elem]);
    }
    Ok(out)
}

fn read_block<R: Read + Seek>(
    reader: &mut R,
    layout: &BlockLayout,
    lane: &LaneDescriptor,
    offset: u64,
    expected_len: usize,
) -> TraceResult<Vec<u8>> {
    reader.seek(SeekFrom::Start(offset))?;
    if layout.compressed {
        let packed_len = u64::from(reader.read_u32::<LittleEndian>()?);
        let end = offset.saturating_add(4 + packed_len);
        if end > layout.data_end {
            return Err(TraceError::Truncated {
                section: format!("compressed block of lane '{}'", lane.name),
                needed: end,
                actual: layout.data_end,
            });
        }
        let mut packed = vec![0u8; packed_len as usize];
        reader.read_exact(&mut packed)?;
        inflate(&lane.name, &packed, expected_len)
    } else {
        let end = offset.saturating_add(u64::from(layout.block_size));
        if end > layout.data_end {
            return Err(TraceError::Truncated {
                section: format!("block of lane '{}'", lane.name),
                needed: end,
                actual: layout.data_end,
            });
        }
        let mut raw = vec![0u8; layout.block_size as usize];
        reader.read_exact(&mut raw)?;
        raw.truncate(expected_len);
        Ok(raw)
    }
}
