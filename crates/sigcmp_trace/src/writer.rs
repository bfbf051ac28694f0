//! Reference encoder.
//!
//! Produces containers the decoder reads back bit-for-bit. Used to build
//! fixtures and to convert recordings between layouts.

use crate::block::{TRAILER_SIGNATURE, TRAILER_SIZE};
use crate::codec::{deflate, encode_elements};
use crate::error::{TraceError, TraceResult};
use crate::file::MAGIC;
use crate::values::Lane;
use byteorder::{LittleEndian, WriteBytesExt};
use serde::{Deserialize, Serialize};
use sigcmp_core::{FormatVersion, Layout};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Smallest block size the encoder accepts
pub const MIN_BLOCK_SIZE: u32 = 256;
/// Largest block size the encoder accepts
pub const MAX_BLOCK_SIZE: u32 = 65536;
/// Block size used when none is configured
pub const DEFAULT_BLOCK_SIZE: u32 = 4096;

/// Encoder configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterOptions {
    /// Container version; selects the layout
    pub version: FormatVersion,
    /// Bytes per data block (block layout only)
    pub block_size: u32,
    /// Zlib-compress each block (block layout only)
    pub compressed: bool,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            version: FormatVersion::BLOCK_V3,
            block_size: DEFAULT_BLOCK_SIZE,
            compressed: false,
        }
    }
}

impl WriterOptions {
    /// Set the container version
    #[must_use]
    pub const fn with_version(mut self, version: FormatVersion) -> Self {
        self.version = version;
        self
    }

    /// Set the block size
    #[must_use]
    pub const fn with_block_size(mut self, block_size: u32) -> Self {
        self.block_size = block_size;
        self
    }

    /// Enable or disable block compression
    #[must_use]
    pub const fn with_compression(mut self, compressed: bool) -> Self {
        self.compressed = compressed;
        self
    }

    fn validate(&self) -> TraceResult<Layout> {
        let layout = self.version.layout()?;
        if matches!(layout, Layout::Block { .. })
            && (!self.block_size.is_power_of_two()
                || !(MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&self.block_size))
        {
            return Err(TraceError::format(format!(
                "block size {} must be a power of two between {MIN_BLOCK_SIZE} and {MAX_BLOCK_SIZE}",
                self.block_size
            )));
        }
        Ok(layout)
    }
}

/// Collects lanes and serializes them into a container
#[derive(Debug, Clone, Default)]
pub struct TraceWriter {
    options: WriterOptions,
    lanes: Vec<Lane>,
}

impl TraceWriter {
    /// Create an empty writer
    #[must_use]
    pub fn new(options: WriterOptions) -> Self {
        Self {
            options,
            lanes: Vec::new(),
        }
    }

    /// Append a lane
    ///
    /// # Errors
    ///
    /// Returns error if a lane with the same name was already added
    pub fn add(&mut self, lane: Lane) -> TraceResult<()> {
        if self.lanes.iter().any(|l| l.name == lane.name) {
            return Err(TraceError::format(format!("duplicate lane '{}'", lane.name)));
        }
        self.lanes.push(lane);
        Ok(())
    }

    /// Lanes added so far
    #[must_use]
    pub fn lanes(&self) -> &[Lane] {
        &self.lanes
    }

    /// Serialize into memory
    ///
    /// # Errors
    ///
    /// Returns error if the options are invalid or the lanes cannot be
    /// represented in the chosen layout
    pub fn to_bytes(&self) -> TraceResult<Vec<u8>> {
        let mut out = Vec::new();
        self.write_to(&mut out)?;
        Ok(out)
    }

    /// Serialize to a file
    ///
    /// # Errors
    ///
    /// See [`TraceWriter::to_bytes`]
    pub fn write_file(&self, path: impl AsRef<Path>) -> TraceResult<()> {
        let mut w = BufWriter::new(File::create(path)?);
        self.write_to(&mut w)?;
        w.flush()?;
        Ok(())
    }

    /// Serialize into a writer
    ///
    /// # Errors
    ///
    /// See [`TraceWriter::to_bytes`]
    pub fn write_to<W: Write>(&self, w: &mut W) -> TraceResult<()> {
        let bytes = match self.options.validate()? {
            Layout::Legacy => self.encode_legacy()?,
            Layout::Block { wide_offsets } => self.encode_blocks(wide_offsets)?,
        };
        debug!(
            lanes = self.lanes.len(),
            bytes = bytes.len(),
            version = %self.options.version,
            "encoded trace"
        );
        w.write_all(&bytes)?;
        Ok(())
    }

    fn preamble(&self) -> Vec<u8> {
        let mut out = MAGIC.to_vec();
        out.extend_from_slice(&self.options.version.as_bytes());
        out
    }

    fn encode_legacy(&self) -> TraceResult<Vec<u8>> {
        let rows = self.lanes.first().map_or(0, Lane::sample_count);
        if let Some(first) = self.lanes.first() {
            for lane in &self.lanes {
                if lane.kind() != first.kind() || lane.sample_count() != rows {
                    return Err(TraceError::format(format!(
                        "legacy layout needs one element kind and sample count; '{}' differs from '{}'",
                        lane.name, first.name
                    )));
                }
            }
        }

        let mut out = self.preamble();
        out.write_u64::<LittleEndian>(self.lanes.len() as u64)?;
        let mut columns = Vec::with_capacity(self.lanes.len());
        for lane in &self.lanes {
            let sample_size = lane.width * lane.kind().size();
            out.write_u32::<LittleEndian>(field(lane.name.len(), "lane name length")?)?;
            out.extend_from_slice(lane.name.as_bytes());
            out.write_u32::<LittleEndian>(field(sample_size, "sample size")?)?;
            columns.push((encode_elements(&lane.values), sample_size));
        }
        for row in 0..rows {
            for (bytes, size) in &columns {
                out.extend_from_slice(&bytes[row * size..(row + 1) * size]);
            }
        }
        Ok(out)
    }

    fn encode_blocks(&self, wide_offsets: bool) -> TraceResult<Vec<u8>> {
        let block_size = self.options.block_size as usize;
        let mut out = self.preamble();
        let mut offsets = Vec::with_capacity(self.lanes.len());

        for lane in &self.lanes {
            let elem = lane.kind().size();
            let chunk = (block_size / elem) * elem;
            let raw = encode_elements(&lane.values);
            let mut lane_offsets = Vec::new();
            for part in raw.chunks(chunk) {
                lane_offsets.push(out.len() as u64);
                if self.options.compressed {
                    let packed = deflate(part)?;
                    out.write_u32::<LittleEndian>(field(packed.len(), "compressed block length")?)?;
                    out.extend_from_slice(&packed);
                } else {
                    out.extend_from_slice(part);
                    out.resize(out.len() + block_size - part.len(), 0);
                }
            }
            offsets.push(lane_offsets);
        }

        let mut index = Vec::new();
        for (lane, lane_offsets) in self.lanes.iter().zip(&offsets) {
            index.write_u32::<LittleEndian>(field(lane_offsets.len(), "block count")?)?;
            index.write_u32::<LittleEndian>(field(lane.sample_count(), "sample count")?)?;
            for &offset in lane_offsets {
                if wide_offsets {
                    index.write_u64::<LittleEndian>(offset)?;
                } else {
                    let narrow = u32::try_from(offset).map_err(|_| {
                        TraceError::format(format!(
                            "offset {offset} does not fit a version {} container",
                            self.options.version
                        ))
                    })?;
                    index.write_u32::<LittleEndian>(narrow)?;
                }
            }
        }

        let mut header = Vec::new();
        for lane in &self.lanes {
            let name_len = u16::try_from(lane.name.len())
                .map_err(|_| TraceError::format(format!("lane name '{}' is too long", lane.name)))?;
            header.write_u16::<LittleEndian>(name_len)?;
            header.extend_from_slice(lane.name.as_bytes());
            header.write_u32::<LittleEndian>(field(lane.width, "array width")?)?;
            header.write_u32::<LittleEndian>(lane.kind().code())?;
        }

        out.extend_from_slice(&index);
        out.extend_from_slice(&header);

        let mut trailer = Vec::with_capacity(TRAILER_SIZE as usize);
        trailer.write_u32::<LittleEndian>(field(self.lanes.len(), "lane count")?)?;
        trailer.write_u32::<LittleEndian>(self.options.block_size)?;
        trailer.write_u32::<LittleEndian>(field(header.len(), "header table size")?)?;
        trailer.write_u32::<LittleEndian>(field(index.len(), "index table size")?)?;
        trailer.extend_from_slice(&[0, 0, 0]);
        trailer.push(u8::from(self.options.compressed));
        trailer.extend_from_slice(&TRAILER_SIGNATURE);
        out.extend_from_slice(&trailer);
        Ok(out)
    }
}

/// Narrow a length to a u32 header field
fn field(value: usize, what: &str) -> TraceResult<u32> {
    u32::try_from(value)
        .map_err(|_| TraceError::format(format!("{what} {value} does not fit a 32 bit field")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_elements;
    use crate::error::TraceError;
    use crate::file::{OpenOptions, TraceFile};
    use crate::values::LaneValues;
    use proptest::prelude::*;
    use sigcmp_core::ElementKind;
    use std::io::Cursor;

    fn open(bytes: Vec<u8>) -> TraceFile<Cursor<Vec<u8>>> {
        TraceFile::from_reader(Cursor::new(bytes), OpenOptions::default()).unwrap()
    }

    fn lane_of(kind: ElementKind, width: usize, raw: &[u8]) -> Lane {
        let elem = kind.size();
        let whole = raw.len() / (elem * width) * elem * width;
        let values = crate::codec::decode_elements(kind, &raw[..whole]);
        Lane::new(format!("Algo.Test.{kind}"), width, values).unwrap()
    }

    #[test]
    fn test_block_size_validation() {
        let lane = Lane::scalar("A.b", vec![1u8]).unwrap();
        for bad in [0, 100, 128, 131072] {
            let mut writer = TraceWriter::new(WriterOptions::default().with_block_size(bad));
            writer.add(lane.clone()).unwrap();
            assert!(writer.to_bytes().is_err(), "block size {bad} accepted");
        }
    }

    #[test]
    fn test_duplicate_lane_rejected() {
        let mut writer = TraceWriter::default();
        writer.add(Lane::scalar("A.b", vec![1u8]).unwrap()).unwrap();
        assert!(writer.add(Lane::scalar("A.b", vec![2u8]).unwrap()).is_err());
        assert_eq!(writer.lanes().len(), 1);
    }

    #[test]
    fn test_empty_lane_roundtrip() {
        let mut writer = TraceWriter::default();
        writer.add(Lane::new("A.empty", 4, Vec::<f64>::new()).unwrap()).unwrap();
        let mut trace = open(writer.to_bytes().unwrap());
        let lane = trace.materialize_all("A.empty").unwrap();
        assert_eq!(lane.sample_count(), 0);
        assert_eq!(lane.width, 4);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_width_overflowing_header_field() {
        let wide = u32::MAX as usize + 1;
        for version in [FormatVersion::BLOCK_V3, FormatVersion::LEGACY] {
            let mut writer = TraceWriter::new(WriterOptions::default().with_version(version));
            writer.add(Lane::new("A.wide", wide, Vec::<u8>::new()).unwrap()).unwrap();
            let err = writer.to_bytes().unwrap_err();
            assert!(matches!(err, TraceError::Format { .. }), "{version}: {err}");
        }
        assert!(field(wide, "lane count").is_err());
        assert_eq!(field(7, "lane count").unwrap(), 7);
    }

    #[test]
    fn test_v2_narrow_offsets() {
        let mut writer = TraceWriter::new(
            WriterOptions::default()
                .with_version(FormatVersion::BLOCK_V2)
                .with_block_size(256),
        );
        let values: Vec<u32> = (0..1000).collect();
        writer.add(Lane::scalar("A.counter", values.clone()).unwrap()).unwrap();
        let mut trace = open(writer.to_bytes().unwrap());
        assert_eq!(trace.layout(), Layout::Block { wide_offsets: false });
        assert_eq!(trace.materialize_all("A.counter").unwrap().values, LaneValues::U32(values));
    }

    #[test]
    fn test_legacy_roundtrip() {
        let mut writer = TraceWriter::new(WriterOptions::default().with_version(FormatVersion::LEGACY));
        writer.add(Lane::scalar("MTS.Package.TimeStamp", vec![0i32, 40, 80]).unwrap()).unwrap();
        writer.add(Lane::new("Algo.CAM.Box", 2, vec![1i32, 2, 3, 4, 5, 6]).unwrap()).unwrap();
        let bytes = writer.to_bytes().unwrap();

        let options = OpenOptions::default().with_legacy_element_kind(ElementKind::I32);
        let mut trace = TraceFile::from_reader(Cursor::new(bytes), options).unwrap();
        assert_eq!(trace.layout(), Layout::Legacy);
        assert_eq!(trace.sample_count("Algo.CAM.Box").unwrap(), 3);
        let window = trace.materialize("Algo.CAM.Box", 1, Some(1)).unwrap();
        assert_eq!(window.values, LaneValues::I32(vec![3, 4]));
    }

    #[test]
    fn test_legacy_rejects_mixed_kinds() {
        let mut writer = TraceWriter::new(WriterOptions::default().with_version(FormatVersion::LEGACY));
        writer.add(Lane::scalar("A.a", vec![0i32]).unwrap()).unwrap();
        writer.add(Lane::scalar("A.b", vec![0u8]).unwrap()).unwrap();
        assert!(writer.to_bytes().is_err());
    }

    #[test]
    fn test_truncated_file_detected() {
        let mut writer = TraceWriter::new(WriterOptions::default().with_block_size(256));
        writer.add(Lane::scalar("A.x", (0..500u16).collect::<Vec<_>>()).unwrap()).unwrap();
        let bytes = writer.to_bytes().unwrap();

        // keep the trailer but drop the front of the data region
        let mut cut = bytes[..7].to_vec();
        cut.extend_from_slice(&bytes[7 + 512..]);
        let err = TraceFile::from_reader(Cursor::new(cut), OpenOptions::default()).unwrap_err();
        assert!(matches!(err, TraceError::Truncated { .. }));
    }

    #[test]
    fn test_oversized_header_detected() {
        let mut writer = TraceWriter::default();
        writer.add(Lane::scalar("A.x", vec![1u8]).unwrap()).unwrap();
        let mut bytes = writer.to_bytes().unwrap();
        let at = bytes.len() - 16;
        bytes[at..at + 4].copy_from_slice(&u32::MAX.to_le_bytes());
        let err = TraceFile::from_reader(Cursor::new(bytes), OpenOptions::default()).unwrap_err();
        assert!(matches!(err, TraceError::Truncated { .. }));
    }

    #[test]
    fn test_corrupt_block_detected() {
        let mut writer = TraceWriter::new(WriterOptions::default().with_compression(true));
        writer.add(Lane::scalar("A.x", vec![7u64; 64]).unwrap()).unwrap();
        let mut bytes = writer.to_bytes().unwrap();
        // garble the zlib stream of the only block
        for b in &mut bytes[11..15] {
            *b ^= 0xA5;
        }
        let mut trace = open(bytes);
        let err = trace.materialize_all("A.x").unwrap_err();
        assert!(matches!(err, TraceError::CorruptData { .. }));
    }

    #[test]
    fn test_sample_count_exceeds_blocks() {
        let mut writer = TraceWriter::new(WriterOptions::default().with_block_size(256));
        writer.add(Lane::scalar("A.x", vec![1u8; 256]).unwrap()).unwrap();
        let mut bytes = writer.to_bytes().unwrap();
        // index table starts right after the single 256-byte block
        let sample_count_at = 7 + 256 + 4;
        bytes[sample_count_at..sample_count_at + 4].copy_from_slice(&1000u32.to_le_bytes());
        let err = TraceFile::from_reader(Cursor::new(bytes), OpenOptions::default()).unwrap_err();
        assert!(matches!(err, TraceError::CorruptData { .. }));
    }

    #[test]
    fn test_compressed_block_wrong_length() {
        let mut writer = TraceWriter::new(WriterOptions::default().with_compression(true));
        writer.add(Lane::scalar("A.x", vec![1u8; 10]).unwrap()).unwrap();
        let mut bytes = writer.to_bytes().unwrap();
        // claim 8 samples although the block inflates to 10 bytes
        let len = bytes.len();
        let index_len = u32::from_le_bytes(bytes[len - 12..len - 8].try_into().unwrap()) as usize;
        let header_len = u32::from_le_bytes(bytes[len - 16..len - 12].try_into().unwrap()) as usize;
        let index_start = len - 24 - header_len - index_len;
        bytes[index_start + 4..index_start + 8].copy_from_slice(&8u32.to_le_bytes());
        let mut trace = open(bytes);
        let err = trace.materialize_all("A.x").unwrap_err();
        assert!(matches!(err, TraceError::CorruptData { .. }));
    }

    fn arb_options() -> impl Strategy<Value = WriterOptions> {
        (
            prop::sample::select(vec![FormatVersion::BLOCK_V2, FormatVersion::BLOCK_V3]),
            prop::sample::select(vec![256u32, 512, 4096]),
            any::<bool>(),
        )
            .prop_map(|(version, block_size, compressed)| {
                WriterOptions::default()
                    .with_version(version)
                    .with_block_size(block_size)
                    .with_compression(compressed)
            })
    }

    proptest! {
        #[test]
        fn prop_roundtrip_every_kind(
            raw in prop::collection::vec(any::<u8>(), 0..3000),
            width in 1usize..5,
            options in arb_options(),
        ) {
            let mut writer = TraceWriter::new(options);
            for kind in ElementKind::ALL {
                writer.add(lane_of(kind, width, &raw)).unwrap();
            }
            let mut trace = open(writer.to_bytes().unwrap());
            prop_assert_eq!(trace.catalog().len(), ElementKind::ALL.len());

            for written in writer.lanes() {
                let decoded = trace.materialize_all(&written.name).unwrap();
                prop_assert_eq!(decoded.kind(), written.kind());
                prop_assert_eq!(decoded.width, written.width);
                prop_assert_eq!(decoded.sample_count(), written.sample_count());
                // compare bytes so NaN payloads count as equal
                prop_assert_eq!(encode_elements(&decoded.values), encode_elements(&written.values));
            }
        }

        #[test]
        fn prop_materialize_idempotent(
            raw in prop::collection::vec(any::<u8>(), 0..2000),
            options in arb_options(),
        ) {
            let mut writer = TraceWriter::new(options);
            writer.add(lane_of(ElementKind::F32, 2, &raw)).unwrap();
            let mut trace = open(writer.to_bytes().unwrap());
            let name = writer.lanes()[0].name.clone();
            let first = encode_elements(&trace.materialize_all(&name).unwrap().values);
            let second = encode_elements(&trace.materialize_all(&name).unwrap().values);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_partial_read_matches_full(
            raw in prop::collection::vec(any::<u8>(), 0..4000),
            width in 1usize..4,
            offset in 0usize..400,
            count in 0usize..400,
            options in arb_options(),
        ) {
            let mut writer = TraceWriter::new(options);
            writer.add(lane_of(ElementKind::I16, width, &raw)).unwrap();
            let mut trace = open(writer.to_bytes().unwrap());
            let name = writer.lanes()[0].name.clone();

            let full = trace.materialize_all(&name).unwrap();
            let window = trace.materialize(&name, offset, Some(count)).unwrap();
            prop_assert_eq!(window, full.window(offset, Some(count)));
        }
    }
}
