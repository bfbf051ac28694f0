//! Little-endian element codec and zlib block compression.
//!
//! All multi-byte quantities in a trace container are little-endian.

use crate::error::{TraceError, TraceResult};
use crate::values::LaneValues;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use sigcmp_core::ElementKind;
use std::io::{Cursor, Read, Write};

/// Decode a packed little-endian buffer into typed elements.
///
/// Trailing bytes that do not form a whole element are ignored.
#[must_use]
pub fn decode_elements(kind: ElementKind, bytes: &[u8]) -> LaneValues {
    let count = bytes.len() / kind.size();
    let mut out = LaneValues::with_capacity(kind, count);
    append_elements(&mut out, bytes);
    out
}

/// Append decoded elements to an existing buffer of the matching kind
pub fn append_elements(out: &mut LaneValues, bytes: &[u8]) {
    let size = out.kind().size();
    let usable = bytes.len() - bytes.len() % size;
    let mut rdr = Cursor::new(&bytes[..usable]);

    // Reads from an in-memory cursor sized to whole elements cannot fail.
    macro_rules! drain {
        ($v:expr, $read:ident) => {
            while let Ok(x) = rdr.$read::<LittleEndian>() {
                $v.push(x);
            }
        };
    }

    match out {
        LaneValues::U8(v) => v.extend_from_slice(&bytes[..usable]),
        LaneValues::I8(v) => v.extend(bytes[..usable].iter().map(|b| *b as i8)),
        LaneValues::U16(v) => drain!(v, read_u16),
        LaneValues::I16(v) => drain!(v, read_i16),
        LaneValues::U32(v) => drain!(v, read_u32),
        LaneValues::I32(v) => drain!(v, read_i32),
        LaneValues::U64(v) => drain!(v, read_u64),
        LaneValues::I64(v) => drain!(v, read_i64),
        LaneValues::F32(v) => drain!(v, read_f32),
        LaneValues::F64(v) => drain!(v, read_f64),
    }
}

/// Encode typed elements as packed little-endian bytes
#[must_use]
pub fn encode_elements(values: &LaneValues) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * values.kind().size());
    // Writes into a Vec are infallible.
    let _ = write_elements(&mut out, values);
    out
}

fn write_elements<W: Write>(w: &mut W, values: &LaneValues) -> std::io::Result<()> {
    match values {
        LaneValues::U8(v) => w.write_all(v)?,
        LaneValues::I8(v) => v.iter().try_for_each(|x| w.write_i8(*x))?,
        LaneValues::U16(v) => v.iter().try_for_each(|x| w.write_u16::<LittleEndian>(*x))?,
        LaneValues::I16(v) => v.iter().try_for_each(|x| w.write_i16::<LittleEndian>(*x))?,
        LaneValues::U32(v) => v.iter().try_for_each(|x| w.write_u32::<LittleEndian>(*x))?,
        LaneValues::I32(v) => v.iter().try_for_each(|x| w.write_i32::<LittleEndian>(*x))?,
        LaneValues::U64(v) => v.iter().try_for_each(|x| w.write_u64::<LittleEndian>(*x))?,
        LaneValues::I64(v) => v.iter().try_for_each(|x| w.write_i64::<LittleEndian>(*x))?,
        LaneValues::F32(v) => v.iter().try_for_each(|x| w.write_f32::<LittleEndian>(*x))?,
        LaneValues::F64(v) => v.iter().try_for_each(|x| w.write_f64::<LittleEndian>(*x))?,
    }
    Ok(())
}

/// Inflate one zlib-compressed block for `lane`.
///
/// Output is capped one byte past `expected_len`, so an oversized stream is
/// rejected without being expanded in full.
///
/// # Errors
///
/// Returns `CorruptData` if the stream is not valid zlib or does not inflate
/// to exactly `expected_len` bytes
pub fn inflate(lane: &str, compressed: &[u8], expected_len: usize) -> TraceResult<Vec<u8>> {
    let mut out = Vec::with_capacity(expected_len);
    ZlibDecoder::new(compressed)
        .take(expected_len as u64 + 1)
        .read_to_end(&mut out)
        .map_err(|e| TraceError::corrupt(lane, format!("zlib inflate failed: {e}")))?;
    if out.len() != expected_len {
        let got = if out.len() > expected_len {
            format!("more than {expected_len}")
        } else {
            out.len().to_string()
        };
        return Err(TraceError::corrupt(
            lane,
            format!("block inflated to {got} bytes, expected {expected_len}"),
        ));
    }
    Ok(out)
}

/// Deflate one block with the default zlib level
///
/// # Errors
///
/// Returns error if the encoder fails
pub fn deflate(raw: &[u8]) -> TraceResult<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(raw.len() / 2), Compression::default());
    encoder.write_all(raw)?;
    Ok(encoder.finish()?)
}

/// Bounded little-endian reader over an in-memory section.
///
/// Every read reports which section overflowed so malformed headers surface
/// as format errors instead of panics.
pub struct SectionReader<'a> {
    section: &'static str,
    inner: Cursor<&'a [u8]>,
}

impl<'a> SectionReader<'a> {
    /// Wrap a section buffer
    #[must_use]
    pub fn new(section: &'static str, bytes: &'a [u8]) -> Self {
        Self {
            section,
            inner: Cursor::new(bytes),
        }
    }

    fn overrun(&self, what: &str) -> TraceError {
        TraceError::format(format!(
            "{} section ends while reading {} at byte {}",
            self.section,
            what,
            self.inner.position()
        ))
    }

    /// Read a u16
    pub fn u16(&mut self, what: &str) -> TraceResult<u16> {
        self.inner
            .read_u16::<LittleEndian>()
            .map_err(|_| self.overrun(what))
    }

    /// Read a u32
    pub fn u32(&mut self, what: &str) -> TraceResult<u32> {
        self.inner
            .read_u32::<LittleEndian>()
            .map_err(|_| self.overrun(what))
    }

    /// Read a u64
    pub fn u64(&mut self, what: &str) -> TraceResult<u64> {
        self.inner
            .read_u64::<LittleEndian>()
            .map_err(|_| self.overrun(what))
    }

    /// Read a u32 or u64 offset depending on the layout
    pub fn offset(&mut self, wide: bool) -> TraceResult<u64> {
        if wide {
            self.u64("block offset")
        } else {
            self.u32("block offset").map(u64::from)
        }
    }

    /// Read `len` bytes as a UTF-8 name
    pub fn name(&mut self, len: usize) -> TraceResult<String> {
        let mut buf = vec![0u8; len];
        self.inner
            .read_exact(&mut buf)
            .map_err(|_| self.overrun("signal name"))?;
        String::from_utf8(buf)
            .map_err(|e| TraceError::format(format!("signal name is not UTF-8: {e}")))
    }

    /// Bytes left in the section
    #[must_use]
    pub fn remaining(&self) -> usize {
        let len = self.inner.get_ref().len() as u64;
        len.saturating_sub(self.inner.position()) as usize
    }
}
