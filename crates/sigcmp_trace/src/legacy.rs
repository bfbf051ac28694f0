//! Legacy row-interleaved layout (format version 1).
//!
//! After the preamble comes a u64 lane count, then per lane a u32-prefixed
//! name and a u32 byte size. Data follows as fixed-size rows, each row
//! holding one sample of every lane in declaration order. The element type
//! is not recorded and is supplied by the caller.

use crate::catalog::{Catalog, LaneDescriptor, Storage};
use crate::codec::decode_elements;
use crate::error::{TraceError, TraceResult};
use crate::values::LaneValues;
use byteorder::{LittleEndian, ReadBytesExt};
use sigcmp_core::ElementKind;
use std::io::{self, Read, Seek, SeekFrom};
use tracing::{debug, warn};

/// Rows fetched per read when extracting a column
const ROWS_PER_CHUNK: usize = 4096;

/// Row geometry of a legacy file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegacyLayout {
    /// Offset of the first data row
    pub header_size: u64,
    /// Bytes per row
    pub row_size: u64,
    /// Number of complete rows
    pub rows: u64,
}

fn eof_as_truncated(err: io::Error, file_len: u64, needed: u64) -> TraceError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        TraceError::Truncated {
            section: "legacy header".to_string(),
            needed,
            actual: file_len,
        }
    } else {
        err.into()
    }
}

/// Parse the legacy header into a catalog
///
/// # Errors
///
/// Returns `Truncated` if the header runs past the file and `Format` when a
/// lane's byte size is not a whole number of `kind` elements.
pub fn parse<R: Read + Seek>(
    reader: &mut R,
    file_len: u64,
    kind: ElementKind,
) -> TraceResult<(LegacyLayout, Catalog)> {
    let mut pos = reader.seek(SeekFrom::Start(super::block::PREAMBLE_SIZE))?;

    let signal_count = reader
        .read_u64::<LittleEndian>()
        .map_err(|e| eof_as_truncated(e, file_len, pos + 8))?;
    pos += 8;

    let mut declared = Vec::new();
    for _ in 0..signal_count {
        let name_len = u64::from(
            reader
                .read_u32::<LittleEndian>()
                .map_err(|e| eof_as_truncated(e, file_len, pos + 4))?,
        );
        pos += 4;
        if pos + name_len > file_len {
            return Err(eof_as_truncated(
                io::ErrorKind::UnexpectedEof.into(),
                file_len,
                pos + name_len,
            ));
        }
        let mut name = vec![0u8; name_len as usize];
        reader.read_exact(&mut name)?;
        pos += name_len;
        let name = String::from_utf8(name)
            .map_err(|e| TraceError::format(format!("signal name is not UTF-8: {e}")))?;

        let byte_size = reader
            .read_u32::<LittleEndian>()
            .map_err(|e| eof_as_truncated(e, file_len, pos + 4))?;
        pos += 4;
        declared.push((name, u64::from(byte_size)));
    }

    let header_size = pos;
    let row_size: u64 = declared.iter().map(|(_, size)| size).sum();
    let data_len = file_len - header_size;
    let rows = if row_size == 0 { 0 } else { data_len / row_size };
    if row_size > 0 && data_len % row_size != 0 {
        warn!(
            trailing = data_len % row_size,
            row_size, "legacy trace ends with a partial row, ignoring it"
        );
    }

    let mut catalog = Catalog::new();
    let mut column_offset = 0u64;
    for (name, byte_size) in declared {
        let elem = kind.size() as u64;
        if byte_size == 0 || byte_size % elem != 0 {
            return Err(TraceError::format(format!(
                "lane '{name}' has byte size {byte_size}, not a multiple of {kind} ({elem} bytes)"
            )));
        }
        catalog.insert(LaneDescriptor {
            name,
            kind,
            width: (byte_size / elem) as usize,
            sample_count: rows as usize,
            storage: Storage::Row { column_offset },
        });
        column_offset += byte_size;
    }

    debug!(signals = catalog.len(), row_size, rows, "parsed legacy header");
    Ok((
        LegacyLayout {
            header_size,
            row_size,
            rows,
        },
        catalog,
    ))
}

/// Read samples `[start, end)` of a row-stored lane
///
/// # Errors
///
/// Returns error if the rows cannot be read
pub fn read_samples<R: Read + Seek>(
    reader: &mut R,
    layout: &LegacyLayout,
    lane: &LaneDescriptor,
    start: usize,
    end: usize,
) -> TraceResult<LaneValues> {
    let Storage::Row { column_offset } = lane.storage else {
        return Err(TraceError::corrupt(&lane.name, "lane is not row-stored"));
    };
    if start >= end {
        return Ok(LaneValues::empty(lane.kind));
    }

    let row_size = layout.row_size as usize;
    let column = column_offset as usize..column_offset as usize + lane.sample_size();
    let mut column_bytes = Vec::with_capacity((end - start) * lane.sample_size());
    let mut chunk = Vec::new();

    reader.seek(SeekFrom::Start(
        layout.header_size + start as u64 * layout.row_size,
    ))?;
    let mut row = start;
    while row < end {
        let n = ROWS_PER_CHUNK.min(end - row);
        chunk.resize(n * row_size, 0);
        reader.read_exact(&mut chunk)?;
        for r in chunk.chunks_exact(row_size) {
            column_bytes.extend_from_slice(&r[column.clone()]);
        }
        row += n;
    }

    Ok(decode_elements(lane.kind, &column_bytes))
}
