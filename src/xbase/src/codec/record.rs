//! Record row I/O: seeking to a row's offset and reading/writing its raw
//! bytes. Knows nothing about field types — that is the marshaller's job
//! (see [`crate::value`]).

use std::io::{Read, Seek, SeekFrom, Write};

use super::header::Header;
use crate::error::{Error, Result};

pub const LIVE_FLAG: u8 = 0x20;
pub const DELETED_FLAG: u8 = 0x2a;

/// Reads the raw bytes (deletion flag + field bytes) of record `index`.
pub fn read_record<R: Read + Seek>(reader: &mut R, header: &Header, index: u32) -> Result<Vec<u8>> {
    if index >= header.record_count {
        return Err(Error::IndexOutOfRange {
            index,
            record_count: header.record_count,
        });
    }

    reader.seek(SeekFrom::Start(header.record_offset(index)))?;
    let mut buf = vec![0u8; header.record_length as usize];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

/// Overwrites the raw bytes of an existing record row in place. `bytes`
/// must be exactly `header.record_length` long; the caller (the table
/// facade) guarantees this.
pub fn write_record<W: Write + Seek>(
    writer: &mut W,
    header: &Header,
    index: u32,
    bytes: &[u8],
) -> Result<()> {
    debug_assert_eq!(bytes.len(), header.record_length as usize);
    writer.seek(SeekFrom::Start(header.record_offset(index)))?;
    writer.write_all(bytes)?;
    Ok(())
}

/// Appends `rows` contiguously starting at the current end of the record
/// area, leaving the header's stored record count untouched — the caller
/// advances it only after every row in the batch has landed, and rewrites
/// the trailing EOF marker.
pub fn append_rows<W: Write + Seek>(writer: &mut W, header: &Header, rows: &[Vec<u8>]) -> Result<()> {
    writer.seek(SeekFrom::Start(header.record_offset(header.record_count)))?;
    for row in rows {
        debug_assert_eq!(row.len(), header.record_length as usize);
        writer.write_all(row)?;
    }
    log::trace!(
        "appended {} rows ({} bytes) at offset {}",
        rows.len(),
        rows.len() * header.record_length as usize,
        header.record_offset(header.record_count)
    );
    Ok(())
}
