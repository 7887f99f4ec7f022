//! The 32-byte file header (§3, "Header") plus the descriptor table and
//! header terminator that follow it.
//!
//! | Offset | Size | Field | Description |
//! | ------ | ---- | ----- | ----------- |
//! | 0      | 1    | Version | Version/flag byte; this crate writes `0x03` (dBase III level 5, no memo). |
//! | 1      | 3    | LastUpdate | `(YY, MM, DD)` where `YY` = year - 1900. |
//! | 4      | 4    | RecordCount | Number of records, little-endian u32. |
//! | 8      | 2    | HeaderLength | Bytes in header + descriptor table + terminator, little-endian u16. |
//! | 10     | 2    | RecordLength | Bytes per record row including the deletion flag, little-endian u16. |
//! | 12     | 20   | Reserved | Zero-filled; readers tolerate any value here. |
//! | 32     | 32·n | FieldDescriptors | One 32-byte descriptor per field (see [`super::descriptor`]). |
//! | 32+32·n | 1   | Terminator | `0x0D`. |

use std::io::{Read, Seek, SeekFrom, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use chrono::{Datelike, NaiveDate};

use super::descriptor;
use crate::encoding::TextEncoding;
use crate::error::{Error, Result};
use crate::schema::{FieldDef, Schema};

/// Version byte this crate writes: dBase III level 5, no memo file.
pub const VERSION_DBASE_III: u8 = 0x03;
const HEADER_TERMINATOR: u8 = 0x0d;
const EOF_MARKER: u8 = 0x1a;
const HEADER_SIZE: u64 = 32;

/// Parsed header fields plus the derived offsets every other codec
/// operation seeks by.
#[derive(Debug, Clone, Copy)]
pub struct Header {
    pub version: u8,
    pub last_update: NaiveDate,
    pub record_count: u32,
    pub header_length: u16,
    pub record_length: u16,
}

impl Header {
    pub fn data_offset(&self) -> u64 {
        self.header_length as u64
    }

    pub fn record_offset(&self, index: u32) -> u64 {
        self.data_offset() + index as u64 * self.record_length as u64
    }
}

fn recognized_version(byte: u8) -> bool {
    // dBase III (0x03), dBase IV (0x04), dBase V (0x05), and their
    // memo-bearing variants; bits 0-2 of the version byte. We only ever
    // write 0x03, but tolerate reading any of these flavors.
    matches!(byte & 0x07, 0x03 | 0x04 | 0x05) || matches!(byte, 0x02 | 0x30 | 0x31 | 0x32)
}

/// Writes the 32-byte header, the field descriptor table, and the `0x0D`
/// terminator. Does not write any record rows.
pub fn write<W: Write>(
    writer: &mut W,
    schema: &Schema,
    record_count: u32,
    last_update: NaiveDate,
    encoding: &TextEncoding,
) -> Result<()> {
    let n_fields = schema.len() as u16;
    let header_length = HEADER_SIZE as u16 + n_fields * descriptor::DESCRIPTOR_SIZE as u16 + 1;
    let record_length = 1 + schema.record_data_length() as u16;

    log::debug!(
        "writing xBase header: {} fields, header_length={}, record_length={}",
        n_fields,
        header_length,
        record_length
    );

    writer.write_u8(VERSION_DBASE_III)?;
    writer.write_u8((last_update.year() - 1900).max(0) as u8)?;
    writer.write_u8(last_update.month() as u8)?;
    writer.write_u8(last_update.day() as u8)?;
    writer.write_u32::<LittleEndian>(record_count)?;
    writer.write_u16::<LittleEndian>(header_length)?;
    writer.write_u16::<LittleEndian>(record_length)?;
    writer.write_all(&[0u8; 20])?; // reserved bytes 12-31

    for field in schema.fields() {
        writer.write_all(&descriptor::encode(field, encoding))?;
    }
    writer.write_u8(HEADER_TERMINATOR)?;

    Ok(())
}

/// Rewrites only the record-count field (bytes 4-7) of an already-written
/// header, leaving everything else untouched. Used after a batch append.
pub fn rewrite_record_count<W: Write + Seek>(writer: &mut W, record_count: u32) -> Result<()> {
    writer.seek(SeekFrom::Start(4))?;
    writer.write_u32::<LittleEndian>(record_count)?;
    Ok(())
}

/// Rewrites the last-update bytes (1-3) of an already-written header.
pub fn rewrite_last_update<W: Write + Seek>(writer: &mut W, date: NaiveDate) -> Result<()> {
    writer.seek(SeekFrom::Start(1))?;
    writer.write_u8((date.year() - 1900).max(0) as u8)?;
    writer.write_u8(date.month() as u8)?;
    writer.write_u8(date.day() as u8)?;
    Ok(())
}

/// Reads and validates the header and descriptor table, returning the
/// parsed [`Header`] and the (unchecked — trusted from disk) [`Schema`].
pub fn read<R: Read + Seek>(reader: &mut R, encoding: &TextEncoding) -> Result<(Header, Schema)> {
    reader.seek(SeekFrom::Start(0))?;

    let version = reader.read_u8()?;
    if !recognized_version(version) {
        return Err(Error::FormatError(format!(
            "unrecognized xBase version byte: {:#04x}",
            version
        )));
    }

    let year = reader.read_u8()? as i32 + 1900;
    let month = reader.read_u8()? as u32;
    let day = reader.read_u8()? as u32;
    let last_update = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| Error::FormatError(format!("invalid last-update date: {year:04}-{month:02}-{day:02}")))?;

    let record_count = reader.read_u32::<LittleEndian>()?;
    let header_length = reader.read_u16::<LittleEndian>()?;
    let record_length = reader.read_u16::<LittleEndian>()?;
    reader.seek(SeekFrom::Current(20))?; // reserved bytes 12-31

    if header_length < HEADER_SIZE as u16 + 1 {
        return Err(Error::FormatError(format!(
            "impossible header length: {header_length}"
        )));
    }
    let n_fields = (header_length as u32 - HEADER_SIZE as u32 - 1) / descriptor::DESCRIPTOR_SIZE as u32;

    let mut fields: Vec<FieldDef> = Vec::with_capacity(n_fields as usize);
    for _ in 0..n_fields {
        let mut raw = [0u8; descriptor::DESCRIPTOR_SIZE];
        reader.read_exact(&mut raw)?;
        fields.push(descriptor::decode(&raw, encoding)?);
    }

    let mut terminator = [0u8; 1];
    reader.read_exact(&mut terminator)?;
    if terminator[0] != HEADER_TERMINATOR {
        return Err(Error::FormatError(format!(
            "expected header terminator 0x0d, found {:#04x}",
            terminator[0]
        )));
    }

    let expected_record_length = 1 + fields.iter().map(|f| f.length as u32).sum::<u32>();
    if expected_record_length != record_length as u32 {
        return Err(Error::FormatError(format!(
            "record length mismatch: header says {record_length}, fields sum to {expected_record_length}"
        )));
    }

    let header = Header {
        version,
        last_update,
        record_count,
        header_length,
        record_length,
    };
    log::debug!(
        "read xBase header: {} fields, {} records",
        fields.len(),
        record_count
    );

    Ok((header, Schema::from_existing(fields)))
}

/// Writes the `0x1a` end-of-file marker at the current position.
pub fn write_eof_marker<W: Write>(writer: &mut W) -> Result<()> {
    writer.write_u8(EOF_MARKER)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldType;
    use std::io::Cursor;

    fn schema() -> Schema {
        let encoding = TextEncoding::resolve("utf-8").unwrap();
        Schema::new(
            vec![
                FieldDef::new("NAME", FieldType::Character, 50, 0),
                FieldDef::new("AGE", FieldType::Numeric, 3, 0),
            ],
            &encoding,
        )
        .unwrap()
    }

    #[test]
    fn round_trips_header_and_descriptors() {
        let encoding = TextEncoding::resolve("utf-8").unwrap();
        let s = schema();
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        let mut buf = Cursor::new(Vec::new());
        write(&mut buf, &s, 0, date, &encoding).unwrap();

        buf.set_position(0);
        let (header, read_schema) = read(&mut buf, &encoding).unwrap();

        assert_eq!(header.record_count, 0);
        assert_eq!(header.header_length as usize, 32 + 32 * 2 + 1);
        assert_eq!(header.record_length as usize, 1 + 50 + 3);
        assert_eq!(read_schema.fields().len(), 2);
        assert_eq!(read_schema.fields()[0].name, "NAME");
    }

    #[test]
    fn rejects_missing_terminator() {
        let encoding = TextEncoding::resolve("utf-8").unwrap();
        let s = schema();
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        let mut buf = Cursor::new(Vec::new());
        write(&mut buf, &s, 0, date, &encoding).unwrap();
        let terminator_offset = 32 + 32 * 2;
        buf.get_mut()[terminator_offset] = 0xff;

        buf.set_position(0);
        let err = read(&mut buf, &encoding).unwrap_err();
        assert!(matches!(err, Error::FormatError(_)));
    }

    #[test]
    fn rejects_unrecognized_version() {
        let mut buf = Cursor::new(vec![0u8; 32]);
        buf.get_mut()[0] = 0xfe;
        let encoding = TextEncoding::resolve("utf-8").unwrap();
        let err = read(&mut buf, &encoding).unwrap_err();
        assert!(matches!(err, Error::FormatError(_)));
    }
}
