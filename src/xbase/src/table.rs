//! The user-visible facade: owns one file and one schema, orchestrating
//! the resolver, marshaller, and codec to implement create / append /
//! read / update.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom};
use std::path::Path;

use chrono::NaiveDate;

use crate::codec::header::{self, Header};
use crate::codec::record;
use crate::encoding::TextEncoding;
use crate::error::{Error, Result};
use crate::resolver::FieldResolver;
use crate::schema::{FieldDef, Schema};
use crate::value::{self, Value};

/// A row as exchanged with callers: a key→value mapping keyed by whatever
/// casing the caller used (looked up through the resolver).
pub type Row = HashMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    OpenNew,
    OpenExisting,
    Errored,
}

/// Binds to one xBase file and its schema for the facade's lifetime.
/// Construct with [`Table::create`] for a brand new file or [`Table::open`]
/// for an existing one.
pub struct Table {
    file: File,
    schema: Schema,
    resolver: FieldResolver,
    encoding: TextEncoding,
    header: Header,
    state: State,
}

impl Table {
    /// Creates a new file at `path` with the given field list, writing the
    /// header, descriptor table, and terminator immediately. Fails with
    /// [`Error::SchemaInvalid`] if the schema does not satisfy §4.4.
    pub fn create(path: impl AsRef<Path>, fields: Vec<FieldDef>, encoding_name: &str) -> Result<Self> {
        let encoding = TextEncoding::resolve(encoding_name)?;
        let schema = Schema::new(fields, &encoding)?;

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path.as_ref())?;

        let last_update = today();
        header::write(&mut file, &schema, 0, last_update, &encoding)?;
        header::write_eof_marker(&mut file)?;

        log::debug!(
            "created xBase table at {:?} with {} fields, encoding {:?}",
            path.as_ref(),
            schema.len(),
            encoding.label()
        );

        file.seek(SeekFrom::Start(0))?;
        let (header, schema) = header::read(&mut file, &encoding)?;
        let resolver = FieldResolver::new(&schema);

        Ok(Table {
            file,
            schema,
            resolver,
            encoding,
            header,
            state: State::OpenNew,
        })
    }

    /// Binds to an existing file, reading its header and descriptor table
    /// immediately.
    pub fn open(path: impl AsRef<Path>, encoding_name: &str) -> Result<Self> {
        let encoding = TextEncoding::resolve(encoding_name)?;
        let mut file = OpenOptions::new().read(true).write(true).open(path.as_ref())?;

        let (header, schema) = header::read(&mut file, &encoding)?;
        let resolver = FieldResolver::new(&schema);

        log::debug!(
            "opened xBase table at {:?}: {} fields, {} records",
            path.as_ref(),
            schema.len(),
            header.record_count
        );

        Ok(Table {
            file,
            schema,
            resolver,
            encoding,
            header,
            state: State::OpenExisting,
        })
    }

    /// The schema this table was created or opened with.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The number of records currently stored on disk.
    pub fn record_count(&self) -> u32 {
        self.header.record_count
    }

    pub fn len(&self) -> u32 {
        self.record_count()
    }

    pub fn is_empty(&self) -> bool {
        self.record_count() == 0
    }

    /// Releases the underlying file handle. Exposed for symmetry with the
    /// facade's create/open lifecycle; dropping the `Table` does the same
    /// thing, since `std::fs::File`'s own `Drop` closes the descriptor.
    pub fn close(self) {
        drop(self);
    }

    fn check_open(&self) -> Result<()> {
        if self.state == State::Errored {
            return Err(Error::FormatError(
                "table is in an error-sticky state after a prior I/O failure".into(),
            ));
        }
        Ok(())
    }

    fn mark_errored_on_io<T>(&mut self, result: Result<T>) -> Result<T> {
        if matches!(result, Err(Error::Io(_))) {
            self.state = State::Errored;
        }
        result
    }

    /// Appends `rows` in order. The entire batch is validated and encoded
    /// before any bytes are written; if a row fails to encode, nothing in
    /// the batch is written and the on-disk record count is untouched.
    pub fn append_records(&mut self, rows: &[Row]) -> Result<usize> {
        self.check_open()?;

        let mut encoded_rows = Vec::with_capacity(rows.len());
        for row in rows {
            encoded_rows.push(self.encode_row(row)?);
        }

        let result = self.write_batch(&encoded_rows);
        self.mark_errored_on_io(result)?;
        log::trace!("appended {} records, {} now total", rows.len(), self.header.record_count);
        Ok(rows.len())
    }

    /// Writes an already-encoded batch and advances the on-disk record
    /// count and EOF marker. Split out of [`Table::append_records`] so the
    /// fallible I/O section has a single `Result`-returning exit point to
    /// feed [`Table::mark_errored_on_io`].
    fn write_batch(&mut self, encoded_rows: &[Vec<u8>]) -> Result<()> {
        record::append_rows(&mut self.file, &self.header, encoded_rows)?;

        let new_count = self.header.record_count + encoded_rows.len() as u32;
        header::rewrite_record_count(&mut self.file, new_count)?;
        let last_update = today();
        header::rewrite_last_update(&mut self.file, last_update)?;

        self.file
            .seek(SeekFrom::Start(self.header.record_offset(new_count)))?;
        header::write_eof_marker(&mut self.file)?;

        self.header.record_count = new_count;
        self.header.last_update = last_update;
        Ok(())
    }

    /// Reads every record in order, returning each as a mapping keyed by
    /// canonical field name.
    pub fn read_records(&mut self) -> Result<Vec<Row>> {
        self.check_open()?;

        let mut out = Vec::with_capacity(self.header.record_count as usize);
        for index in 0..self.header.record_count {
            let result = record::read_record(&mut self.file, &self.header, index);
            let bytes = self.mark_errored_on_io(result)?;
            out.push(self.decode_row(&bytes)?);
        }
        Ok(out)
    }

    /// Overwrites the named fields of record `index`, leaving every other
    /// field and the deletion flag byte untouched.
    pub fn update_record(&mut self, index: u32, partial: &Row) -> Result<()> {
        self.check_open()?;

        if index >= self.header.record_count {
            return Err(Error::IndexOutOfRange {
                index,
                record_count: self.header.record_count,
            });
        }

        for key in partial.keys() {
            self.resolver.resolve(key)?;
        }

        let read_result = record::read_record(&mut self.file, &self.header, index);
        let mut bytes = self.mark_errored_on_io(read_result)?;
        for (key, value) in partial {
            let field_index = self.resolver.resolve(key)?;
            let field = &self.schema.fields()[field_index];
            let (start, end) = self.field_byte_range(field_index);
            let encoded = value::encode(
                value,
                field.field_type,
                field.length,
                field.decimals,
                &field.name,
                &self.encoding,
            )?;
            bytes[start..end].copy_from_slice(&encoded);
        }

        let result = record::write_record(&mut self.file, &self.header, index, &bytes);
        self.mark_errored_on_io(result)?;
        Ok(())
    }

    fn field_byte_range(&self, field_index: usize) -> (usize, usize) {
        let mut offset = 1; // deletion flag byte
        for field in &self.schema.fields()[..field_index] {
            offset += field.length as usize;
        }
        let field = &self.schema.fields()[field_index];
        (offset, offset + field.length as usize)
    }

    fn encode_row(&self, row: &Row) -> Result<Vec<u8>> {
        let mut by_canonical = HashMap::with_capacity(row.len());
        for (key, value) in row {
            self.resolver.resolve(key)?;
            by_canonical.insert(crate::resolver::canonical_name(key), value);
        }

        let mut bytes = vec![0u8; self.header.record_length as usize];
        bytes[0] = record::LIVE_FLAG;

        let mut offset = 1;
        for field in self.schema.fields() {
            let value = by_canonical
                .get(&crate::resolver::canonical_name(&field.name))
                .copied()
                .unwrap_or(&Value::Null);
            let encoded = value::encode(
                value,
                field.field_type,
                field.length,
                field.decimals,
                &field.name,
                &self.encoding,
            )?;
            bytes[offset..offset + field.length as usize].copy_from_slice(&encoded);
            offset += field.length as usize;
        }

        Ok(bytes)
    }

    fn decode_row(&self, bytes: &[u8]) -> Result<Row> {
        let mut row = HashMap::with_capacity(self.schema.len());
        let mut offset = 1;
        for field in self.schema.fields() {
            let field_bytes = &bytes[offset..offset + field.length as usize];
            let value = value::decode(field_bytes, field.field_type, field.decimals, &self.encoding)?;
            row.insert(crate::resolver::canonical_name(&field.name), value);
            offset += field.length as usize;
        }
        Ok(row)
    }
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldType;

    fn sample_fields() -> Vec<FieldDef> {
        vec![
            FieldDef::new("NAME", FieldType::Character, 50, 0),
            FieldDef::new("AGE", FieldType::Numeric, 3, 0),
            FieldDef::new("SALARY", FieldType::Numeric, 10, 2),
            FieldDef::new("ACTIVE", FieldType::Logical, 1, 0),
        ]
    }

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn create_append_and_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people.dbf");

        let mut table = Table::create(&path, sample_fields(), "utf-8").unwrap();
        table
            .append_records(&[row(&[
                ("NAME", Value::Text("John Doe".into())),
                ("AGE", Value::Integer(30)),
                ("SALARY", Value::Real(50000.50)),
                ("ACTIVE", Value::Bool(true)),
            ])])
            .unwrap();

        let records = table.read_records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("NAME"), Some(&Value::Text("John Doe".into())));
        assert_eq!(records[0].get("SALARY"), Some(&Value::Real(50000.50)));
        assert_eq!(records[0].get("ACTIVE"), Some(&Value::Bool(true)));
    }

    #[test]
    fn update_record_leaves_other_fields_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people.dbf");

        let mut table = Table::create(
            &path,
            vec![
                FieldDef::new("NAME", FieldType::Character, 50, 0),
                FieldDef::new("VALUE", FieldType::Numeric, 10, 2),
            ],
            "utf-8",
        )
        .unwrap();
        table
            .append_records(&[row(&[
                ("NAME", Value::Text("Test".into())),
                ("VALUE", Value::Real(100.00)),
            ])])
            .unwrap();

        table
            .update_record(0, &row(&[("VALUE", Value::Real(200.00))]))
            .unwrap();

        let records = table.read_records().unwrap();
        assert_eq!(records[0].get("NAME"), Some(&Value::Text("Test".into())));
        assert_eq!(records[0].get("VALUE"), Some(&Value::Real(200.00)));
    }

    #[test]
    fn update_unknown_field_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.dbf");
        let mut table = Table::create(&path, sample_fields(), "utf-8").unwrap();
        table.append_records(&[row(&[])]).unwrap();

        let err = table
            .update_record(0, &row(&[("NONEXISTENT", Value::Integer(1))]))
            .unwrap_err();
        assert!(matches!(err, Error::FieldUnknown(_)));
    }

    #[test]
    fn update_out_of_range_index_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.dbf");
        let mut table = Table::create(&path, sample_fields(), "utf-8").unwrap();

        let err = table.update_record(0, &row(&[])).unwrap_err();
        assert!(matches!(err, Error::IndexOutOfRange { .. }));
    }

    #[test]
    fn case_insensitive_field_names_resolve() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.dbf");
        let mut table = Table::create(
            &path,
            vec![
                FieldDef::new("Name", FieldType::Character, 50, 0),
                FieldDef::new("age", FieldType::Numeric, 3, 0),
            ],
            "utf-8",
        )
        .unwrap();
        table
            .append_records(&[row(&[("NAME", Value::Text("John Doe".into())), ("Age", Value::Integer(30))])])
            .unwrap();

        table.update_record(0, &row(&[("name", Value::Text("a".into()))])).unwrap();
        let records = table.read_records().unwrap();
        assert_eq!(records[0].get("NAME"), Some(&Value::Text("a".into())));
        assert_eq!(records[0].get("AGE"), Some(&Value::Integer(30)));
    }

    #[test]
    fn reopening_an_existing_file_preserves_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.dbf");
        {
            let mut table = Table::create(&path, sample_fields(), "utf-8").unwrap();
            table
                .append_records(&[row(&[("NAME", Value::Text("X".into()))])])
                .unwrap();
        }

        let mut table = Table::open(&path, "utf-8").unwrap();
        assert_eq!(table.record_count(), 1);
        let records = table.read_records().unwrap();
        assert_eq!(records[0].get("NAME"), Some(&Value::Text("X".into())));
    }
}
