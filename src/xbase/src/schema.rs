//! Schema types: the ordered, validated set of field definitions a
//! [`crate::Table`] is created with, and the type codes the on-disk format
//! recognizes.

use crate::error::{Error, Result};
use crate::resolver::canonical_name;

/// One of the six xBase field type codes this crate understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// `C` — fixed-width, space-padded text.
    Character,
    /// `N` — ASCII decimal text, optionally with a fixed number of
    /// fractional digits.
    Numeric,
    /// `F` — ASCII decimal text that always decodes to a real.
    Float,
    /// `I` — little-endian signed 32-bit binary integer.
    Integer,
    /// `D` — 8 ASCII digits, `YYYYMMDD`.
    Date,
    /// `L` — one byte, `T`/`F`/space.
    Logical,
}

impl FieldType {
    pub(crate) fn code(self) -> u8 {
        match self {
            FieldType::Character => b'C',
            FieldType::Numeric => b'N',
            FieldType::Float => b'F',
            FieldType::Integer => b'I',
            FieldType::Date => b'D',
            FieldType::Logical => b'L',
        }
    }

    pub(crate) fn from_code(code: u8) -> Result<Self> {
        match code {
            b'C' => Ok(FieldType::Character),
            b'N' => Ok(FieldType::Numeric),
            b'F' => Ok(FieldType::Float),
            b'I' => Ok(FieldType::Integer),
            b'D' => Ok(FieldType::Date),
            b'L' => Ok(FieldType::Logical),
            other => Err(Error::FormatError(format!(
                "unrecognized field type code: {:#04x}",
                other
            ))),
        }
    }
}

/// One field in an ordered [`Schema`], as supplied by the caller of
/// `create` — `(name, type_code, length, decimals)`.
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: String,
    pub field_type: FieldType,
    /// Declared byte width. Widened to `u16` so an out-of-range width like
    /// 256 can be represented and rejected by [`FieldDef::validate`] rather
    /// than silently wrapping; the on-disk descriptor still stores this in
    /// a single byte, since every valid range tops out at 254.
    pub length: u16,
    pub decimals: u8,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, field_type: FieldType, length: u16, decimals: u8) -> Self {
        FieldDef {
            name: name.into(),
            field_type,
            length,
            decimals,
        }
    }

    fn validate(&self, encoded_name_len: usize) -> Result<()> {
        if encoded_name_len > 10 {
            return Err(Error::SchemaInvalid(format!(
                "field name {:?} encodes to {} bytes, exceeding the 10 byte limit",
                self.name, encoded_name_len
            )));
        }

        let length_range = match self.field_type {
            FieldType::Character => 1..=254,
            FieldType::Numeric | FieldType::Float => 1..=20,
            FieldType::Integer => 4..=4,
            FieldType::Date => 8..=8,
            FieldType::Logical => 1..=1,
        };
        if !length_range.contains(&self.length) {
            return Err(Error::SchemaInvalid(format!(
                "field {:?} has length {}, outside the allowed range for its type",
                self.name, self.length
            )));
        }

        let decimals_allowed = matches!(self.field_type, FieldType::Numeric | FieldType::Float);
        if self.decimals > 0 && !decimals_allowed {
            return Err(Error::SchemaInvalid(format!(
                "field {:?} specifies decimals but its type does not support them",
                self.name
            )));
        }
        if self.decimals > 0 && self.decimals as i32 > self.length as i32 - 2 {
            return Err(Error::SchemaInvalid(format!(
                "field {:?} has {} decimals, exceeding length - 2 ({})",
                self.name,
                self.decimals,
                self.length as i32 - 2
            )));
        }

        Ok(())
    }
}

/// The ordered, validated field list a table is created with. Immutable
/// once built.
#[derive(Debug, Clone)]
pub struct Schema {
    fields: Vec<FieldDef>,
}

impl Schema {
    /// Validates `fields` against §4.4: field count, per-type width rules,
    /// encoded name length, and canonical-name uniqueness.
    pub fn new(fields: Vec<FieldDef>, encoding: &crate::encoding::TextEncoding) -> Result<Self> {
        if fields.is_empty() {
            return Err(Error::SchemaInvalid("a schema needs at least one field".into()));
        }
        if fields.len() > 255 {
            return Err(Error::SchemaInvalid(format!(
                "a schema may have at most 255 fields, got {}",
                fields.len()
            )));
        }

        let mut seen = std::collections::HashSet::new();
        for field in &fields {
            let encoded_len = encoding.encode(&field.name).len();
            field.validate(encoded_len)?;

            let canonical = canonical_name(&field.name);
            if !seen.insert(canonical.clone()) {
                return Err(Error::SchemaInvalid(format!(
                    "duplicate field name after normalization: {:?}",
                    canonical
                )));
            }
        }

        Ok(Schema { fields })
    }

    /// Builds a schema directly from field descriptors already read off
    /// disk, skipping §4.4's creation-time validation. An existing file is
    /// trusted rather than re-validated on every open.
    pub(crate) fn from_existing(fields: Vec<FieldDef>) -> Self {
        Schema { fields }
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Sum of every field's declared length, matching header invariant (1)
    /// once the leading deletion-flag byte is added.
    pub fn record_data_length(&self) -> u32 {
        self.fields.iter().map(|f| f.length as u32).sum()
    }
}
