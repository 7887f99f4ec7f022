//! Case/locale-insensitive field-name resolution.
//!
//! Stored field names may be multi-byte (CJK); naively upper-casing them
//! with a locale-aware routine would corrupt code points outside ASCII.
//! [`canonical_name`] upper-cases only ASCII letters and leaves everything
//! else untouched, then the rest of this module does byte-for-byte lookups
//! against that canonical form.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::schema::Schema;

/// Produces the canonical lookup key for a field name: ASCII letters are
/// upper-cased, every other code point (including CJK) passes through
/// unchanged.
pub fn canonical_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii() { c.to_ascii_uppercase() } else { c })
        .collect()
}

/// Maps canonical field names to their zero-based position in the schema.
#[derive(Debug, Clone)]
pub struct FieldResolver {
    index_by_name: HashMap<String, usize>,
}

impl FieldResolver {
    pub fn new(schema: &Schema) -> Self {
        let index_by_name = schema
            .fields()
            .iter()
            .enumerate()
            .map(|(i, f)| (canonical_name(&f.name), i))
            .collect();
        FieldResolver { index_by_name }
    }

    /// Resolves a caller-supplied key to a field index, failing with
    /// [`Error::FieldUnknown`] if nothing in the schema matches after
    /// normalization.
    pub fn resolve(&self, key: &str) -> Result<usize> {
        self.index_by_name
            .get(&canonical_name(key))
            .copied()
            .ok_or_else(|| Error::FieldUnknown(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_letters_are_upper_cased() {
        assert_eq!(canonical_name("name"), "NAME");
        assert_eq!(canonical_name("Age"), "AGE");
    }

    #[test]
    fn cjk_code_points_pass_through() {
        assert_eq!(canonical_name("姓名"), "姓名");
        assert_eq!(canonical_name("Name姓名"), "NAME姓名");
    }
}
