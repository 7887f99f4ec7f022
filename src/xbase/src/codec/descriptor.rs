//! 32-byte field descriptor encode/decode (§3, "Field descriptor").
//!
//! | Offset | Size | Field | Description |
//! | ------ | ---- | ----- | ----------- |
//! | 0      | 11   | Name | Field name, zero-terminated, zero-padded; at most 10 encoded bytes. |
//! | 11     | 1    | Type | Type code: `C`, `N`, `F`, `I`, `D`, or `L`. |
//! | 12     | 4    | Reserved | Zero. |
//! | 16     | 1    | Length | Declared field width in bytes. |
//! | 17     | 1    | Decimals | Fractional-digit count; nonzero only for `N`/`F`. |
//! | 18     | 14   | Reserved | Zero. |

use crate::encoding::TextEncoding;
use crate::error::Result;
use crate::schema::{FieldDef, FieldType};

pub const DESCRIPTOR_SIZE: usize = 32;

pub fn encode(field: &FieldDef, encoding: &TextEncoding) -> [u8; DESCRIPTOR_SIZE] {
    let mut bytes = [0u8; DESCRIPTOR_SIZE];

    let name_bytes = encoding.encode(&field.name);
    bytes[..name_bytes.len()].copy_from_slice(&name_bytes);
    // bytes[name_bytes.len()..11] stay zero, satisfying the zero-terminated,
    // zero-padded contract.

    bytes[11] = field.field_type.code();
    // bytes[12..16] reserved, already zero.
    bytes[16] = field.length as u8;
    bytes[17] = field.decimals;
    // bytes[18..32] reserved, already zero.

    bytes
}

pub fn decode(bytes: &[u8; DESCRIPTOR_SIZE], encoding: &TextEncoding) -> Result<FieldDef> {
    let name_end = bytes[..11].iter().position(|&b| b == 0).unwrap_or(11);
    let name = encoding.decode(&bytes[..name_end]).trim().to_string();
    let field_type = FieldType::from_code(bytes[11])?;
    let length = bytes[16] as u16;
    let decimals = bytes[17];

    Ok(FieldDef::new(name, field_type, length, decimals))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_ascii_name() {
        let encoding = TextEncoding::resolve("utf-8").unwrap();
        let field = FieldDef::new("NAME", FieldType::Character, 50, 0);
        let bytes = encode(&field, &encoding);
        let decoded = decode(&bytes, &encoding).unwrap();
        assert_eq!(decoded.name, "NAME");
        assert_eq!(decoded.length, 50);
    }

    #[test]
    fn round_trips_gbk_name() {
        let encoding = TextEncoding::resolve("gbk").unwrap();
        let field = FieldDef::new("姓名", FieldType::Character, 50, 0);
        let bytes = encode(&field, &encoding);
        let decoded = decode(&bytes, &encoding).unwrap();
        assert_eq!(decoded.name, "姓名");
    }
}
