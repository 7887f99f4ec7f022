//! The typed value marshaller: bidirectional conversion between a tagged
//! [`Value`] and the fixed-width, type-specific byte representation a field
//! occupies on disk.

use chrono::NaiveDate;
use paste::paste;

use crate::encoding::TextEncoding;
use crate::error::{Error, Result};
use crate::schema::FieldType;

/// A dynamically-typed record value. Source rows arrive as untyped
/// key→value maps; `Value` is the tagged representation the marshaller
/// dispatches on by field type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Integer(i64),
    Real(f64),
    Bool(bool),
    Date(NaiveDate),
    Null,
}

macro_rules! value_accessor {
    ($variant:ident, $ty:ty) => {
        paste! {
            #[doc = concat!("Returns the inner value if this is `Value::", stringify!($variant), "`.")]
            pub fn [<as_ $variant:snake>](&self) -> Option<$ty> {
                match self {
                    Value::$variant(v) => Some(v.clone()),
                    _ => None,
                }
            }
        }
    };
}

impl Value {
    value_accessor!(Text, String);
    value_accessor!(Integer, i64);
    value_accessor!(Real, f64);
    value_accessor!(Bool, bool);
    value_accessor!(Date, NaiveDate);

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Permissive stringification used by the `C` encoder: a non-string
    /// value handed to a text field is rendered via `Display` rather than
    /// rejected, matching the source implementation's coercion behavior.
    fn coerce_to_text(&self) -> Option<String> {
        match self {
            Value::Text(s) => Some(s.clone()),
            Value::Integer(i) => Some(i.to_string()),
            Value::Real(r) => Some(r.to_string()),
            Value::Bool(b) => Some(if *b { "T".to_string() } else { "F".to_string() }),
            Value::Date(d) => Some(d.format("%Y%m%d").to_string()),
            Value::Null => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(r: f64) -> Self {
        Value::Real(r)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// Encodes `value` into exactly `length` bytes for a field of type
/// `field_type`, under `encoding` and `decimals` (meaningful for `N`/`F`).
/// `field_name` is used only to label errors.
pub fn encode(
    value: &Value,
    field_type: FieldType,
    length: u16,
    decimals: u8,
    field_name: &str,
    encoding: &TextEncoding,
) -> Result<Vec<u8>> {
    match field_type {
        FieldType::Character => encode_character(value, length, field_name, encoding),
        FieldType::Numeric | FieldType::Float => {
            encode_numeric(value, length, decimals, field_name)
        }
        FieldType::Integer => Ok(encode_integer(value)),
        FieldType::Date => Ok(encode_date(value)),
        FieldType::Logical => Ok(vec![encode_logical(value)]),
    }
}

/// Decodes `bytes` (already sliced to the field's declared length) for a
/// field of type `field_type`.
pub fn decode(
    bytes: &[u8],
    field_type: FieldType,
    decimals: u8,
    encoding: &TextEncoding,
) -> Result<Value> {
    match field_type {
        FieldType::Character => Ok(decode_character(bytes, encoding)),
        FieldType::Numeric => decode_numeric(bytes, decimals, true),
        FieldType::Float => decode_numeric(bytes, decimals, false),
        FieldType::Integer => Ok(decode_integer(bytes)),
        FieldType::Date => Ok(decode_date(bytes)?),
        FieldType::Logical => Ok(decode_logical(bytes[0])),
    }
}

fn encode_character(
    value: &Value,
    length: u16,
    field_name: &str,
    encoding: &TextEncoding,
) -> Result<Vec<u8>> {
    let text = value.coerce_to_text().unwrap_or_default();
    let mut bytes = encoding.encode(&text);
    if bytes.len() > length as usize {
        return Err(Error::ValueTooLong {
            field: field_name.to_string(),
            length,
            value: text,
        });
    }
    bytes.resize(length as usize, b' ');
    Ok(bytes)
}

fn decode_character(bytes: &[u8], encoding: &TextEncoding) -> Value {
    let end = bytes
        .iter()
        .rposition(|&b| b != b' ')
        .map(|i| i + 1)
        .unwrap_or(0);
    Value::Text(encoding.decode(&bytes[..end]))
}

fn format_numeric(value: &Value, decimals: u8) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Integer(i) if decimals == 0 => Some(i.to_string()),
        Value::Integer(i) => Some(format!("{:.*}", decimals as usize, *i as f64)),
        Value::Real(r) if decimals == 0 => Some(format!("{:.0}", r)),
        Value::Real(r) => Some(format!("{:.*}", decimals as usize, r)),
        Value::Text(s) => Some(s.clone()),
        Value::Bool(_) | Value::Date(_) => None,
    }
}

fn encode_numeric(value: &Value, length: u16, decimals: u8, field_name: &str) -> Result<Vec<u8>> {
    let rendered = format_numeric(value, decimals).unwrap_or_default();
    if rendered.len() > length as usize {
        return Err(Error::ValueOverflow {
            field: field_name.to_string(),
            length,
            value: rendered,
        });
    }
    let mut bytes = vec![b' '; length as usize - rendered.len()];
    bytes.extend_from_slice(rendered.as_bytes());
    Ok(bytes)
}

/// Parses a trimmed `N`/`F` field body. A value that fails to parse is not
/// a format error for the whole file — it is logged and treated as null,
/// the same recovery the codec extends to other decode-time surprises.
fn decode_numeric(bytes: &[u8], decimals: u8, integral: bool) -> Result<Value> {
    let text = std::str::from_utf8(bytes).unwrap_or_default();
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.chars().all(|c| c == '*') {
        return Ok(Value::Null);
    }
    if decimals > 0 || !integral {
        match trimmed.parse::<f64>() {
            Ok(parsed) => Ok(Value::Real(parsed)),
            Err(_) => {
                log::warn!("unparsable numeric field value {:?}, decoding as null", trimmed);
                Ok(Value::Null)
            }
        }
    } else {
        match trimmed.parse::<i64>() {
            Ok(parsed) => Ok(Value::Integer(parsed)),
            Err(_) => {
                log::warn!("unparsable numeric field value {:?}, decoding as null", trimmed);
                Ok(Value::Null)
            }
        }
    }
}

fn encode_integer(value: &Value) -> Vec<u8> {
    let n = match value {
        Value::Integer(i) => *i as i32,
        Value::Real(r) => *r as i32,
        Value::Null => 0,
        _ => 0,
    };
    n.to_le_bytes().to_vec()
}

fn decode_integer(bytes: &[u8]) -> Value {
    let arr: [u8; 4] = bytes.try_into().unwrap_or([0; 4]);
    Value::Integer(i32::from_le_bytes(arr) as i64)
}

fn encode_date(value: &Value) -> Vec<u8> {
    match value {
        Value::Null => vec![b' '; 8],
        Value::Date(d) => d.format("%Y%m%d").to_string().into_bytes(),
        Value::Text(s) if s.trim().is_empty() => vec![b' '; 8],
        Value::Text(s) => {
            let mut bytes = s.as_bytes().to_vec();
            bytes.resize(8, b' ');
            bytes
        }
        _ => vec![b' '; 8],
    }
}

/// A `D` field body that isn't eight blank bytes but also isn't a valid
/// `YYYYMMDD` date is logged and decoded as null rather than failing the
/// whole read.
fn decode_date(bytes: &[u8]) -> Result<Value> {
    let text = std::str::from_utf8(bytes).unwrap_or_default();
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    match NaiveDate::parse_from_str(text, "%Y%m%d") {
        Ok(date) => Ok(Value::Date(date)),
        Err(_) => {
            log::warn!("unparsable date field value {:?}, decoding as null", text);
            Ok(Value::Null)
        }
    }
}

fn encode_logical(value: &Value) -> u8 {
    match value {
        Value::Bool(true) => b'T',
        Value::Bool(false) => b'F',
        Value::Text(s) => match s.as_str() {
            "T" | "t" | "Y" | "y" => b'T',
            "F" | "f" | "N" | "n" => b'F',
            _ => b' ',
        },
        Value::Integer(1) => b'T',
        Value::Integer(0) => b'F',
        Value::Null => b' ',
        _ => b' ',
    }
}

fn decode_logical(byte: u8) -> Value {
    match byte {
        b'T' | b't' | b'Y' | b'y' => Value::Bool(true),
        b'F' | b'f' | b'N' | b'n' => Value::Bool(false),
        _ => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf8() -> TextEncoding {
        TextEncoding::resolve("utf-8").unwrap()
    }

    #[test]
    fn character_pads_and_strips_spaces() {
        let enc = utf8();
        let bytes = encode_character(&Value::Text("hi".into()), 5, "NAME", &enc).unwrap();
        assert_eq!(bytes, b"hi   ");
        assert_eq!(decode_character(&bytes, &enc), Value::Text("hi".into()));
    }

    #[test]
    fn character_null_round_trips_to_empty_string() {
        let enc = utf8();
        let bytes = encode_character(&Value::Null, 5, "NAME", &enc).unwrap();
        assert_eq!(decode_character(&bytes, &enc), Value::Text(String::new()));
    }

    #[test]
    fn character_overflow_is_rejected() {
        let enc = utf8();
        let err = encode_character(&Value::Text("too long".into()), 3, "NAME", &enc).unwrap_err();
        assert!(matches!(err, Error::ValueTooLong { .. }));
    }

    #[test]
    fn numeric_round_trips_with_decimals() {
        let bytes = encode_numeric(&Value::Real(99999.99), 10, 2, "SALARY").unwrap();
        assert_eq!(bytes.len(), 10);
        assert_eq!(decode_numeric(&bytes, 2, false).unwrap(), Value::Real(99999.99));
    }

    #[test]
    fn numeric_overflow_is_rejected() {
        let err = encode_numeric(&Value::Real(123456.0), 5, 0, "AGE").unwrap_err();
        assert!(matches!(err, Error::ValueOverflow { .. }));
    }

    #[test]
    fn numeric_null_decodes_from_blank() {
        assert_eq!(decode_numeric(&[b' '; 5], 0, true).unwrap(), Value::Null);
    }

    #[test]
    fn unparsable_numeric_recovers_as_null() {
        assert_eq!(decode_numeric(b"12.3a", 0, true).unwrap(), Value::Null);
    }

    #[test]
    fn unparsable_date_recovers_as_null() {
        assert_eq!(decode_date(b"notadate").unwrap(), Value::Null);
    }

    #[test]
    fn logical_round_trips_true_false_null() {
        assert_eq!(encode_logical(&Value::Bool(true)), b'T');
        assert_eq!(encode_logical(&Value::Bool(false)), b'F');
        assert_eq!(encode_logical(&Value::Null), b' ');
        assert_eq!(decode_logical(b'T'), Value::Bool(true));
        assert_eq!(decode_logical(b'F'), Value::Bool(false));
        assert_eq!(decode_logical(b' '), Value::Null);
    }

    #[test]
    fn date_round_trips() {
        let bytes = encode_date(&Value::Text("19930415".into()));
        assert_eq!(bytes, b"19930415");
        let decoded = decode_date(&bytes).unwrap();
        assert_eq!(decoded, Value::Date(NaiveDate::from_ymd_opt(1993, 4, 15).unwrap()));
    }

    #[test]
    fn date_null_round_trips() {
        let bytes = encode_date(&Value::Null);
        assert_eq!(decode_date(&bytes).unwrap(), Value::Null);
    }

    #[test]
    fn integer_is_little_endian_four_bytes() {
        let bytes = encode_integer(&Value::Integer(42));
        assert_eq!(bytes, 42i32.to_le_bytes());
        assert_eq!(decode_integer(&bytes), Value::Integer(42));
    }

    #[test]
    fn value_accessors_roundtrip() {
        assert_eq!(Value::Text("x".into()).as_text(), Some("x".to_string()));
        assert_eq!(Value::Integer(5).as_integer(), Some(5));
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::Integer(5).as_text(), None);
    }
}
