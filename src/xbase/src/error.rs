use thiserror::Error;

/// Every failure mode the crate's public surface can produce.
#[derive(Error, Debug)]
pub enum Error {
    #[error("schema invalid: {0}")]
    SchemaInvalid(String),

    #[error("unknown field: {0}")]
    FieldUnknown(String),

    #[error("value too long for field {field} (length {length}): {value:?}")]
    ValueTooLong {
        field: String,
        length: u16,
        value: String,
    },

    #[error("value overflows field {field} (length {length}): {value:?}")]
    ValueOverflow {
        field: String,
        length: u16,
        value: String,
    },

    #[error("record index {index} out of range (0..{record_count})")]
    IndexOutOfRange { index: u32, record_count: u32 },

    #[error("malformed xBase file: {0}")]
    FormatError(String),

    #[error("unsupported encoding: {0}")]
    EncodingUnsupported(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
