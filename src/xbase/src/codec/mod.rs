//! Binary codec layer: the 32-byte file header, the field descriptor
//! table, and record row I/O. Everything here speaks bytes and offsets —
//! field-to-`Value` marshalling lives in [`crate::value`].

pub mod descriptor;
pub mod header;
pub mod record;
