//! `xbase`: read, write, and mutate dBase III-compatible (xBase) table
//! files.
//!
//! ```no_run
//! use std::collections::HashMap;
//! use xbase::{FieldDef, FieldType, Table, Value};
//!
//! # fn main() -> xbase::Result<()> {
//! let mut table = Table::create(
//!     "people.dbf",
//!     vec![
//!         FieldDef::new("NAME", FieldType::Character, 50, 0),
//!         FieldDef::new("AGE", FieldType::Numeric, 3, 0),
//!     ],
//!     "utf-8",
//! )?;
//!
//! let mut row = HashMap::new();
//! row.insert("NAME".to_string(), Value::Text("John Doe".into()));
//! row.insert("AGE".to_string(), Value::Integer(30));
//! table.append_records(&[row])?;
//!
//! for row in table.read_records()? {
//!     println!("{:?}", row.get("NAME"));
//! }
//! # Ok(())
//! # }
//! ```

mod codec;
mod encoding;
mod error;
mod resolver;
mod schema;
mod table;
mod value;

pub use encoding::TextEncoding;
pub use error::{Error, Result};
pub use resolver::canonical_name;
pub use schema::{FieldDef, FieldType, Schema};
pub use table::{Row, Table};
pub use value::Value;
