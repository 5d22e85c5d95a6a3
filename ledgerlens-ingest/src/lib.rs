//! ledgerlens-ingest: delimited bank-statement ingestion into normalized records.

pub mod error;
pub mod types;
pub mod parsers;

pub use error::{ParseError, Result};
pub use parsers::delimited::{
    normalize_path, normalize_reader, normalize_str, NormalizeOptions, NormalizeReport,
};
pub use types::{Direction, Record};
