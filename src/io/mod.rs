//! I/O module
//!
//! Handles storage access, the versioned transaction set format and report
//! output.
//!
//! # Components
//!
//! - `storage` - Storage capability traits and the plain-file implementation
//! - `fields` - Positional field access shared by every reader
//! - `native_format` - Versioned, checksummed transaction set format
//! - `report` - CSV listing output

pub mod fields;
pub mod native_format;
pub mod report;
pub mod storage;

pub use fields::FieldRow;
pub use report::write_transactions_csv;
pub use storage::{
    read_first_line, BoxedReader, FileReaderWriter, PlainFileSelector, ReaderWriter,
    ReaderWriterSelector,
};
